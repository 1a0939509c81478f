//! Hysteresis deciding when the reference orbit must move.
//!
//! The distance between the view centre and the reference is measured in
//! view heights (`|pan − reference| / zoom`). Crossing the "on" threshold
//! fires once and disarms; the policy re-arms only after the distance drops
//! below the lower "off" threshold, so jitter around a single boundary cannot
//! trigger a rebuild every frame.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complex_dd::ComplexDD;
use crate::error::CoreError;

/// Distance thresholds, in view heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebaseThresholds {
    pub on: f64,
    pub off: f64,
}

impl RebaseThresholds {
    pub const DEFAULT_ON: f64 = 1.75;
    pub const DEFAULT_OFF: f64 = 0.90;

    pub fn new(on: f64, off: f64) -> crate::Result<Self> {
        let t = Self { on, off };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let ok = self.on.is_finite() && self.off.is_finite() && self.off > 0.0 && self.off < self.on;
        if ok {
            Ok(())
        } else {
            Err(CoreError::InvalidRebaseThresholds {
                on: self.on,
                off: self.off,
            })
        }
    }
}

impl Default for RebaseThresholds {
    fn default() -> Self {
        Self {
            on: Self::DEFAULT_ON,
            off: Self::DEFAULT_OFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseState {
    Armed,
    Disarmed,
}

/// Why a rebase fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseTrigger {
    /// The view drifted past the "on" threshold.
    Distance,
    /// A structural change (Julia constant) invalidated the orbit.
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseDecision {
    Fire(RebaseTrigger),
    Hold,
}

impl RebaseDecision {
    #[inline]
    pub fn fired(self) -> bool {
        matches!(self, Self::Fire(_))
    }
}

#[derive(Debug, Clone)]
pub struct RebasePolicy {
    thresholds: RebaseThresholds,
    state: RebaseState,
}

impl RebasePolicy {
    pub fn new(thresholds: RebaseThresholds) -> crate::Result<Self> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            state: RebaseState::Armed,
        })
    }

    /// `|pan − reference| / zoom`, with the subtraction done in DD so the
    /// distance stays meaningful when both points share most of their digits.
    pub fn delta_view(pan: ComplexDD, reference: ComplexDD, zoom: f64) -> f64 {
        (pan - reference).value().norm() / zoom
    }

    /// Feed one distance sample through the state machine.
    pub fn observe(&mut self, delta_view: f64) -> RebaseDecision {
        match self.state {
            RebaseState::Armed if delta_view > self.thresholds.on => {
                self.state = RebaseState::Disarmed;
                debug!(delta_view, "Rebase fired");
                RebaseDecision::Fire(RebaseTrigger::Distance)
            }
            RebaseState::Disarmed if delta_view < self.thresholds.off => {
                self.state = RebaseState::Armed;
                RebaseDecision::Hold
            }
            _ => RebaseDecision::Hold,
        }
    }

    pub fn evaluate(&mut self, pan: ComplexDD, reference: ComplexDD, zoom: f64) -> RebaseDecision {
        self.observe(Self::delta_view(pan, reference, zoom))
    }

    /// Unconditional rebase, bypassing the distance check.
    pub fn force(&mut self) -> RebaseDecision {
        self.state = RebaseState::Disarmed;
        RebaseDecision::Fire(RebaseTrigger::Forced)
    }

    /// Re-arm if disarmed and `delta_view` is already below "off". Never fires;
    /// used right after a rebuild to measure against the new reference.
    pub fn settle(&mut self, delta_view: f64) {
        if self.state == RebaseState::Disarmed && delta_view < self.thresholds.off {
            self.state = RebaseState::Armed;
        }
    }

    /// Back to `Armed`, e.g. after the renderer is reset.
    pub fn rearm(&mut self) {
        self.state = RebaseState::Armed;
    }

    pub fn state(&self) -> RebaseState {
        self.state
    }

    pub fn thresholds(&self) -> RebaseThresholds {
        self.thresholds
    }
}

impl Default for RebasePolicy {
    fn default() -> Self {
        Self {
            thresholds: RebaseThresholds::default(),
            state: RebaseState::Armed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::Complex;
    use crate::double_double::DoubleDouble;

    #[test]
    fn rising_distance_fires_exactly_once() {
        let mut policy = RebasePolicy::default();
        let fired = (0..400)
            .map(|i| policy.observe(f64::from(i) * 0.01))
            .filter(|d| d.fired())
            .count();
        assert_eq!(fired, 1);
        assert_eq!(policy.state(), RebaseState::Disarmed);
    }

    #[test]
    fn falling_below_off_rearms_without_firing() {
        let mut policy = RebasePolicy::default();
        assert!(policy.observe(2.0).fired());
        // Between the thresholds nothing changes.
        assert_eq!(policy.observe(1.2), RebaseDecision::Hold);
        assert_eq!(policy.state(), RebaseState::Disarmed);
        assert_eq!(policy.observe(0.5), RebaseDecision::Hold);
        assert_eq!(policy.state(), RebaseState::Armed);
        assert!(policy.observe(1.8).fired());
    }

    #[test]
    fn oscillation_inside_band_never_fires_twice() {
        let mut policy = RebasePolicy::default();
        assert!(policy.observe(1.76).fired());
        for i in 0..100 {
            let d = if i % 2 == 0 { 1.74 } else { 1.76 };
            assert!(!policy.observe(d).fired());
        }
    }

    #[test]
    fn settle_only_rearms_inside_off() {
        let mut policy = RebasePolicy::default();
        policy.settle(5.0);
        assert_eq!(policy.state(), RebaseState::Armed);

        assert!(policy.observe(2.0).fired());
        policy.settle(1.0);
        assert_eq!(policy.state(), RebaseState::Disarmed);
        policy.settle(0.7);
        assert_eq!(policy.state(), RebaseState::Armed);
    }

    #[test]
    fn force_fires_regardless_of_distance() {
        let mut policy = RebasePolicy::default();
        assert_eq!(policy.force(), RebaseDecision::Fire(RebaseTrigger::Forced));
        policy.observe(2.0);
        assert_eq!(policy.force(), RebaseDecision::Fire(RebaseTrigger::Forced));
    }

    #[test]
    fn delta_view_uses_dd_difference() {
        // Both points round to the same f64; only the DD words differ.
        let pan = ComplexDD::new(DoubleDouble::new(-0.5, 3e-20), DoubleDouble::ZERO);
        let reference = ComplexDD::new(DoubleDouble::new(-0.5, 1e-20), DoubleDouble::ZERO);
        assert_eq!(pan.value(), reference.value());
        let d = RebasePolicy::delta_view(pan, reference, 1e-20);
        assert!((d - 2.0).abs() < 1e-9, "delta_view = {d}");
    }

    #[test]
    fn evaluate_fires_on_drift() {
        let mut policy = RebasePolicy::default();
        let reference = ComplexDD::from(Complex::new(-0.75, 0.1));
        let mut pan = reference;
        assert!(!policy.evaluate(pan, reference, 1e-3).fired());
        pan.add_f64(Complex::new(2e-3, 0.0));
        assert!(policy.evaluate(pan, reference, 1e-3).fired());
    }

    #[test]
    fn invalid_thresholds_rejected() {
        assert!(RebaseThresholds::new(0.9, 1.75).is_err());
        assert!(RebaseThresholds::new(1.0, 1.0).is_err());
        assert!(RebaseThresholds::new(1.0, 0.0).is_err());
        assert!(RebaseThresholds::new(f64::NAN, 0.5).is_err());
        assert!(RebasePolicy::new(RebaseThresholds { on: 0.5, off: 0.9 }).is_err());
    }

    #[test]
    fn thresholds_deserialize_with_defaults() {
        let t: RebaseThresholds = serde_json::from_str(r#"{"on":2.5}"#).unwrap();
        assert_eq!(t.on, 2.5);
        assert_eq!(t.off, RebaseThresholds::DEFAULT_OFF);
    }
}
