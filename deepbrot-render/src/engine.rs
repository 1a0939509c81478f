//! Decides, frame by frame, whether the reference orbit is rebuilt.
//!
//! The engine owns the orbit, the rebase policy, and the reference selector.
//! It never touches the GPU; the renderer uploads whatever it reports.

use tracing::{debug, trace};

use deepbrot_core::{
    classify_reference, Complex, ComplexDD, IterationMap, RebaseDecision, RebasePolicy,
    ReferenceOrbit, ReferenceSelector, SelectionMode, ViewState,
};

use crate::config::EngineConfig;

/// Why the orbit was (or wants to be) rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    /// No orbit exists yet.
    Initial,
    /// The Julia constant moved; the old orbit iterates a different map.
    JuliaConstant,
    /// The view drifted too far from the reference.
    Rebase,
    /// Pan, zoom or iteration budget changed materially.
    ViewChanged,
    /// An explicit request (mark dirty, end of animation, context restore).
    Requested,
}

impl RebuildReason {
    /// Mandatory rebuilds run even while animation or interaction defers work.
    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::Initial | Self::JuliaConstant | Self::Rebase)
    }
}

/// Outcome of [`PerturbationEngine::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared {
    /// Set when a new orbit was built this frame.
    pub rebuilt: Option<RebuildReason>,
    /// The orbit is stale but the rebuild was postponed.
    pub deferred: bool,
}

/// View parameters the current orbit was built for.
#[derive(Debug, Clone, Copy)]
struct BuiltFor {
    pan: ComplexDD,
    zoom: f64,
    julia_c: Complex,
    budget: u32,
}

#[derive(Debug)]
pub struct PerturbationEngine {
    config: EngineConfig,
    policy: RebasePolicy,
    selector: ReferenceSelector,
    orbit: Option<ReferenceOrbit>,
    built_for: Option<BuiltFor>,
    dirty: Option<RebuildReason>,
    interaction_active: bool,
    continuous_animation: bool,
}

impl PerturbationEngine {
    pub fn new(config: EngineConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            policy: RebasePolicy::new(config.rebase)?,
            selector: ReferenceSelector::new(config.search)?,
            config,
            orbit: None,
            built_for: None,
            dirty: None,
            interaction_active: false,
            continuous_animation: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn orbit(&self) -> Option<&ReferenceOrbit> {
        self.orbit.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    pub fn policy(&self) -> &RebasePolicy {
        &self.policy
    }

    /// Flag the orbit stale. The first pending reason is kept.
    pub fn mark_dirty(&mut self, reason: RebuildReason) {
        self.dirty.get_or_insert(reason);
    }

    pub fn set_interaction_active(&mut self, active: bool) {
        if self.interaction_active && !active {
            self.mark_dirty(RebuildReason::Requested);
        }
        self.interaction_active = active;
    }

    /// Clearing the flag schedules a final accurate rebuild.
    pub fn set_continuous_animation(&mut self, active: bool) {
        if self.continuous_animation && !active {
            self.mark_dirty(RebuildReason::Requested);
        }
        self.continuous_animation = active;
    }

    pub fn continuous_animation(&self) -> bool {
        self.continuous_animation
    }

    /// Expensive work waits while the view is in motion.
    pub fn deferring(&self) -> bool {
        self.interaction_active || self.continuous_animation
    }

    /// Drop the orbit and start over.
    pub fn reset(&mut self) {
        self.orbit = None;
        self.built_for = None;
        self.dirty = None;
        self.policy.rearm();
    }

    /// Run the per-frame change detection and rebuild the orbit if allowed.
    ///
    /// `depends_on_c` is `false` for maps whose orbit ignores the Julia
    /// constant.
    pub fn prepare<M: IterationMap + ?Sized>(
        &mut self,
        map: &M,
        view: &ViewState,
        budget: u32,
        depends_on_c: bool,
    ) -> crate::Result<Prepared> {
        let pan = view.pan_dd();
        let zoom = view.zoom();

        let mut c_changed = false;
        if let Some(built) = self.built_for {
            if depends_on_c && (view.julia_c() - built.julia_c).norm() > self.config.c_tolerance {
                c_changed = true;
            }
            let pan_moved = (pan - built.pan).value().norm() / zoom > self.config.pan_tolerance;
            let zoom_moved = (zoom / built.zoom - 1.0).abs() > self.config.zoom_tolerance;
            if pan_moved || zoom_moved || budget != built.budget {
                self.mark_dirty(RebuildReason::ViewChanged);
            }
        }

        let reason = match &self.orbit {
            None => Some(RebuildReason::Initial),
            Some(_) if c_changed => {
                self.policy.force();
                Some(RebuildReason::JuliaConstant)
            }
            Some(orbit) => match self.policy.evaluate(pan, orbit.reference(), zoom) {
                RebaseDecision::Fire(_) => Some(RebuildReason::Rebase),
                RebaseDecision::Hold => self.dirty,
            },
        };

        let Some(reason) = reason else {
            return Ok(Prepared {
                rebuilt: None,
                deferred: false,
            });
        };

        if !reason.is_mandatory() && self.deferring() {
            trace!(?reason, "Orbit rebuild deferred");
            return Ok(Prepared {
                rebuilt: None,
                deferred: true,
            });
        }

        self.rebuild(map, view, budget, reason)?;
        Ok(Prepared {
            rebuilt: Some(reason),
            deferred: false,
        })
    }

    fn rebuild<M: IterationMap + ?Sized>(
        &mut self,
        map: &M,
        view: &ViewState,
        budget: u32,
        reason: RebuildReason,
    ) -> crate::Result<()> {
        let params = self.config.fractal_params(budget)?;
        let mode = if self.deferring() {
            SelectionMode::Direct
        } else {
            SelectionMode::Search
        };
        // A rebase or a new map means the old reference is no longer a candidate.
        let current = match reason {
            RebuildReason::ViewChanged | RebuildReason::Requested => {
                self.orbit.as_ref().map(ReferenceOrbit::reference)
            }
            _ => None,
        };
        let selection = self.selector.select(
            map,
            mode,
            view.pan_dd(),
            view.zoom(),
            current,
            params.escape_radius_sq(),
        );

        let orbit = ReferenceOrbit::build(map, selection.point, &params, self.config.split);
        debug!(
            ?reason,
            ?mode,
            source = ?selection.source,
            len = orbit.len(),
            reference = ?classify_reference(&orbit),
            "Rebuilt reference orbit"
        );
        self.orbit = Some(orbit);
        self.built_for = Some(BuiltFor {
            pan: view.pan_dd(),
            zoom: view.zoom(),
            julia_c: view.julia_c(),
            budget,
        });
        self.dirty = None;
        self.policy
            .settle(RebasePolicy::delta_view(view.pan_dd(), selection.point, view.zoom()));
        Ok(())
    }
}
