use serde::{Deserialize, Serialize};

use deepbrot_core::{FractalParams, RebaseThresholds, SearchConfig, SplitMethod};

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Iteration budget
// ---------------------------------------------------------------------------

/// Maps zoom depth to an iteration count.
///
/// The budget grows linearly with the number of decades zoomed in
/// (`log10(1 / zoom)`), is clamped to `[minimum, cap]`, and can be shifted
/// by a signed per-view offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationBudget {
    /// Iterations at zoom 1.
    pub base: u32,
    /// Extra iterations per decade of zoom.
    pub per_decade: f64,
    pub minimum: u32,
    /// Upper bound; also the largest orbit texture ever allocated.
    pub cap: u32,
}

impl IterationBudget {
    pub fn iterations(&self, zoom: f64, extra: i32) -> u32 {
        let decades = if zoom > 0.0 { (-zoom.log10()).max(0.0) } else { 0.0 };
        let raw = f64::from(self.base) + self.per_decade * decades + f64::from(extra);
        raw.round().clamp(f64::from(self.minimum), f64::from(self.cap)) as u32
    }
}

impl Default for IterationBudget {
    fn default() -> Self {
        Self {
            base: 200,
            per_decade: 200.0,
            minimum: 64,
            cap: 4096,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine config
// ---------------------------------------------------------------------------

/// Everything the perturbation engine and renderers read at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub budget: IterationBudget,
    pub rebase: RebaseThresholds,
    pub search: SearchConfig,
    pub split: SplitMethod,
    /// Zoom never goes below this; deeper views exhaust DD precision.
    pub min_zoom: f64,
    pub escape_radius: f64,
    /// Pan movement, in view heights, that counts as a material change.
    pub pan_tolerance: f64,
    /// Relative zoom change that counts as a material change.
    pub zoom_tolerance: f64,
    /// Absolute Julia constant change that counts as a material change.
    pub c_tolerance: f64,
}

impl EngineConfig {
    pub const DEFAULT_MIN_ZOOM: f64 = 1e-17;

    pub fn validate(&self) -> crate::Result<()> {
        self.rebase.validate()?;
        self.search.validate()?;
        FractalParams::new(self.budget.cap, self.escape_radius)?;
        // Perturbation steps from slot 0 into slot 1 after every rebase.
        if self.budget.minimum < 2 || self.budget.minimum > self.budget.cap {
            return Err(RenderError::InvalidConfig(format!(
                "iteration budget minimum {} must be in 2..={}",
                self.budget.minimum, self.budget.cap
            )));
        }
        if !(self.budget.per_decade.is_finite() && self.budget.per_decade >= 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "per_decade must be finite and >= 0, got {}",
                self.budget.per_decade
            )));
        }
        // A searched reference sits at most one grid corner away from the
        // centre; it must land inside the "off" radius or the policy never
        // re-arms.
        let corner = self.search.radius_fraction * std::f64::consts::SQRT_2;
        if corner >= self.rebase.off {
            return Err(RenderError::InvalidConfig(format!(
                "search radius_fraction {} reaches {corner:.3} view heights, not below rebase off {}",
                self.search.radius_fraction, self.rebase.off
            )));
        }
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "min_zoom must be finite and > 0, got {}",
                self.min_zoom
            )));
        }
        let tolerances = [self.pan_tolerance, self.zoom_tolerance, self.c_tolerance];
        if tolerances.iter().any(|t| !(t.is_finite() && *t >= 0.0)) {
            return Err(RenderError::InvalidConfig(
                "change tolerances must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Iteration parameters for an orbit of `max_iterations` steps.
    pub fn fractal_params(&self, max_iterations: u32) -> crate::Result<FractalParams> {
        Ok(FractalParams::new(max_iterations, self.escape_radius)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: IterationBudget::default(),
            rebase: RebaseThresholds::default(),
            search: SearchConfig::default(),
            split: SplitMethod::default(),
            min_zoom: Self::DEFAULT_MIN_ZOOM,
            escape_radius: FractalParams::DEFAULT_ESCAPE_RADIUS,
            pan_tolerance: 1e-3,
            zoom_tolerance: 1e-9,
            c_tolerance: 1e-15,
        }
    }
}
