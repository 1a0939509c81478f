//! Reference orbit construction and reference-point selection.
//!
//! One point near the view centre is iterated in double-double precision and
//! every iterate is stored as four `f32` words. Pixels then iterate only their
//! small offset from this orbit.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complex::Complex;
use crate::complex_dd::ComplexDD;
use crate::double_double::DoubleDouble;
use crate::error::CoreError;
use crate::float_split::SplitMethod;
use crate::fractal::{FractalParams, IterationMap, IterationResult};

/// Default iteration cap for [`orbit_trace`].
pub const ORBIT_TRACE_LIMIT: u32 = 0xFFF;

/// One orbit iterate as uploaded to the orbit texture (one RGBA32F texel).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct OrbitTexel {
    pub re_hi: f32,
    pub re_lo: f32,
    pub im_hi: f32,
    pub im_lo: f32,
}

impl OrbitTexel {
    pub fn from_dd(z: ComplexDD, split: SplitMethod) -> Self {
        let re = split.split_dd(z.re);
        let im = split.split_dd(z.im);
        Self {
            re_hi: re.high,
            re_lo: re.low,
            im_hi: im.high,
            im_lo: im.low,
        }
    }

    /// The iterate as the shader reconstructs it.
    #[inline]
    pub fn value(self) -> Complex {
        Complex::new(
            f64::from(self.re_hi) + f64::from(self.re_lo),
            f64::from(self.im_hi) + f64::from(self.im_lo),
        )
    }
}

/// The stored orbit of the current reference point.
#[derive(Debug, Clone)]
pub struct ReferenceOrbit {
    reference: ComplexDD,
    texels: Vec<OrbitTexel>,
    escaped_at: Option<u32>,
}

impl ReferenceOrbit {
    /// Iterate `map` from `reference` for `params.max_iterations` steps.
    ///
    /// Slot `n` holds iterate `zₙ` (slot 0 is the seed). If the orbit leaves
    /// the bailout at index `k`, slots `k..` all repeat `z_k`.
    pub fn build<M: IterationMap + ?Sized>(
        map: &M,
        reference: ComplexDD,
        params: &FractalParams,
        split: SplitMethod,
    ) -> Self {
        let len = params.max_iterations as usize;
        let bailout = DoubleDouble::from(params.escape_radius_sq());
        let parameter = map.parameter(reference);
        let mut texels = Vec::with_capacity(len);
        let mut escaped_at = None;
        let mut z = map.seed(reference);

        while texels.len() < len {
            let texel = OrbitTexel::from_dd(z, split);
            texels.push(texel);
            if z.norm_sq() > bailout || !z.is_finite() {
                escaped_at = Some((texels.len() - 1) as u32);
                texels.resize(len, texel);
                break;
            }
            z = map.step(z, parameter);
        }

        debug!(
            kind = map.kind().label(),
            len,
            escaped_at = ?escaped_at,
            "Built reference orbit"
        );

        Self {
            reference,
            texels,
            escaped_at,
        }
    }

    /// The reference point in full precision.
    pub fn reference(&self) -> ComplexDD {
        self.reference
    }

    pub fn texels(&self) -> &[OrbitTexel] {
        &self.texels
    }

    pub fn len(&self) -> usize {
        self.texels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Index of the first escaped iterate, if the reference escaped.
    pub fn escaped_at(&self) -> Option<u32> {
        self.escaped_at
    }

    /// Number of slots usable for perturbation: up to and including the
    /// escaped iterate, or the full length.
    pub fn valid_len(&self) -> usize {
        match self.escaped_at {
            Some(k) => (k as usize + 1).min(self.texels.len()),
            None => self.texels.len(),
        }
    }

    /// Iterate `n` as the shader reads it.
    #[inline]
    pub fn point(&self, n: usize) -> Complex {
        self.texels[n].value()
    }
}

/// Grid search parameters for [`SelectionMode::Search`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates per axis (`N` in an `N×N` grid).
    pub grid_size: u32,
    /// Half-width of the grid as a fraction of the current zoom.
    pub radius_fraction: f64,
    /// Iteration cap for each probe.
    pub probe_iterations: u32,
    /// A candidate must beat the current reference by this fraction ...
    pub relative_margin: f64,
    /// ... or by this many iterations, whichever is larger.
    pub absolute_margin: u32,
}

impl SearchConfig {
    pub fn validate(&self) -> crate::Result<()> {
        let reason = if self.grid_size == 0 {
            Some("grid_size must be >= 1")
        } else if !(self.radius_fraction.is_finite() && self.radius_fraction >= 0.0) {
            Some("radius_fraction must be finite and >= 0")
        } else if self.probe_iterations == 0 {
            Some("probe_iterations must be >= 1")
        } else if !(self.relative_margin.is_finite() && self.relative_margin >= 0.0) {
            Some("relative_margin must be finite and >= 0")
        } else {
            None
        };
        match reason {
            Some(r) => Err(CoreError::InvalidSearchConfig {
                reason: r.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Iterations a candidate needs above `current` to replace it.
    pub fn switch_margin(&self, current: u32) -> f64 {
        (self.relative_margin * f64::from(current)).max(f64::from(self.absolute_margin))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            radius_fraction: 0.5,
            probe_iterations: 500,
            relative_margin: 0.10,
            absolute_margin: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Use the view centre as-is.
    #[default]
    Direct,
    /// Probe a grid around the centre for the longest-surviving point.
    Search,
}

/// Where a selected reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Centre,
    Current,
    Candidate { row: u32, col: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub point: ComplexDD,
    pub source: SelectionSource,
    /// Probe score of the chosen point (search mode only).
    pub score: Option<u32>,
}

impl Selection {
    /// `true` when the reference moves away from the current one.
    pub fn switched(&self) -> bool {
        self.source != SelectionSource::Current
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceSelector {
    config: SearchConfig,
}

impl ReferenceSelector {
    pub fn new(config: SearchConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn score<M: IterationMap + ?Sized>(&self, map: &M, point: ComplexDD, escape_radius_sq: f64) -> u32 {
        map.escape_time(point, escape_radius_sq, self.config.probe_iterations)
            .survived(self.config.probe_iterations)
    }

    /// Pick the reference for the next orbit build.
    ///
    /// In search mode the existing reference is kept unless a candidate
    /// outscores it by the switch margin.
    pub fn select<M: IterationMap + ?Sized>(
        &self,
        map: &M,
        mode: SelectionMode,
        centre: ComplexDD,
        zoom: f64,
        current: Option<ComplexDD>,
        escape_radius_sq: f64,
    ) -> Selection {
        if mode == SelectionMode::Direct {
            return Selection {
                point: centre,
                source: SelectionSource::Centre,
                score: None,
            };
        }

        let mut best = Selection {
            point: centre,
            source: SelectionSource::Centre,
            score: Some(self.score(map, centre, escape_radius_sq)),
        };
        let mut best_score = best.score.unwrap_or(0);

        let n = self.config.grid_size;
        let radius = zoom * self.config.radius_fraction;
        for row in 0..n {
            for col in 0..n {
                let offset = Complex::new(grid_coord(col, n), grid_coord(row, n)) * radius;
                let mut point = centre;
                point.add_f64(offset);
                let s = self.score(map, point, escape_radius_sq);
                // Strictly greater: ties keep the earlier pick, so the centre wins.
                if s > best_score {
                    best_score = s;
                    best = Selection {
                        point,
                        source: SelectionSource::Candidate { row, col },
                        score: Some(s),
                    };
                }
            }
        }

        if let Some(current) = current {
            let current_score = self.score(map, current, escape_radius_sq);
            let needed = f64::from(current_score) + self.config.switch_margin(current_score);
            if f64::from(best_score) <= needed {
                return Selection {
                    point: current,
                    source: SelectionSource::Current,
                    score: Some(current_score),
                };
            }
            debug!(current_score, best_score, "Switching reference point");
        }
        best
    }
}

/// Grid coordinate in `[-1, 1]` for index `i` of `n`; a single cell sits at 0.
#[inline]
fn grid_coord(i: u32, n: u32) -> f64 {
    if n <= 1 {
        0.0
    } else {
        2.0 * f64::from(i) / f64::from(n - 1) - 1.0
    }
}

/// The plain-precision orbit of `point`, up to and including the first
/// escaped iterate or `limit` iterates.
pub fn orbit_trace<M: IterationMap + ?Sized>(
    map: &M,
    point: ComplexDD,
    escape_radius_sq: f64,
    limit: u32,
) -> Vec<Complex> {
    let bailout = DoubleDouble::from(escape_radius_sq);
    let parameter = map.parameter(point);
    let mut z = map.seed(point);
    let mut trace = Vec::new();
    for _ in 0..limit {
        trace.push(z.value());
        if z.norm_sq() > bailout {
            break;
        }
        z = map.step(z, parameter);
    }
    trace
}

/// Escape classification of the reference itself, handy for logging.
pub fn classify_reference(orbit: &ReferenceOrbit) -> IterationResult {
    match orbit.escaped_at() {
        Some(k) => IterationResult::Escaped {
            iterations: k,
            norm_sq: orbit.point(k as usize).norm_sq(),
        },
        None => IterationResult::Interior,
    }
}
