use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::complex_dd::ComplexDD;
use crate::double_double::DoubleDouble;
use crate::error::CoreError;

/// The result of iterating a single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationResult {
    /// The orbit escaped; `iterations` is the index of the first iterate
    /// outside the bailout radius and `norm_sq` is `|z|²` at that iterate.
    Escaped { iterations: u32, norm_sq: f64 },

    /// The orbit stayed bounded for the whole budget.
    Interior,
}

impl IterationResult {
    /// Integer classification for comparing neighbouring pixels.
    #[inline]
    pub fn class(&self) -> u64 {
        match self {
            Self::Escaped { iterations, .. } => *iterations as u64,
            Self::Interior => u64::MAX,
        }
    }

    /// How many iterations the orbit survived, saturating at `limit`.
    #[inline]
    pub fn survived(&self, limit: u32) -> u32 {
        match self {
            Self::Escaped { iterations, .. } => (*iterations).min(limit),
            Self::Interior => limit,
        }
    }
}

/// Which family of sets a map iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalKind {
    #[default]
    Mandelbrot,
    Julia,
}

impl FractalKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot",
            Self::Julia => "Julia",
        }
    }
}

/// Parameters controlling fractal iteration.
///
/// The cached `escape_radius_sq` field is recomputed on deserialization so
/// saved configs always stay consistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FractalParams {
    /// Maximum number of iterations before declaring a point interior.
    pub max_iterations: u32,

    /// Bailout radius; the loops compare `|z|²` against its square.
    pub escape_radius: f64,

    #[serde(skip)]
    escape_radius_sq: f64,
}

impl<'de> Deserialize<'de> for FractalParams {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            max_iterations: u32,
            escape_radius: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(Self {
            max_iterations: raw.max_iterations,
            escape_radius: raw.escape_radius,
            escape_radius_sq: raw.escape_radius * raw.escape_radius,
        })
    }
}

impl FractalParams {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 256;
    pub const DEFAULT_ESCAPE_RADIUS: f64 = 2.0;

    pub fn new(max_iterations: u32, escape_radius: f64) -> crate::Result<Self> {
        if max_iterations < 1 {
            return Err(CoreError::InvalidMaxIterations(max_iterations));
        }
        if escape_radius <= 0.0 || !escape_radius.is_finite() {
            return Err(CoreError::InvalidEscapeRadius(escape_radius));
        }
        Ok(Self {
            max_iterations,
            escape_radius,
            escape_radius_sq: escape_radius * escape_radius,
        })
    }

    /// Squared bailout radius for the inner loops.
    #[inline]
    pub fn escape_radius_sq(&self) -> f64 {
        self.escape_radius_sq
    }

    /// Return a copy with a different `max_iterations` value.
    pub fn with_max_iterations(self, max_iterations: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            ..self
        }
    }
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            escape_radius: Self::DEFAULT_ESCAPE_RADIUS,
            escape_radius_sq: Self::DEFAULT_ESCAPE_RADIUS * Self::DEFAULT_ESCAPE_RADIUS,
        }
    }
}

/// The iteration function `z ← z² + p` of one fractal family.
///
/// A map decides where the orbit of a point starts and which term is added
/// each step. Reference orbits, probes, and per-pixel perturbation are all
/// written against this trait, so the renderer variants differ only in the
/// map they plug in.
pub trait IterationMap {
    fn kind(&self) -> FractalKind;

    /// First iterate `z₀` for the orbit of `point`.
    fn seed(&self, point: ComplexDD) -> ComplexDD;

    /// The additive term `p` for the orbit of `point`.
    fn parameter(&self, point: ComplexDD) -> ComplexDD;

    /// Split a pixel's offset from the reference into `(δ₀, δp)`: the initial
    /// delta of the orbit and the delta added on every step.
    fn split_delta(&self, pixel_delta: Complex) -> (Complex, Complex);

    /// The additive term when it is the same for every point, as for Julia
    /// sets. `None` when it varies with the point.
    fn fixed_parameter(&self) -> Option<Complex> {
        None
    }

    #[inline]
    fn step(&self, z: ComplexDD, parameter: ComplexDD) -> ComplexDD {
        z.square() + parameter
    }

    /// Bounded DD probe: index of the first iterate outside the bailout.
    fn escape_time(&self, point: ComplexDD, escape_radius_sq: f64, limit: u32) -> IterationResult {
        let bailout = DoubleDouble::from(escape_radius_sq);
        let parameter = self.parameter(point);
        let mut z = self.seed(point);
        for n in 0..limit {
            let norm_sq = z.norm_sq();
            if norm_sq > bailout {
                return IterationResult::Escaped {
                    iterations: n,
                    norm_sq: norm_sq.value(),
                };
            }
            z = self.step(z, parameter);
        }
        IterationResult::Interior
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params() {
        let p = FractalParams::default();
        assert_eq!(p.max_iterations, 256);
        assert!((p.escape_radius_sq() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn valid_params() {
        let p = FractalParams::new(1000, 4.0).unwrap();
        assert_eq!(p.max_iterations, 1000);
        assert!((p.escape_radius_sq() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_params() {
        assert!(FractalParams::new(0, 2.0).is_err());
        assert!(FractalParams::new(256, 0.0).is_err());
        assert!(FractalParams::new(256, f64::NAN).is_err());
        assert!(FractalParams::new(256, f64::INFINITY).is_err());
    }

    #[test]
    fn deserialize_recomputes_square() {
        let p: FractalParams =
            serde_json::from_str(r#"{"max_iterations":64,"escape_radius":3.0}"#).unwrap();
        assert_eq!(p.max_iterations, 64);
        assert!((p.escape_radius_sq() - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn survived_saturates() {
        let r = IterationResult::Escaped {
            iterations: 40,
            norm_sq: 5.0,
        };
        assert_eq!(r.survived(100), 40);
        assert_eq!(r.survived(10), 10);
        assert_eq!(IterationResult::Interior.survived(100), 100);
    }
}
