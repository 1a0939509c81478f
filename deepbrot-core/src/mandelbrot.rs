use crate::complex::Complex;
use crate::complex_dd::ComplexDD;
use crate::double_double::DoubleDouble;
use crate::fractal::{FractalKind, IterationMap, IterationResult};

/// The Mandelbrot map: `z_{n+1} = z_n² + c`, starting from `z₀ = 0`,
/// where `c` is the point being iterated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MandelbrotMap;

/// Returns `true` if `c` lies inside the main cardioid.
#[inline]
fn in_cardioid(re: f64, im: f64) -> bool {
    let im2 = im * im;
    let q = (re - 0.25) * (re - 0.25) + im2;
    q * (q + (re - 0.25)) <= 0.25 * im2
}

/// Returns `true` if `c` lies inside the period-2 bulb.
#[inline]
fn in_period2_bulb(re: f64, im: f64) -> bool {
    (re + 1.0) * (re + 1.0) + im * im <= 0.0625
}

impl IterationMap for MandelbrotMap {
    fn kind(&self) -> FractalKind {
        FractalKind::Mandelbrot
    }

    #[inline]
    fn seed(&self, _point: ComplexDD) -> ComplexDD {
        ComplexDD::ZERO
    }

    #[inline]
    fn parameter(&self, point: ComplexDD) -> ComplexDD {
        point
    }

    /// Every step adds the pixel's offset: `δ' = 2·Z·δ + δ² + δc`, `δ₀ = 0`.
    #[inline]
    fn split_delta(&self, pixel_delta: Complex) -> (Complex, Complex) {
        (Complex::ZERO, pixel_delta)
    }

    fn escape_time(&self, point: ComplexDD, escape_radius_sq: f64, limit: u32) -> IterationResult {
        // Closed-form interior checks; probes spend most of their budget here otherwise.
        let c = point.value();
        if in_cardioid(c.re, c.im) || in_period2_bulb(c.re, c.im) {
            return IterationResult::Interior;
        }
        let bailout = DoubleDouble::from(escape_radius_sq);
        let mut z = ComplexDD::ZERO;
        for n in 0..limit {
            let norm_sq = z.norm_sq();
            if norm_sq > bailout {
                return IterationResult::Escaped {
                    iterations: n,
                    norm_sq: norm_sq.value(),
                };
            }
            z = z.square() + point;
        }
        IterationResult::Interior
    }
}
