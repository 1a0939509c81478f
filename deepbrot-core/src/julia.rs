use crate::complex::Complex;
use crate::complex_dd::ComplexDD;
use crate::fractal::{FractalKind, IterationMap};

/// The Julia map: `z_{n+1} = z_n² + c`, where `c` is a fixed constant
/// shared by every pixel and `z₀` is the point being iterated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JuliaMap {
    c: Complex,
}

impl JuliaMap {
    pub fn new(c: Complex) -> Self {
        Self { c }
    }

    /// A visually interesting default: `c = -0.7 + 0.27015i`.
    pub fn default_c() -> Complex {
        Complex::new(-0.7, 0.27015)
    }

    /// The constant `c` defining this Julia set.
    pub fn c(&self) -> Complex {
        self.c
    }
}

impl Default for JuliaMap {
    fn default() -> Self {
        Self::new(Self::default_c())
    }
}

impl IterationMap for JuliaMap {
    fn kind(&self) -> FractalKind {
        FractalKind::Julia
    }

    #[inline]
    fn seed(&self, point: ComplexDD) -> ComplexDD {
        point
    }

    #[inline]
    fn parameter(&self, _point: ComplexDD) -> ComplexDD {
        ComplexDD::from(self.c)
    }

    /// The offset lives in the starting iterate: `δ₀ = δz`, nothing added per step.
    #[inline]
    fn split_delta(&self, pixel_delta: Complex) -> (Complex, Complex) {
        (pixel_delta, Complex::ZERO)
    }

    #[inline]
    fn fixed_parameter(&self) -> Option<Complex> {
        Some(self.c)
    }
}
