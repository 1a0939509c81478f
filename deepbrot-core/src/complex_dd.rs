use std::ops::{Add, Mul, Neg, Sub};

use crate::complex::Complex;
use crate::double_double::DoubleDouble;

/// A complex number using double-double components (~31 decimal digits per axis).
///
/// Holds the authoritative pan position, the reference point, and the
/// reference-orbit iterates while they are being computed. Deltas handed to
/// the GPU are always formed by subtracting two `ComplexDD` values first and
/// rounding afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComplexDD {
    pub re: DoubleDouble,
    pub im: DoubleDouble,
}

impl ComplexDD {
    pub const ZERO: Self = Self {
        re: DoubleDouble::ZERO,
        im: DoubleDouble::ZERO,
    };

    #[inline]
    pub fn new(re: DoubleDouble, im: DoubleDouble) -> Self {
        Self { re, im }
    }

    /// Returns `re² + im²` without taking the square root.
    #[inline]
    pub fn norm_sq(self) -> DoubleDouble {
        self.re * self.re + self.im * self.im
    }

    /// `z²` with the cross term computed once.
    #[inline]
    pub fn square(self) -> Self {
        let cross = self.re * self.im;
        Self {
            re: self.re * self.re - self.im * self.im,
            im: cross + cross,
        }
    }

    /// Accumulate a plain offset in place, keeping the low-order bits.
    #[inline]
    pub fn add_f64(&mut self, offset: Complex) {
        self.re.add_f64(offset.re);
        self.im.add_f64(offset.im);
    }

    /// Collapse to `f64` complex.
    #[inline]
    pub fn value(self) -> Complex {
        Complex::new(self.re.value(), self.im.value())
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl From<Complex> for ComplexDD {
    #[inline]
    fn from(c: Complex) -> Self {
        Self {
            re: DoubleDouble::from(c.re),
            im: DoubleDouble::from(c.im),
        }
    }
}

// -- Arithmetic operators --

impl Add for ComplexDD {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl Sub for ComplexDD {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl Mul for ComplexDD {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl Neg for ComplexDD {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            re: -self.re,
            im: -self.im,
        }
    }
}

/// Scalar multiplication: `ComplexDD * f64`, used for interpolating pan.
impl Mul<f64> for ComplexDD {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self {
            re: self.re * rhs,
            im: self.im * rhs,
        }
    }
}

impl std::fmt::Display for ComplexDD {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} + {}·i", self.re, self.im)
    }
}
