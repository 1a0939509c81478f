use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Plain-precision complex value.
///
/// Carries everything that is safe in one `f64` per axis: per-pixel deltas,
/// screen-to-fractal offsets, the Julia constant and the plain mirrors of
/// DD positions. Deep coordinates live in [`ComplexDD`](crate::ComplexDD).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[inline]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Squared modulus; what the bailout test compares.
    #[inline]
    pub fn norm_sq(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    pub fn norm(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Counter-clockwise rotation by `angle` radians. Zero is exact.
    #[inline]
    pub fn rotated(self, angle: f64) -> Self {
        if angle == 0.0 {
            return self;
        }
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.re * cos - self.im * sin,
            self.re * sin + self.im * cos,
        )
    }

    #[inline]
    pub fn square(self) -> Self {
        Self::new(
            self.re * self.re - self.im * self.im,
            2.0 * self.re * self.im,
        )
    }

    /// Straight-line blend; `t = 0` gives `self`, `t = 1` gives `to`.
    #[inline]
    pub fn lerp(self, to: Self, t: f64) -> Self {
        self + (to - self) * t
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

macro_rules! componentwise {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Complex {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self {
                Self::new(self.re $op rhs.re, self.im $op rhs.im)
            }
        }
    };
}

componentwise!(Add, add, +);
componentwise!(Sub, sub, -);

impl Mul for Complex {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Mul<f64> for Complex {
    type Output = Self;

    #[inline]
    fn mul(self, k: f64) -> Self {
        Self::new(self.re * k, self.im * k)
    }
}

impl Neg for Complex {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn near(a: Complex, b: Complex) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn product_of_gaussian_integers() {
        // (1 + 2i)(3 + 4i) = -5 + 10i
        let p = Complex::new(1.0, 2.0) * Complex::new(3.0, 4.0);
        assert_eq!(p, Complex::new(-5.0, 10.0));
        assert_eq!(Complex::new(2.0, 3.0) * 4.0, Complex::new(8.0, 12.0));
        assert_eq!(-Complex::new(1.0, -2.0), Complex::new(-1.0, 2.0));
    }

    #[test]
    fn square_matches_self_product() {
        for z in [
            Complex::new(1.0, 1.0),
            Complex::new(-0.75, 0.1),
            Complex::new(0.3, -1.7),
        ] {
            assert!(near(z.square(), z * z), "{z:?}");
        }
    }

    #[test]
    fn perturbation_identity() {
        // (Z + d)² - Z² = 2Zd + d²
        let z = Complex::new(-0.7436, 0.1318);
        let d = Complex::new(3e-5, -1e-5);
        let lhs = (z + d).square() - z.square();
        let rhs = z * d * 2.0 + d.square();
        assert!((lhs - rhs).norm() < 1e-14, "{lhs:?} vs {rhs:?}");
    }

    #[test]
    fn bailout_norms() {
        let z = Complex::new(3.0, 4.0);
        assert_eq!(z.norm_sq(), 25.0);
        assert_eq!(z.norm(), 5.0);
    }

    #[test]
    fn rotation() {
        let z = Complex::new(1.0, 0.0).rotated(FRAC_PI_2);
        assert!(near(z, Complex::new(0.0, 1.0)));
        let w = Complex::new(0.3, -0.7);
        assert_eq!(w.rotated(0.0), w);
    }

    #[test]
    fn lerp_hits_both_ends() {
        let a = Complex::new(-0.75, 0.11);
        let b = Complex::new(-0.8, 0.156);
        assert_eq!(a.lerp(b, 0.0), a);
        assert!(near(a.lerp(b, 1.0), b));
        assert!(near(a.lerp(b, 0.5), Complex::new(-0.775, 0.133)));
    }

    #[test]
    fn finiteness() {
        assert!(Complex::new(1.0, 2.0).is_finite());
        assert!(!Complex::new(f64::NAN, 0.0).is_finite());
        assert!(!Complex::new(0.0, f64::NEG_INFINITY).is_finite());
    }
}
