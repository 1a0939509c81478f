use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// A double-double floating-point number: ~31 significant decimal digits.
///
/// Stores a value as `hi + lo` using two `f64` components with the invariant
/// `|lo| ≤ ε·|hi|`. Pan coordinates and reference points live in this type;
/// every incremental update has to go through [`add_f64`](Self::add_f64) or
/// the DD operators, because a single plain `f64` addition collapses the
/// value back to 53 bits.
///
/// Reference: Hida, Li, Bailey — "Library for Double-Double and Quad-Double
/// Arithmetic" (2001).
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleDouble {
    pub hi: f64,
    pub lo: f64,
}

// ---------------------------------------------------------------------------
// Error-free building blocks
// ---------------------------------------------------------------------------

/// Knuth's TwoSum: error-free addition of two `f64` values.
/// Returns `(s, e)` where `s + e = a + b` exactly. No ordering constraint.
#[inline]
pub fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let v = s - a;
    let e = (a - (s - v)) + (b - v);
    (s, e)
}

/// Fast path for TwoSum. Only exact when `|a| >= |b|`.
#[inline]
pub fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let e = b - (s - a);
    (s, e)
}

/// FMA-based TwoProd: error-free multiplication.
/// Returns `(p, e)` where `p + e = a * b` exactly.
#[inline]
pub fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let e = a.mul_add(b, -p);
    (p, e)
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl DoubleDouble {
    pub const ZERO: Self = Self { hi: 0.0, lo: 0.0 };

    #[inline]
    pub fn new(hi: f64, lo: f64) -> Self {
        Self { hi, lo }
    }

    /// Overwrite with a plain scalar, discarding the error term.
    #[inline]
    pub fn set(&mut self, val: f64) {
        self.hi = val;
        self.lo = 0.0;
    }

    /// The combined value as a single `f64` (loses the low-order bits).
    #[inline]
    pub fn value(self) -> f64 {
        self.hi + self.lo
    }

    /// Add a plain scalar in place: two-sum followed by renormalization.
    #[inline]
    pub fn add_f64(&mut self, n: f64) {
        let (s, e) = two_sum(self.hi, n);
        let e = e + self.lo;
        let (hi, lo) = quick_two_sum(s, e);
        self.hi = hi;
        self.lo = lo;
    }

    #[inline]
    pub fn abs(self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self
        }
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.hi < 0.0 || (self.hi == 0.0 && self.lo < 0.0)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.hi.is_finite() && self.lo.is_finite()
    }
}

impl From<f64> for DoubleDouble {
    #[inline]
    fn from(val: f64) -> Self {
        Self { hi: val, lo: 0.0 }
    }
}

// ---------------------------------------------------------------------------
// Arithmetic: DD + DD
// ---------------------------------------------------------------------------

impl Add for DoubleDouble {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let (s1, s2) = two_sum(self.hi, rhs.hi);
        let (t1, t2) = two_sum(self.lo, rhs.lo);
        let s2 = s2 + t1;
        let (s1, s2) = quick_two_sum(s1, s2);
        let s2 = s2 + t2;
        let (hi, lo) = quick_two_sum(s1, s2);
        Self { hi, lo }
    }
}

impl AddAssign for DoubleDouble {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl AddAssign<f64> for DoubleDouble {
    #[inline]
    fn add_assign(&mut self, rhs: f64) {
        self.add_f64(rhs);
    }
}

// ---------------------------------------------------------------------------
// Arithmetic: DD - DD
// ---------------------------------------------------------------------------

impl Sub for DoubleDouble {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl SubAssign for DoubleDouble {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

// ---------------------------------------------------------------------------
// Arithmetic: DD * DD
// ---------------------------------------------------------------------------

impl Mul for DoubleDouble {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let (p1, p2) = two_prod(self.hi, rhs.hi);
        let p2 = p2 + self.hi * rhs.lo + self.lo * rhs.hi;
        let (hi, lo) = quick_two_sum(p1, p2);
        Self { hi, lo }
    }
}

impl MulAssign for DoubleDouble {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

/// Scalar multiplication: `DoubleDouble * f64`.
impl Mul<f64> for DoubleDouble {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        let (p1, p2) = two_prod(self.hi, rhs);
        let p2 = p2 + self.lo * rhs;
        let (hi, lo) = quick_two_sum(p1, p2);
        Self { hi, lo }
    }
}

// ---------------------------------------------------------------------------
// Arithmetic: negation
// ---------------------------------------------------------------------------

impl Neg for DoubleDouble {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            hi: -self.hi,
            lo: -self.lo,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

impl PartialEq for DoubleDouble {
    fn eq(&self, other: &Self) -> bool {
        self.hi == other.hi && self.lo == other.lo
    }
}

impl PartialOrd for DoubleDouble {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.hi.partial_cmp(&other.hi) {
            Some(Ordering::Equal) => self.lo.partial_cmp(&other.lo),
            ord => ord,
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for DoubleDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:+.17e} + {:+.17e})", self.hi, self.lo)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
