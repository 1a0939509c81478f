//! Splitting precise scalars into pairs a single-precision shader can sum back.
//!
//! The shader reconstructs `high + low` with compensated (two-sum) addition,
//! so the pair carries roughly twice the mantissa of its component type.

use serde::{Deserialize, Serialize};

use crate::double_double::DoubleDouble;

/// Veltkamp–Dekker splitting constant `2^27 + 1` for `f64`.
pub const VELTKAMP_K: f64 = 134_217_729.0;

/// A high/low pair in the GPU's native single precision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuPair {
    pub high: f32,
    pub low: f32,
}

impl GpuPair {
    /// What the shader sees after compensated summation, widened to `f64`.
    #[inline]
    pub fn reconstruct(self) -> f64 {
        f64::from(self.high) + f64::from(self.low)
    }
}

/// Veltkamp–Dekker split: `high` keeps the top 26 significant bits, `low`
/// the remainder. `high + low == v` exactly for every finite `v` whose
/// magnitude leaves headroom for the `K·v` product.
#[inline]
pub fn veltkamp_split(v: f64) -> (f64, f64) {
    let t = VELTKAMP_K * v;
    let high = t - (t - v);
    let low = v - high;
    (high, low)
}

/// Emulated-double split: `high` is `v` rounded to `f32`, `low` is the
/// residual rounded the same way. Matches what the GPU stores bit for bit.
#[inline]
pub fn gpu_split(v: f64) -> (f32, f32) {
    let high = v as f32;
    let low = (v - f64::from(high)) as f32;
    (high, low)
}

/// Split a double-double so bits below `f64` resolution reach `low`.
///
/// `high` is the DD rounded to `f32`; the residual `dd - high` is formed in
/// DD before rounding, which matters once the value is a tiny delta whose
/// `lo` word is significant.
#[inline]
pub fn split_dd(value: DoubleDouble) -> GpuPair {
    let high = value.value() as f32;
    let residual = value - DoubleDouble::from(f64::from(high));
    GpuPair {
        high,
        low: residual.value() as f32,
    }
}

/// Which splitting scheme feeds the uniform values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Veltkamp–Dekker head rounded into an `f32` slot, with the exact
    /// residual against that rounded head in `low`.
    Veltkamp,
    /// `f32` head plus `f32` residual.
    #[default]
    GpuEmulated,
}

impl SplitMethod {
    /// Split a plain scalar into the pair uploaded as a uniform.
    pub fn split(self, v: f64) -> GpuPair {
        self.split_dd(DoubleDouble::from(v))
    }

    /// Split a double-double. Both methods keep the DD residual in `low`.
    pub fn split_dd(self, value: DoubleDouble) -> GpuPair {
        match self {
            Self::Veltkamp => {
                let (head, _) = veltkamp_split(value.value());
                let high = head as f32;
                let residual = value - DoubleDouble::from(f64::from(high));
                GpuPair {
                    high,
                    low: residual.value() as f32,
                }
            }
            Self::GpuEmulated => split_dd(value),
        }
    }
}
