//! Per-pixel perturbation against a stored reference orbit.
//!
//! This is the arithmetic the fragment shader performs, run on the CPU. Each
//! pixel iterates only its offset `δ` from the reference orbit `Z`:
//!
//! ```text
//! δ' = 2·Z_m·δ + δ² + δp
//! ```
//!
//! where `(δ₀, δp)` come from [`IterationMap::split_delta`]. When the full
//! value `Z_m + δ` gets smaller than `δ` itself, or the stored orbit runs out,
//! the pixel rebases onto the start of the orbit (`δ ← Z_m + δ − Z_0`, `m ← 0`).

use crate::complex::Complex;
use crate::fractal::{IterationMap, IterationResult};
use crate::reference_orbit::{OrbitTexel, ReferenceOrbit};

/// Iterate one pixel whose offset from the reference point is `pixel_delta`.
pub fn perturb_pixel<M: IterationMap + ?Sized>(
    map: &M,
    orbit: &ReferenceOrbit,
    pixel_delta: Complex,
    max_iterations: u32,
    escape_radius_sq: f64,
) -> IterationResult {
    perturb_texels(
        map,
        orbit.texels(),
        orbit.valid_len(),
        pixel_delta,
        max_iterations,
        escape_radius_sq,
    )
}

/// Same as [`perturb_pixel`], reading the orbit straight from texture texels.
/// Only the first `valid_len` texels are used.
///
/// A rebase lands on slot 0 and steps to slot 1, so the delta loop needs at
/// least two valid slots. A reference that escaped at its seed leaves one; the
/// pixel then iterates its own value in plain precision.
pub fn perturb_texels<M: IterationMap + ?Sized>(
    map: &M,
    texels: &[OrbitTexel],
    valid_len: usize,
    pixel_delta: Complex,
    max_iterations: u32,
    escape_radius_sq: f64,
) -> IterationResult {
    let valid = valid_len.min(texels.len());
    if valid == 0 {
        return IterationResult::Interior;
    }

    let (mut dz, dp) = map.split_delta(pixel_delta);
    let z0 = texels[0].value();
    if valid == 1 {
        return iterate_plain(map, z0 + dz, dp, max_iterations, escape_radius_sq);
    }
    let mut m = 0usize;

    for n in 0..max_iterations {
        let mut z_m = texels[m].value();
        let z = z_m + dz;
        let norm_sq = z.norm_sq();
        if norm_sq > escape_radius_sq {
            return IterationResult::Escaped {
                iterations: n,
                norm_sq,
            };
        }

        // Rebase
        if norm_sq < dz.norm_sq() || m + 1 >= valid {
            dz = z - z0;
            m = 0;
            z_m = z0;
        }

        dz = z_m * dz * 2.0 + dz.square() + dp;
        m += 1;
    }

    IterationResult::Interior
}

/// Direct iteration from the pixel's own seed. Only maps with a fixed
/// parameter get past iterate 0; for the others a one-slot orbit carries no
/// parameter to step with.
fn iterate_plain<M: IterationMap + ?Sized>(
    map: &M,
    seed: Complex,
    dp: Complex,
    max_iterations: u32,
    escape_radius_sq: f64,
) -> IterationResult {
    let mut z = seed;
    let parameter = map.fixed_parameter().map(|c| c + dp);
    for n in 0..max_iterations {
        let norm_sq = z.norm_sq();
        if norm_sq > escape_radius_sq {
            return IterationResult::Escaped {
                iterations: n,
                norm_sq,
            };
        }
        let Some(p) = parameter else {
            break;
        };
        z = z.square() + p;
    }
    IterationResult::Interior
}
