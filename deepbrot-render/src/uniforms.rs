//! The uniform block handed to the perturbation shader each frame.

use bytemuck::{Pod, Zeroable};

use deepbrot_core::{Complex, ComplexDD, DoubleDouble, GpuPair, PaletteState, SplitMethod};

/// Per-frame uniforms. Precision-critical values (view delta from the
/// reference, zoom) travel as split high/low pairs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    // pan − reference, split
    pub delta_re_hi: f32,
    pub delta_re_lo: f32,
    pub delta_im_hi: f32,
    pub delta_im_lo: f32,

    // zoom, split
    pub zoom_hi: f32,
    pub zoom_lo: f32,

    pub rotation: f32,
    pub palette_offset: f32,
    pub julia_c_re: f32,
    pub julia_c_im: f32,
    pub escape_radius_sq: f32,
    pub _pad0: f32,

    pub max_iterations: u32,
    pub orbit_len: u32,
    /// Orbit slots the shader may read before it must rebase.
    pub orbit_valid_len: u32,
    pub reference_escaped: u32,

    pub palette_index: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub _pad1: u32,
}

/// Inputs for [`FrameUniforms::new`].
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs {
    pub pan: ComplexDD,
    pub reference: ComplexDD,
    pub zoom: f64,
    pub rotation: f64,
    pub julia_c: Complex,
    pub palette: PaletteState,
    pub escape_radius_sq: f64,
    pub max_iterations: u32,
    pub orbit_len: usize,
    pub orbit_valid_len: usize,
    pub reference_escaped: bool,
    pub viewport: (u32, u32),
}

impl FrameUniforms {
    pub fn new(inputs: &FrameInputs, split: SplitMethod) -> Self {
        // The subtraction happens in DD; only the small result is rounded.
        let delta = inputs.pan - inputs.reference;
        let re = split.split_dd(delta.re);
        let im = split.split_dd(delta.im);
        let zoom = split.split_dd(DoubleDouble::from(inputs.zoom));
        Self {
            delta_re_hi: re.high,
            delta_re_lo: re.low,
            delta_im_hi: im.high,
            delta_im_lo: im.low,
            zoom_hi: zoom.high,
            zoom_lo: zoom.low,
            rotation: inputs.rotation as f32,
            palette_offset: inputs.palette.offset,
            julia_c_re: inputs.julia_c.re as f32,
            julia_c_im: inputs.julia_c.im as f32,
            escape_radius_sq: inputs.escape_radius_sq as f32,
            _pad0: 0.0,
            max_iterations: inputs.max_iterations,
            orbit_len: inputs.orbit_len as u32,
            orbit_valid_len: inputs.orbit_valid_len as u32,
            reference_escaped: u32::from(inputs.reference_escaped),
            palette_index: inputs.palette.index,
            viewport_width: inputs.viewport.0,
            viewport_height: inputs.viewport.1,
            _pad1: 0,
        }
    }

    /// View delta as the shader reconstructs it.
    pub fn delta(&self) -> Complex {
        Complex::new(
            GpuPair {
                high: self.delta_re_hi,
                low: self.delta_re_lo,
            }
            .reconstruct(),
            GpuPair {
                high: self.delta_im_hi,
                low: self.delta_im_lo,
            }
            .reconstruct(),
        )
    }

    pub fn zoom(&self) -> f64 {
        GpuPair {
            high: self.zoom_hi,
            low: self.zoom_lo,
        }
        .reconstruct()
    }
}
