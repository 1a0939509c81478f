//! A backend with no device behind it.
//!
//! It keeps the uploaded bytes, counts every call, can simulate a lost
//! context, and rasterizes the last frame on the CPU with the same per-pixel
//! perturbation the shader runs.

use std::collections::HashMap;

use tracing::{debug, warn};

use deepbrot_core::perturbation::perturb_texels;
use deepbrot_core::{
    Complex, FractalKind, IterationMap, JuliaMap, MandelbrotMap, OrbitTexel, Viewport,
};

use crate::error::RenderError;
use crate::gpu::{Capabilities, GpuBackend, ProgramHandle, TextureHandle};
use crate::iteration_buffer::IterationBuffer;
use crate::uniforms::FrameUniforms;

const TEXEL_BYTES: usize = std::mem::size_of::<OrbitTexel>();

/// Running totals of backend calls since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub programs_compiled: u32,
    pub textures_created: u32,
    pub textures_deleted: u32,
    pub orbit_uploads: u32,
    pub uniform_uploads: u32,
    pub draws: u32,
    pub context_restores: u32,
}

#[derive(Debug)]
struct Texture {
    capacity: usize,
    texels: Vec<OrbitTexel>,
}

#[derive(Debug)]
pub struct HeadlessGpu {
    capabilities: Capabilities,
    context_lost: bool,
    next_handle: u32,
    programs: HashMap<ProgramHandle, FractalKind>,
    textures: HashMap<TextureHandle, Texture>,
    uniforms: HashMap<ProgramHandle, FrameUniforms>,
    last_draw: Option<(ProgramHandle, TextureHandle)>,
    stats: HeadlessStats,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities {
            float_textures: true,
            max_texture_size: 16_384,
        })
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            context_lost: false,
            next_handle: 1,
            programs: HashMap::new(),
            textures: HashMap::new(),
            uniforms: HashMap::new(),
            last_draw: None,
            stats: HeadlessStats::default(),
        }
    }

    /// A device without float texture support.
    pub fn without_float_textures() -> Self {
        Self::with_capabilities(Capabilities {
            float_textures: false,
            max_texture_size: 16_384,
        })
    }

    /// Drop every resource, as a browser does on `webglcontextlost`.
    pub fn lose_context(&mut self) {
        warn!("Simulating GPU context loss");
        self.context_lost = true;
        self.clear_resources();
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }

    /// Uniforms of the most recent draw.
    pub fn last_uniforms(&self) -> Option<&FrameUniforms> {
        let (program, _) = self.last_draw?;
        self.uniforms.get(&program)
    }

    /// Orbit texels of the most recent draw.
    pub fn last_orbit(&self) -> Option<&[OrbitTexel]> {
        let (_, texture) = self.last_draw?;
        self.textures.get(&texture).map(|t| t.texels.as_slice())
    }

    /// Rasterize the most recent draw into per-pixel iteration results.
    ///
    /// Every pixel gets `view delta + pixel offset` as its offset from the
    /// reference, with all inputs read back from the uploaded bytes.
    pub fn rasterize(&self) -> Option<IterationBuffer> {
        let (program, texture) = self.last_draw?;
        let kind = *self.programs.get(&program)?;
        let u = self.uniforms.get(&program)?;
        let texels = &self.textures.get(&texture)?.texels;
        let viewport = Viewport::new(u.viewport_width, u.viewport_height).ok()?;

        let julia;
        let map: &dyn IterationMap = match kind {
            FractalKind::Mandelbrot => &MandelbrotMap,
            FractalKind::Julia => {
                julia = JuliaMap::new(Complex::new(
                    f64::from(u.julia_c_re),
                    f64::from(u.julia_c_im),
                ));
                &julia
            }
        };

        let delta = u.delta();
        let zoom = u.zoom();
        let rotation = f64::from(u.rotation);
        let valid = (u.orbit_valid_len as usize).min(u.orbit_len as usize);
        let mut buffer = IterationBuffer::new(viewport.width, viewport.height, u.max_iterations);
        for py in 0..viewport.height {
            for px in 0..viewport.width {
                let offset = viewport.pixel_offset(f64::from(px), f64::from(py), zoom, rotation);
                let result = perturb_texels(
                    map,
                    texels,
                    valid,
                    delta + offset,
                    u.max_iterations,
                    f64::from(u.escape_radius_sq),
                );
                buffer.set(px, py, result);
            }
        }
        Some(buffer)
    }

    fn issue_handle(&mut self) -> u32 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    fn clear_resources(&mut self) {
        self.programs.clear();
        self.textures.clear();
        self.uniforms.clear();
        self.last_draw = None;
    }

    fn ensure_live(&self) -> crate::Result<()> {
        if self.context_lost {
            Err(RenderError::ContextLost)
        } else {
            Ok(())
        }
    }
}

impl Default for HeadlessGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for HeadlessGpu {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn restore_context(&mut self) -> crate::Result<()> {
        self.context_lost = false;
        self.clear_resources();
        self.stats.context_restores += 1;
        debug!("Headless context restored");
        Ok(())
    }

    fn compile_program(&mut self, kind: FractalKind) -> crate::Result<ProgramHandle> {
        self.ensure_live()?;
        let handle = ProgramHandle(self.issue_handle());
        self.programs.insert(handle, kind);
        self.stats.programs_compiled += 1;
        Ok(handle)
    }

    fn create_orbit_texture(&mut self, len: usize) -> crate::Result<TextureHandle> {
        self.ensure_live()?;
        if len > self.capabilities.max_texture_size as usize {
            return Err(RenderError::Backend(format!(
                "orbit texture of {len} texels exceeds max size {}",
                self.capabilities.max_texture_size
            )));
        }
        let handle = TextureHandle(self.issue_handle());
        self.textures.insert(
            handle,
            Texture {
                capacity: len,
                texels: vec![OrbitTexel::default(); len],
            },
        );
        self.stats.textures_created += 1;
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.stats.textures_deleted += 1;
        }
    }

    fn upload_orbit(&mut self, texture: TextureHandle, bytes: &[u8]) -> crate::Result<()> {
        self.ensure_live()?;
        let tex = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| RenderError::Backend(format!("unknown texture {texture:?}")))?;
        if bytes.len() % TEXEL_BYTES != 0 || bytes.len() / TEXEL_BYTES > tex.capacity {
            return Err(RenderError::Backend(format!(
                "orbit upload of {} bytes does not fit a {}-texel texture",
                bytes.len(),
                tex.capacity
            )));
        }
        tex.texels = bytes
            .chunks_exact(TEXEL_BYTES)
            .map(bytemuck::pod_read_unaligned::<OrbitTexel>)
            .collect();
        self.stats.orbit_uploads += 1;
        Ok(())
    }

    fn upload_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]) -> crate::Result<()> {
        self.ensure_live()?;
        if !self.programs.contains_key(&program) {
            return Err(RenderError::Backend(format!("unknown program {program:?}")));
        }
        if bytes.len() != std::mem::size_of::<FrameUniforms>() {
            return Err(RenderError::Backend(format!(
                "uniform block is {} bytes, expected {}",
                bytes.len(),
                std::mem::size_of::<FrameUniforms>()
            )));
        }
        self.uniforms
            .insert(program, bytemuck::pod_read_unaligned::<FrameUniforms>(bytes));
        self.stats.uniform_uploads += 1;
        Ok(())
    }

    fn draw(&mut self, program: ProgramHandle, texture: TextureHandle) -> crate::Result<()> {
        self.ensure_live()?;
        if !self.programs.contains_key(&program) || !self.textures.contains_key(&texture) {
            return Err(RenderError::Backend("draw with a stale handle".to_string()));
        }
        self.last_draw = Some((program, texture));
        self.stats.draws += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.stats.textures_deleted += self.textures.len() as u32;
        self.clear_resources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_context_rejects_calls_until_restored() {
        let mut gpu = HeadlessGpu::new();
        let program = gpu.compile_program(FractalKind::Mandelbrot).unwrap();
        gpu.lose_context();
        assert!(gpu.is_context_lost());
        assert!(matches!(
            gpu.compile_program(FractalKind::Mandelbrot),
            Err(RenderError::ContextLost)
        ));
        gpu.restore_context().unwrap();
        // Old handles do not survive the loss.
        assert!(gpu.upload_uniforms(program, &[0; 80]).is_err());
        assert!(gpu.compile_program(FractalKind::Mandelbrot).is_ok());
    }

    #[test]
    fn orbit_upload_round_trips_texels() {
        let mut gpu = HeadlessGpu::new();
        let tex = gpu.create_orbit_texture(2).unwrap();
        let texels = [
            OrbitTexel {
                re_hi: 1.0,
                re_lo: 1e-9,
                im_hi: -2.0,
                im_lo: 0.0,
            },
            OrbitTexel::default(),
        ];
        gpu.upload_orbit(tex, bytemuck::cast_slice(&texels)).unwrap();
        assert_eq!(gpu.textures[&tex].texels, texels);
    }

    #[test]
    fn oversized_upload_rejected() {
        let mut gpu = HeadlessGpu::new();
        let tex = gpu.create_orbit_texture(1).unwrap();
        let texels = [OrbitTexel::default(); 2];
        assert!(gpu.upload_orbit(tex, bytemuck::cast_slice(&texels)).is_err());
    }

    #[test]
    fn texture_size_limit_enforced() {
        let mut gpu = HeadlessGpu::with_capabilities(Capabilities {
            float_textures: true,
            max_texture_size: 8,
        });
        assert!(gpu.create_orbit_texture(9).is_err());
    }

    #[test]
    fn nothing_to_rasterize_before_first_draw() {
        assert!(HeadlessGpu::new().rasterize().is_none());
    }
}
