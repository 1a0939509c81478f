//! The seam between the renderers and a raster/shader pipeline.
//!
//! A backend owns a compiled perturbation program per fractal kind and a
//! 1-D float texture holding the reference orbit. Data crosses the seam as
//! raw bytes produced with `bytemuck`, exactly as it would be handed to a
//! graphics API.

use deepbrot_core::FractalKind;

/// What the device can do. Checked once when a renderer is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Sampling from 32-bit float textures.
    pub float_textures: bool,
    /// Largest texture width, in texels.
    pub max_texture_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

pub trait GpuBackend {
    fn capabilities(&self) -> Capabilities;

    /// `true` once the device has dropped every resource.
    fn is_context_lost(&self) -> bool;

    /// Re-acquire a lost device. Every handle issued before the loss is invalid
    /// afterwards.
    fn restore_context(&mut self) -> crate::Result<()>;

    fn compile_program(&mut self, kind: FractalKind) -> crate::Result<ProgramHandle>;

    /// Allocate an orbit texture of `len` texels.
    fn create_orbit_texture(&mut self, len: usize) -> crate::Result<TextureHandle>;

    fn delete_texture(&mut self, texture: TextureHandle);

    /// Replace the texture contents with packed `OrbitTexel` bytes.
    fn upload_orbit(&mut self, texture: TextureHandle, bytes: &[u8]) -> crate::Result<()>;

    /// Upload the packed `FrameUniforms` block for `program`.
    fn upload_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]) -> crate::Result<()>;

    fn draw(&mut self, program: ProgramHandle, texture: TextureHandle) -> crate::Result<()>;

    /// Free every program and texture.
    fn release(&mut self);
}
