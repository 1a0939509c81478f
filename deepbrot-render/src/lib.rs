pub mod config;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod iteration_buffer;
pub mod renderer;
pub mod uniforms;

pub use config::{EngineConfig, IterationBudget};
pub use engine::{PerturbationEngine, Prepared, RebuildReason};
pub use error::RenderError;
pub use gpu::{Capabilities, GpuBackend, ProgramHandle, TextureHandle};
pub use headless::{HeadlessGpu, HeadlessStats};
pub use iteration_buffer::IterationBuffer;
pub use renderer::{
    DrawReport, FractalRenderer, Julia, JuliaRenderer, Mandelbrot, MandelbrotRenderer, Renderer,
    Variant,
};
pub use uniforms::{FrameInputs, FrameUniforms};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
