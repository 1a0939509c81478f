pub mod complex;
pub mod complex_dd;
pub mod double_double;
pub mod error;
pub mod float_split;
pub mod fractal;
pub mod julia;
pub mod mandelbrot;
pub mod perturbation;
pub mod rebase;
pub mod reference_orbit;
pub mod view;
pub mod viewport;

// Re-export primary types for convenience.
pub use complex::Complex;
pub use complex_dd::ComplexDD;
pub use double_double::DoubleDouble;
pub use error::CoreError;
pub use float_split::{GpuPair, SplitMethod};
pub use fractal::{FractalKind, FractalParams, IterationMap, IterationResult};
pub use julia::JuliaMap;
pub use mandelbrot::MandelbrotMap;
pub use rebase::{RebaseDecision, RebasePolicy, RebaseState, RebaseThresholds, RebaseTrigger};
pub use reference_orbit::{
    classify_reference, OrbitTexel, ReferenceOrbit, ReferenceSelector, SearchConfig, Selection, SelectionMode,
    SelectionSource,
};
pub use view::{PaletteState, ViewSnapshot, ViewState};
pub use viewport::Viewport;

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
