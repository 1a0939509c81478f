//! Animation orchestration, presets and persisted preferences for deepbrot.

pub mod animation;
pub mod app_dir;
pub mod easing;
pub mod error;
pub mod preferences;
pub mod presets;

pub use animation::{
    AnimationHandle, Animator, Completion, JuliaDive, Segment, Target, TaskClass, TickReport,
};
pub use easing::Easing;
pub use error::AppError;
pub use preferences::AppPreferences;
pub use presets::{builtin_presets, Preset, TravelSettings};

pub type Result<T> = std::result::Result<T, AppError>;
