use thiserror::Error;

use deepbrot_render::RenderError;

/// Errors originating from the application layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid animation target: {what} = {value}")]
    InvalidTarget { what: &'static str, value: f64 },

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("preferences I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("preferences JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<deepbrot_core::CoreError> for AppError {
    fn from(e: deepbrot_core::CoreError) -> Self {
        Self::Render(RenderError::Core(e))
    }
}
