use thiserror::Error;

/// Errors originating from the rendering pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("GPU is missing a required capability: {0}")]
    MissingCapability(String),

    #[error("GPU context lost")]
    ContextLost,

    #[error("GPU backend error: {0}")]
    Backend(String),

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] deepbrot_core::CoreError),
}
