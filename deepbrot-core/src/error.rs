use thiserror::Error;

/// Errors originating from the core deep-zoom engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid max iterations: {0} (must be >= 1)")]
    InvalidMaxIterations(u32),

    #[error("invalid escape radius: {0} (must be > 0.0)")]
    InvalidEscapeRadius(f64),

    #[error("invalid rebase thresholds: on = {on}, off = {off} (need 0 < off < on)")]
    InvalidRebaseThresholds { on: f64, off: f64 },

    #[error("invalid reference search config: {reason}")]
    InvalidSearchConfig { reason: String },

    #[error("invalid viewport: {reason}")]
    InvalidViewport { reason: String },

    #[error("non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
