// Service error types
// Crate-level error taxonomy: fatal configuration errors vs recoverable
// per-combination failures (which never surface through these types)

use thiserror::Error;

use crate::engine::EngineError;

/// Errors in the matrix document or its naming templates.
///
/// These are matrix authoring bugs: they abort the whole run rather than a
/// single combination.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read matrix definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse matrix definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid matrix definition: {0}")]
    Invalid(String),

    #[error("template '{template}' references '{placeholder}', which is not an axis")]
    UnknownPlaceholder { template: String, placeholder: String },

    #[error("unbalanced braces in template '{0}'")]
    UnbalancedBraces(String),
}

/// Top-level error for a matrix run.
///
/// Per-combination failures (render, pack, build) are reported as outcomes,
/// not as `ServiceError`; anything reaching this type ends the run.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
