//! Common error types for spindle.

use spindle_decode::GenerationError;
use thiserror::Error;

/// Errors that can occur when using the engine, resolver or cache.
#[derive(Debug, Error)]
pub enum SpindleError {
    /// Generation was requested before a model was loaded.
    #[error("No model loaded. Call load_model() before generating.")]
    EngineNotReady,

    /// The decode itself failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Neither an existing local path nor a Hugging Face repo id.
    #[error("Model not found: '{0}'. Provide a valid local path or Hugging Face repo id (org/repo).")]
    ModelNotFound(String),

    /// Failed to load model.
    #[error("Failed to load model '{model}': {source}")]
    LoadFailed {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// Failed to download model.
    #[error("Failed to download model '{model}': {source}")]
    DownloadFailed {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for spindle operations.
pub type SpindleResult<T> = Result<T, SpindleError>;
