//! Error types for the decoding core.

use thiserror::Error;

/// Errors raised while configuring or running a decode.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A sampling parameter is out of range.
    ///
    /// Only raised when a strategy is constructed, never from inside the loop.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The forward pass failed or returned malformed logits.
    #[error("Inference failed at step {step}: {source}")]
    InferenceFailure {
        step: usize,
        #[source]
        source: anyhow::Error,
    },

    /// The tokenizer could not turn a sampled id back into text.
    #[error("Tokenizer failed to decode token: {0}")]
    Tokenization(#[source] anyhow::Error),
}

/// Result type for decoding operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_error_display() {
        let err = GenerationError::InvalidConfiguration("k must be positive".to_string());
        assert!(err.to_string().contains("k must be positive"));

        let err = GenerationError::InferenceFailure {
            step: 3,
            source: anyhow!("device lost"),
        };
        let msg = err.to_string();
        assert!(msg.contains("step 3"));
        assert!(msg.contains("device lost"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GenerationError>();
    }
}
