//! Model loading configuration.

mod config;

pub use config::{DEFAULT_CONTEXT_LENGTH, ModelConfig, ModelConfigBuilder, ModelFormat};
