//! Common types and utilities shared across spindle modules.

mod error;

pub use error::{SpindleError, SpindleResult};

use std::path::PathBuf;

/// Environment variable overriding the model cache root.
pub const CACHE_DIR_ENV: &str = "SPINDLE_CACHE_DIR";

/// Environment variable holding a Hugging Face access token.
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";

/// Returns the default cache directory for downloaded models.
pub fn default_cache_dir() -> SpindleResult<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::cache_dir()
        .map(|dir| dir.join("spindle"))
        .ok_or_else(|| {
            SpindleError::InvalidConfig(format!(
                "no cache directory found on this system; set {}",
                CACHE_DIR_ENV
            ))
        })
}

/// Reads the Hugging Face token from the environment, ignoring empty values.
pub fn hf_token_from_env() -> Option<String> {
    std::env::var(HF_TOKEN_ENV)
        .ok()
        .filter(|token| !token.trim().is_empty())
}
