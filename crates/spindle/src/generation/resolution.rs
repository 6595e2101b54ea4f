//! Generation configuration resolution.
//!
//! Merges model defaults, user overrides, and runtime overrides
//! into a fully resolved configuration.

use std::path::Path;

use log::debug;
use spindle_decode::GenerationConfig;

use super::overrides::GenerationOverrides;
use crate::common::{SpindleError, SpindleResult};

/// File name of the defaults a model ships with.
pub const GENERATION_CONFIG_FILE: &str = "generation_config.json";

/// Merge model defaults, user overrides, and runtime overrides into a
/// fully resolved generation configuration.
///
/// # Precedence (highest to lowest)
///
/// 1. Runtime overrides
/// 2. User overrides
/// 3. Model defaults
///
/// # Example
///
/// ```
/// use spindle::generation::{GenerationOverrides, resolve_generation_config};
/// use spindle::GenerationConfig;
///
/// let user = GenerationOverrides { temperature: Some(0.8), ..Default::default() };
/// let runtime = GenerationOverrides { max_new_tokens: Some(32), ..Default::default() };
///
/// let config = resolve_generation_config(GenerationConfig::default(), &user, &runtime);
/// assert_eq!(config.temperature, 0.8);
/// assert_eq!(config.max_new_tokens, 32);
/// ```
pub fn resolve_generation_config(
    model_defaults: GenerationConfig,
    user: &GenerationOverrides,
    runtime: &GenerationOverrides,
) -> GenerationConfig {
    let mut config = model_defaults;

    if let Some(v) = runtime.do_sample.or(user.do_sample) {
        config.do_sample = v;
    }
    if let Some(v) = runtime.max_new_tokens.or(user.max_new_tokens) {
        config.max_new_tokens = v;
    }
    if let Some(v) = runtime.temperature.or(user.temperature) {
        config.temperature = v;
    }
    if let Some(v) = runtime.top_p.or(user.top_p) {
        config.top_p = v;
    }
    if let Some(v) = runtime.top_k.or(user.top_k) {
        config.top_k = Some(v);
    }
    if let Some(v) = runtime.seed.or(user.seed) {
        config.seed = Some(v);
    }
    if let Some(v) = runtime.stop_sequence.as_ref().or(user.stop_sequence.as_ref()) {
        config.stop_sequence = Some(v.clone());
    }

    config
}

/// Reads `generation_config.json` from `model_dir` and applies it over the
/// library defaults. A missing file yields the library defaults.
pub fn load_model_defaults(model_dir: &Path) -> SpindleResult<GenerationConfig> {
    let path = model_dir.join(GENERATION_CONFIG_FILE);
    if !path.is_file() {
        return Ok(GenerationConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let shipped: GenerationOverrides =
        serde_json::from_str(&content).map_err(|e| SpindleError::LoadFailed {
            model: model_dir.display().to_string(),
            source: anyhow::anyhow!("invalid {}: {}", GENERATION_CONFIG_FILE, e),
        })?;
    if shipped.is_empty() {
        debug!("{} sets no generation parameters", path.display());
    } else {
        debug!("Model generation defaults from {}: {:?}", path.display(), shipped);
    }

    Ok(resolve_generation_config(
        GenerationConfig::default(),
        &shipped,
        &GenerationOverrides::default(),
    ))
}
