//! User- and runtime-provided generation parameter overrides.
//!
//! These do NOT represent a full generation configuration.
//! They are merged with model defaults at resolution time.

use serde::{Deserialize, Serialize};

/// User- or runtime-provided overrides for text generation.
///
/// Field names match Hugging Face `generation_config.json`, so a model's
/// shipped defaults deserialize directly into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GenerationOverrides {
    /// Sampling temperature (below 0.01 = greedy, higher = more random).
    pub temperature: Option<f32>,

    /// Limit sampling to top K tokens. `0` disables top-k.
    pub top_k: Option<usize>,

    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,

    /// Maximum number of new tokens to generate.
    pub max_new_tokens: Option<usize>,

    /// Sampling vs deterministic decoding.
    ///
    /// - `Some(false)` => Force greedy decoding
    /// - `Some(true)` => Force sampling
    /// - `None` => Keep model default
    pub do_sample: Option<bool>,

    /// Fixed RNG seed.
    pub seed: Option<u64>,

    /// Stop once the generated text contains this string.
    pub stop_sequence: Option<String>,
}

impl GenerationOverrides {
    /// Check if any overrides are set.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_k.is_none()
            && self.top_p.is_none()
            && self.max_new_tokens.is_none()
            && self.do_sample.is_none()
            && self.seed.is_none()
            && self.stop_sequence.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(GenerationOverrides::default().is_empty());
        let seeded = GenerationOverrides {
            seed: Some(1),
            ..Default::default()
        };
        assert!(!seeded.is_empty());
    }

    #[test]
    fn test_parses_hf_generation_config() {
        let json = r#"{
            "_from_model_config": true,
            "bos_token_id": 50256,
            "eos_token_id": 50256,
            "do_sample": true,
            "temperature": 0.6,
            "top_p": 0.9,
            "transformers_version": "4.40.0"
        }"#;
        let overrides: GenerationOverrides = serde_json::from_str(json).unwrap();
        assert_eq!(overrides.do_sample, Some(true));
        assert_eq!(overrides.temperature, Some(0.6));
        assert_eq!(overrides.top_p, Some(0.9));
        assert_eq!(overrides.top_k, None);
    }

    #[test]
    fn test_config_without_generation_fields_is_empty() {
        let json = r#"{ "bos_token_id": 1, "eos_token_id": 2, "transformers_version": "4.40.0" }"#;
        let overrides: GenerationOverrides = serde_json::from_str(json).unwrap();
        assert!(overrides.is_empty());
    }
}
