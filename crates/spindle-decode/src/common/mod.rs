pub mod error;
pub mod sampling;

pub use error::{GenerationError, GenerationResult};
pub use sampling::*;

use serde::{Deserialize, Serialize};

/// Temperatures below this value select greedy decoding regardless of other settings.
pub const GREEDY_TEMPERATURE_THRESHOLD: f32 = 0.01;

/// Parameters for a single generation call.
///
/// Built once per call and never mutated by the decoder. Whether sampling
/// happens at all, and which strategy is used, is decided by [`select_strategy`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound on generated tokens. Also bounded by the backend context.
    pub max_new_tokens: usize,
    /// Logit divisor. Only meaningful when `do_sample` is set.
    pub temperature: f32,
    /// Nucleus threshold. Values outside `(0, 1)` disable top-p.
    pub top_p: f32,
    /// Rank cutoff. `None` or `Some(0)` disables top-k.
    pub top_k: Option<usize>,
    /// Generation stops once the decoded text contains this string.
    pub stop_sequence: Option<String>,
    /// `false` forces greedy decoding.
    pub do_sample: bool,
    /// Fixed seed for the sampler's RNG. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            temperature: 1.0,
            top_p: 0.9,
            top_k: Some(50),
            stop_sequence: None,
            do_sample: true,
            seed: None,
        }
    }
}

impl GenerationConfig {
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder::default()
    }

    /// Greedy decoding with the given token budget.
    pub fn greedy(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            do_sample: false,
            ..Default::default()
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug, Clone, Default)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.config.max_new_tokens = max_new_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = top_p;
        self
    }

    /// Pass `None` to disable top-k.
    pub fn top_k(mut self, top_k: impl Into<Option<usize>>) -> Self {
        self.config.top_k = top_k.into();
        self
    }

    pub fn stop_sequence(mut self, stop: impl Into<String>) -> Self {
        self.config.stop_sequence = Some(stop.into());
        self
    }

    pub fn do_sample(mut self, do_sample: bool) -> Self {
        self.config.do_sample = do_sample;
        self
    }

    /// Negative seeds mean "non-deterministic".
    pub fn seed(mut self, seed: i64) -> Self {
        self.config.seed = u64::try_from(seed).ok();
        self
    }

    pub fn build(self) -> GenerationConfig {
        self.config
    }
}

/// Why a decode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The sampler produced the tokenizer's end-of-sequence id.
    EosReached,
    /// The token budget or the backend context window was exhausted.
    MaxLengthReached,
    /// The decoded text now contains the configured stop sequence.
    StopSequenceMatched,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EosReached => "eos",
            Self::MaxLengthReached => "max_length",
            Self::StopSequenceMatched => "stop_sequence",
        };
        f.write_str(s)
    }
}
