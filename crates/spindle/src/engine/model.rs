//! Core Engine implementation.

use std::path::Path;

use log::{debug, info, warn};
use spindle_decode::{
    DecodeOutput, Decoder, GenerationConfig, GenerationError, HfTokenizer, InferenceBackend,
    MockBackend, SimpleTokenizer, TokenStream, Tokenizer,
};

use crate::common::{SpindleError, SpindleResult};
use crate::generation::{GenerationOverrides, load_model_defaults, resolve_generation_config};
use crate::model::ModelConfig;

use super::types::ModelInfo;

const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_CONFIG_FILE: &str = "config.json";

struct LoadedModel {
    backend: Box<dyn InferenceBackend>,
    tokenizer: Box<dyn Tokenizer>,
    config: ModelConfig,
    generation_defaults: GenerationConfig,
}

impl LoadedModel {
    fn decoder(&self) -> Decoder<'_> {
        Decoder::new(self.backend.as_ref(), self.tokenizer.as_ref())
    }

    fn encode(&self, prompt: &str) -> SpindleResult<Vec<u32>> {
        self.tokenizer
            .encode(prompt)
            .map_err(|e| GenerationError::Tokenization(e).into())
    }
}

/// Text generation engine.
///
/// Starts empty; generation is only possible once a backend and tokenizer
/// are in place, either through [`load_model`](Self::load_model) or one of
/// the direct constructors.
///
/// # Example
/// ```
/// use spindle::{Engine, GenerationConfig};
///
/// # fn main() -> spindle::SpindleResult<()> {
/// let engine = Engine::mock_seeded(1000, 512, 42);
/// let text = engine.generate("hello world", &GenerationConfig::greedy(16))?;
/// # let _ = text;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Engine {
    loaded: Option<LoadedModel>,
    user_overrides: GenerationOverrides,
}

impl Engine {
    /// Creates an engine with no model loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a ready engine from explicit components.
    pub fn with_components(
        backend: Box<dyn InferenceBackend>,
        tokenizer: Box<dyn Tokenizer>,
        config: ModelConfig,
    ) -> Self {
        Self {
            loaded: Some(LoadedModel {
                backend,
                tokenizer,
                config,
                generation_defaults: GenerationConfig::default(),
            }),
            user_overrides: GenerationOverrides::default(),
        }
    }

    /// A ready engine backed by [`MockBackend`] and [`SimpleTokenizer`].
    pub fn mock(vocab_size: usize, context_length: usize) -> Self {
        Self::build_mock(vocab_size, context_length, None)
    }

    /// Like [`mock`](Self::mock) with reproducible logits.
    pub fn mock_seeded(vocab_size: usize, context_length: usize, seed: u64) -> Self {
        Self::build_mock(vocab_size, context_length, Some(seed))
    }

    fn build_mock(vocab_size: usize, context_length: usize, seed: Option<u64>) -> Self {
        let config = ModelConfig::builder().context_length(context_length).build();
        Self::with_components(
            Box::new(MockBackend::new(vocab_size, context_length, seed)),
            Box::new(SimpleTokenizer::new()),
            config,
        )
    }

    /// Engine-wide overrides applied between model defaults and per-call overrides.
    pub fn with_overrides(mut self, overrides: GenerationOverrides) -> Self {
        self.user_overrides = overrides;
        self
    }

    /// Loads the tokenizer, backend and generation defaults described by `config`.
    ///
    /// Replaces any previously loaded model.
    pub fn load_model(&mut self, config: &ModelConfig) -> SpindleResult<()> {
        if config.context_length == 0 {
            return Err(SpindleError::InvalidConfig(
                "context_length must be positive".to_string(),
            ));
        }
        info!("Loading model: {}", config.name());

        let model_dir = config.model_dir();
        let eos_override = model_dir.and_then(read_eos_token_id);
        let tokenizer = load_tokenizer(config.tokenizer_path.as_deref(), eos_override)?;
        let backend = load_backend(config, tokenizer.vocab_size());
        let generation_defaults = match model_dir {
            Some(dir) => load_model_defaults(dir)?,
            None => GenerationConfig::default(),
        };

        self.loaded = Some(LoadedModel {
            backend,
            tokenizer,
            config: config.clone(),
            generation_defaults,
        });
        info!("Model loaded successfully");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// `None` until a model is loaded.
    pub fn model_info(&self) -> Option<ModelInfo> {
        self.loaded.as_ref().map(|model| ModelInfo {
            name: model.config.name(),
            format: model.config.format,
            vocab_size: model.tokenizer.vocab_size(),
            context_length: model.config.context_length,
        })
    }

    pub fn model_config(&self) -> Option<&ModelConfig> {
        self.loaded.as_ref().map(|model| &model.config)
    }

    pub fn tokenizer(&self) -> Option<&dyn Tokenizer> {
        self.loaded.as_ref().map(|model| model.tokenizer.as_ref())
    }

    /// Resolves model defaults, engine overrides and `runtime` into one config.
    pub fn generation_config(&self, runtime: &GenerationOverrides) -> SpindleResult<GenerationConfig> {
        let model = self.model()?;
        Ok(resolve_generation_config(
            model.generation_defaults.clone(),
            &self.user_overrides,
            runtime,
        ))
    }

    /// Generates a continuation of `prompt`, trimmed of surrounding whitespace.
    pub fn generate(&self, prompt: &str, config: &GenerationConfig) -> SpindleResult<String> {
        Ok(self.decode(prompt, config)?.text)
    }

    /// Like [`generate`](Self::generate) but also reports why decoding stopped.
    pub fn decode(&self, prompt: &str, config: &GenerationConfig) -> SpindleResult<DecodeOutput> {
        let model = self.model()?;
        let prompt_ids = model.encode(prompt)?;
        debug!(
            "Generating from {} prompt tokens with config: {:?}",
            prompt_ids.len(),
            config
        );
        Ok(model.decoder().decode(&prompt_ids, config)?)
    }

    /// Streams untrimmed text fragments, one per generated token.
    pub fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> SpindleResult<TokenStream<'_>> {
        let model = self.model()?;
        let prompt_ids = model.encode(prompt)?;
        debug!("Streaming from {} prompt tokens", prompt_ids.len());
        Ok(model.decoder().generate_stream(&prompt_ids, config)?)
    }

    /// Drops the loaded model. The engine is not ready afterwards.
    pub fn unload(&mut self) {
        if self.loaded.take().is_some() {
            info!("Model unloaded");
        }
    }

    fn model(&self) -> SpindleResult<&LoadedModel> {
        self.loaded.as_ref().ok_or(SpindleError::EngineNotReady)
    }
}

/// `eos_token_id` from a model's `config.json`. When a list is given the first id is used.
fn read_eos_token_id(model_dir: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(model_dir.join(MODEL_CONFIG_FILE)).ok()?;
    let json: serde_json::Value = serde_json::from_str(&content).ok()?;
    let id = match json.get("eos_token_id")? {
        serde_json::Value::Array(ids) => ids.first()?.as_u64(),
        other => other.as_u64(),
    }?;
    u32::try_from(id).ok()
}

fn load_tokenizer(
    path: Option<&Path>,
    eos_override: Option<u32>,
) -> SpindleResult<Box<dyn Tokenizer>> {
    if let Some(path) = path {
        let tokenizer_json = if path.is_dir() {
            path.join(TOKENIZER_FILE)
        } else {
            path.to_path_buf()
        };

        if tokenizer_json.is_file() {
            let mut tokenizer =
                HfTokenizer::from_file(&tokenizer_json).map_err(|e| SpindleError::LoadFailed {
                    model: tokenizer_json.display().to_string(),
                    source: e,
                })?;
            if let Some(eos) = eos_override {
                debug!("Using eos_token_id {} from {}", eos, MODEL_CONFIG_FILE);
                tokenizer = tokenizer.with_eos_token_id(eos);
            }
            info!("Loaded tokenizer from: {}", tokenizer_json.display());
            return Ok(Box::new(tokenizer));
        }
    }

    warn!("No {} found, falling back to SimpleTokenizer", TOKENIZER_FILE);
    Ok(Box::new(SimpleTokenizer::new()))
}

fn load_backend(config: &ModelConfig, vocab_size: usize) -> Box<dyn InferenceBackend> {
    match config.model_path.as_deref() {
        Some(path) if path.exists() => warn!(
            "No {} runtime available for {}, using mock backend",
            config.format,
            path.display()
        ),
        _ => warn!("No model weights found, using mock backend"),
    }
    Box::new(MockBackend::new(vocab_size, config.context_length, None))
}
