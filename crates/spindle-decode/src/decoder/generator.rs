use std::time::{Duration, Instant};

use anyhow::anyhow;
use log::{debug, info, warn};

use crate::backend::InferenceBackend;
use crate::common::{
    GenerationConfig, GenerationError, GenerationResult, SamplingStrategy, StopReason,
    select_strategy,
};
use crate::decoder::stream::TokenStream;
use crate::tokenizer::Tokenizer;

/// Where a [`DecodeLoop`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Decoding,
    Finished(StopReason),
    /// A forward pass or token decode failed. The loop will not step again.
    Failed,
}

/// Outcome of a single [`DecodeLoop::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStep {
    /// A token was accepted; carries its decoded text.
    Token(String),
    Finished(StopReason),
}

/// Result of a completed batch generation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutput {
    /// Generated text, trimmed of surrounding whitespace.
    pub text: String,
    pub stop_reason: StopReason,
    pub tokens_generated: usize,
}

/// Autoregressive decode over a borrowed backend and tokenizer.
///
/// # Example
/// ```
/// use spindle_decode::backend::MockBackend;
/// use spindle_decode::common::GenerationConfig;
/// use spindle_decode::decoder::Decoder;
/// use spindle_decode::tokenizer::{SimpleTokenizer, Tokenizer};
///
/// # fn main() -> anyhow::Result<()> {
/// let backend = MockBackend::new(200, 512, Some(7));
/// let tokenizer = SimpleTokenizer::new();
/// let prompt = tokenizer.encode("once upon a time")?;
///
/// let decoder = Decoder::new(&backend, &tokenizer);
/// let config = GenerationConfig::greedy(16);
/// let text = decoder.generate(&prompt, &config)?;
/// # let _ = text;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy)]
pub struct Decoder<'a> {
    backend: &'a dyn InferenceBackend,
    tokenizer: &'a dyn Tokenizer,
}

impl<'a> Decoder<'a> {
    pub fn new(backend: &'a dyn InferenceBackend, tokenizer: &'a dyn Tokenizer) -> Self {
        Self { backend, tokenizer }
    }

    /// Builds the sampling strategy and sets up a loop ready to step.
    pub fn start(
        &self,
        prompt_ids: &[u32],
        config: &GenerationConfig,
    ) -> GenerationResult<DecodeLoop<'a>> {
        DecodeLoop::new(self.backend, self.tokenizer, prompt_ids, config)
    }

    /// Runs a decode to completion and returns the trimmed text.
    pub fn generate(&self, prompt_ids: &[u32], config: &GenerationConfig) -> GenerationResult<String> {
        Ok(self.decode(prompt_ids, config)?.text)
    }

    /// Like [`generate`](Self::generate) but also reports why decoding stopped.
    pub fn decode(
        &self,
        prompt_ids: &[u32],
        config: &GenerationConfig,
    ) -> GenerationResult<DecodeOutput> {
        let mut decode = self.start(prompt_ids, config)?;
        let stop_reason = decode.run()?;
        Ok(DecodeOutput {
            text: decode.generated_text().trim().to_string(),
            stop_reason,
            tokens_generated: decode.tokens_generated(),
        })
    }

    /// Returns a lazy cursor yielding one untrimmed text fragment per token.
    ///
    /// The first step runs before this returns, so a failing first forward
    /// pass is reported here rather than from the iterator.
    pub fn generate_stream(
        &self,
        prompt_ids: &[u32],
        config: &GenerationConfig,
    ) -> GenerationResult<TokenStream<'a>> {
        TokenStream::new(self.start(prompt_ids, config)?)
    }
}

/// The state machine behind both batch and streaming generation.
///
/// Owns the growing token sequence, the decoded text and the sampler. Each
/// [`step`](Self::step) performs at most one forward pass.
pub struct DecodeLoop<'a> {
    backend: &'a dyn InferenceBackend,
    tokenizer: &'a dyn Tokenizer,
    strategy: SamplingStrategy,
    tokens: Vec<u32>,
    text: String,
    prompt_len: usize,
    max_length: usize,
    max_new_tokens: usize,
    stop_sequence: Option<String>,
    eos_token_id: u32,
    state: DecodeState,
    steps: usize,
    tokens_generated: usize,
    started: Instant,
    sampling_time: Duration,
    backend_time: Duration,
}

impl<'a> DecodeLoop<'a> {
    pub fn new(
        backend: &'a dyn InferenceBackend,
        tokenizer: &'a dyn Tokenizer,
        prompt_ids: &[u32],
        config: &GenerationConfig,
    ) -> GenerationResult<Self> {
        let strategy = select_strategy(config)?;
        debug!("Decoding with strategy {}", strategy.name());

        let prompt_len = prompt_ids.len();
        let requested = prompt_len.saturating_add(config.max_new_tokens);
        let context_limit = backend.max_context_length();
        if context_limit < requested {
            warn!(
                "Requested length {} exceeds backend context ({}), clamping.",
                requested, context_limit
            );
        }

        Ok(Self {
            backend,
            tokenizer,
            strategy,
            tokens: prompt_ids.to_vec(),
            text: String::new(),
            prompt_len,
            max_length: requested.min(context_limit),
            max_new_tokens: config.max_new_tokens,
            stop_sequence: config.stop_sequence.clone().filter(|s| !s.is_empty()),
            eos_token_id: tokenizer.eos_token_id(),
            state: DecodeState::Decoding,
            steps: 0,
            tokens_generated: 0,
            started: Instant::now(),
            sampling_time: Duration::ZERO,
            backend_time: Duration::ZERO,
        })
    }

    /// Advances by one token.
    ///
    /// Once finished, keeps returning the same [`DecodeStep::Finished`]
    /// without touching the backend. After a failure every call errors.
    pub fn step(&mut self) -> GenerationResult<DecodeStep> {
        match self.state {
            DecodeState::Decoding => {}
            DecodeState::Finished(reason) => return Ok(DecodeStep::Finished(reason)),
            DecodeState::Failed => {
                return Err(GenerationError::InferenceFailure {
                    step: self.steps,
                    source: anyhow!("decode already failed"),
                });
            }
        }

        if self.steps >= self.max_new_tokens || self.tokens.len() >= self.max_length {
            info!("Generation reached max length ({})", self.max_length);
            return Ok(self.finish(StopReason::MaxLengthReached));
        }

        let step = self.steps;
        self.steps += 1;

        let attention_mask = vec![1u32; self.tokens.len()];
        let t_backend = Instant::now();
        let logits = match self.backend.forward(&self.tokens, &attention_mask) {
            Ok(logits) => logits,
            Err(source) => return Err(self.fail(step, source)),
        };
        self.backend_time += t_backend.elapsed();

        let vocab_size = self.backend.vocab_size();
        if logits.is_empty() || logits.len() != vocab_size {
            let source = anyhow!(
                "backend returned {} logits for a vocabulary of {}",
                logits.len(),
                vocab_size
            );
            return Err(self.fail(step, source));
        }

        let t_sampling = Instant::now();
        let next_token = self.strategy.sample(&logits) as u32;
        self.sampling_time += t_sampling.elapsed();

        if next_token == self.eos_token_id {
            debug!("Stop token generated: {}", next_token);
            return Ok(self.finish(StopReason::EosReached));
        }

        let fragment = match self.tokenizer.decode_id(next_token) {
            Ok(fragment) => fragment,
            Err(e) => {
                self.state = DecodeState::Failed;
                return Err(GenerationError::Tokenization(e));
            }
        };
        self.text.push_str(&fragment);
        self.tokens_generated += 1;

        let stop_matched = self
            .stop_sequence
            .as_deref()
            .is_some_and(|stop| self.text.contains(stop));
        if stop_matched {
            debug!("Stop sequence matched at step {}", step);
            self.finish(StopReason::StopSequenceMatched);
            return Ok(DecodeStep::Token(fragment));
        }

        self.tokens.push(next_token);
        Ok(DecodeStep::Token(fragment))
    }

    /// Steps until a terminal state is reached.
    pub fn run(&mut self) -> GenerationResult<StopReason> {
        loop {
            if let DecodeStep::Finished(reason) = self.step()? {
                return Ok(reason);
            }
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state != DecodeState::Decoding
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.state {
            DecodeState::Finished(reason) => Some(reason),
            _ => None,
        }
    }

    /// Untrimmed text decoded so far. Still readable after a failure.
    pub fn generated_text(&self) -> &str {
        &self.text
    }

    /// Prompt plus accepted continuation ids.
    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    /// Continuation ids only.
    pub fn generated_ids(&self) -> &[u32] {
        &self.tokens[self.prompt_len.min(self.tokens.len())..]
    }

    /// Number of text fragments produced, including one that completed a stop sequence.
    pub fn tokens_generated(&self) -> usize {
        self.tokens_generated
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn fail(&mut self, step: usize, source: anyhow::Error) -> GenerationError {
        warn!("Decode failed at step {}: {}", step, source);
        self.state = DecodeState::Failed;
        GenerationError::InferenceFailure { step, source }
    }

    fn finish(&mut self, reason: StopReason) -> DecodeStep {
        self.state = DecodeState::Finished(reason);
        debug!("Decode finished: {}", reason);
        self.log_performance();
        DecodeStep::Finished(reason)
    }

    fn log_performance(&self) {
        let total = self.started.elapsed();
        let generated = self.tokens_generated as u32;
        if generated == 0 || total.as_secs_f64() <= 0.0 {
            return;
        }
        let tokens_per_sec = generated as f64 / total.as_secs_f64();

        info!("-------------------- Generation Performance --------------------");
        info!("Total Tokens: {}", generated);
        info!("Total Time:   {:.3}s", total.as_secs_f64());
        info!("Overall T/s:  {:.2}", tokens_per_sec);
        debug!("Avg. Time per Token Breakdown:");
        debug!("  - Total:    {:?}", total / generated);
        debug!("  - Sampling: {:?}", self.sampling_time / generated);
        debug!("  - Backend:  {:?}", self.backend_time / generated);
        info!("----------------------------------------------------------------");
    }
}
