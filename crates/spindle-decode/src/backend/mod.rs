//! The forward-pass contract consumed by the decode loop.
//!
//! A backend is an opaque next-token predictor: given the full token sequence
//! and its attention mask it returns one logit per vocabulary entry. The loop
//! never looks inside it and never retries a failed call.

pub mod mock;

pub use mock::MockBackend;

use ndarray::Array1;

pub trait InferenceBackend: Send + Sync {
    /// Runs one forward pass and returns next-token logits of length `vocab_size()`.
    ///
    /// `attention_mask` has the same length as `token_ids`. Implementations
    /// must return an error rather than malformed logits.
    fn forward(&self, token_ids: &[u32], attention_mask: &[u32]) -> anyhow::Result<Array1<f32>>;

    fn vocab_size(&self) -> usize;

    fn max_context_length(&self) -> usize;
}
