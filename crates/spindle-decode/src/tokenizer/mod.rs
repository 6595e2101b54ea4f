//! Tokenizers used at the edges of a generation call.
//!
//! The decode loop only needs [`Tokenizer::decode_id`] and
//! [`Tokenizer::eos_token_id`]; the rest is used by callers to turn prompts
//! into ids before decoding starts.

pub mod hf;
pub mod simple;

pub use hf::HfTokenizer;
pub use simple::SimpleTokenizer;

pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>>;

    /// Decodes a single token id. Used once per generated token.
    fn decode_id(&self, id: u32) -> anyhow::Result<String>;

    fn decode(&self, ids: &[u32]) -> anyhow::Result<String>;

    fn vocab_size(&self) -> usize;

    fn eos_token_id(&self) -> u32;

    fn pad_token_id(&self) -> Option<u32>;
}

