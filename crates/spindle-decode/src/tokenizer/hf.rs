//! Adapter over a Hugging Face `tokenizer.json`.

use std::path::Path;

use anyhow::{Result, anyhow};
use log::warn;

use super::Tokenizer;

/// Special tokens tried, in order, when looking for the end-of-sequence id.
const EOS_CANDIDATES: &[&str] = &["</s>", "<|endoftext|>", "<eos>", "<|end_of_text|>", "[EOS]"];

const DEFAULT_EOS_TOKEN_ID: u32 = 2;

pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    eos_token_id: u32,
}

impl HfTokenizer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {}", path.display(), e))?;
        Ok(Self::from_tokenizer(inner))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_bytes(bytes).map_err(|e| anyhow!(e))?;
        Ok(Self::from_tokenizer(inner))
    }

    pub fn from_tokenizer(inner: tokenizers::Tokenizer) -> Self {
        let eos_token_id = EOS_CANDIDATES
            .iter()
            .find_map(|token| inner.token_to_id(token))
            .unwrap_or_else(|| {
                warn!(
                    "No known EOS token in tokenizer vocabulary, defaulting to id {}",
                    DEFAULT_EOS_TOKEN_ID
                );
                DEFAULT_EOS_TOKEN_ID
            });
        Self {
            inner,
            eos_token_id,
        }
    }

    /// Overrides the detected end-of-sequence id, e.g. from a model's `config.json`.
    pub fn with_eos_token_id(mut self, eos_token_id: u32) -> Self {
        self.eos_token_id = eos_token_id;
        self
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self.inner.encode(text, true).map_err(|e| anyhow!(e))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode_id(&self, id: u32) -> Result<String> {
        self.inner.decode(&[id], true).map_err(|e| anyhow!(e))
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner.decode(ids, true).map_err(|e| anyhow!(e))
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    fn pad_token_id(&self) -> Option<u32> {
        self.inner.get_padding().map(|p| p.pad_id)
    }
}
