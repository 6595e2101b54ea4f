//! Word-level tokenizer used when a model ships without `tokenizer.json`.
//!
//! Not suitable for real models: every unseen word gets a fresh id.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Tokenizer;

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const EOS_TOKEN: &str = "<eos>";
pub const BOS_TOKEN: &str = "<bos>";

#[derive(Debug, Default)]
struct Vocab {
    encoder: HashMap<String, u32>,
    decoder: HashMap<u32, String>,
}

impl Vocab {
    fn add(&mut self, token: &str) -> u32 {
        if let Some(&id) = self.encoder.get(token) {
            return id;
        }
        let id = self.encoder.len() as u32;
        self.encoder.insert(token.to_string(), id);
        self.decoder.insert(id, token.to_string());
        id
    }
}

#[derive(Debug)]
pub struct SimpleTokenizer {
    vocab: RwLock<Vocab>,
    pad_token_id: u32,
    unk_token_id: u32,
    eos_token_id: u32,
    bos_token_id: u32,
}

impl Default for SimpleTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleTokenizer {
    pub fn new() -> Self {
        let mut vocab = Vocab::default();
        let pad_token_id = vocab.add(PAD_TOKEN);
        let unk_token_id = vocab.add(UNK_TOKEN);
        let eos_token_id = vocab.add(EOS_TOKEN);
        let bos_token_id = vocab.add(BOS_TOKEN);
        Self {
            vocab: RwLock::new(vocab),
            pad_token_id,
            unk_token_id,
            eos_token_id,
            bos_token_id,
        }
    }

    pub fn bos_token_id(&self) -> u32 {
        self.bos_token_id
    }

    pub fn unk_token_id(&self) -> u32 {
        self.unk_token_id
    }

    fn read(&self) -> RwLockReadGuard<'_, Vocab> {
        self.vocab.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vocab> {
        self.vocab.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Tokenizer for SimpleTokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        let lowered = text.to_lowercase();
        let mut vocab = self.write();
        let ids = lowered
            .split_whitespace()
            .map(|word| word.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
            .filter(|word| !word.is_empty())
            .map(|word| vocab.add(&word))
            .collect();
        Ok(ids)
    }

    fn decode_id(&self, id: u32) -> anyhow::Result<String> {
        Ok(self
            .read()
            .decoder
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UNK_TOKEN.to_string()))
    }

    fn decode(&self, ids: &[u32]) -> anyhow::Result<String> {
        let vocab = self.read();
        let words: Vec<&str> = ids
            .iter()
            .map(|id| vocab.decoder.get(id).map(String::as_str).unwrap_or(UNK_TOKEN))
            .collect();
        Ok(words.join(" "))
    }

    fn vocab_size(&self) -> usize {
        self.read().encoder.len()
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    fn pad_token_id(&self) -> Option<u32> {
        Some(self.pad_token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_tokens() {
        let tok = SimpleTokenizer::new();
        assert_eq!(tok.pad_token_id(), Some(0));
        assert_eq!(tok.unk_token_id(), 1);
        assert_eq!(tok.eos_token_id(), 2);
        assert_eq!(tok.bos_token_id(), 3);
        assert_eq!(tok.vocab_size(), 4);
    }

    #[test]
    fn test_encode_assigns_stable_ids() {
        let tok = SimpleTokenizer::new();
        let first = tok.encode("Hello, World! hello").unwrap();
        assert_eq!(first, vec![4, 5, 4]);
        assert_eq!(tok.encode("world").unwrap(), vec![5]);
        assert_eq!(tok.vocab_size(), 6);
    }

    #[test]
    fn test_encode_empty_and_punctuation() {
        let tok = SimpleTokenizer::new();
        assert!(tok.encode("").unwrap().is_empty());
        assert!(tok.encode("   \n\t ").unwrap().is_empty());
        assert!(tok.encode("!!! ??").unwrap().is_empty());
    }

    #[test]
    fn test_decode_roundtrip_and_unknown() {
        let tok = SimpleTokenizer::new();
        let ids = tok.encode("the quick fox").unwrap();
        assert_eq!(tok.decode(&ids).unwrap(), "the quick fox");
        assert_eq!(tok.decode_id(9999).unwrap(), UNK_TOKEN);
        assert_eq!(tok.decode_id(2).unwrap(), EOS_TOKEN);
    }
}
