//! Decoding core for spindle: sampling strategies, the autoregressive decode
//! loop and its streaming cursor.
//!
//! The forward pass and tokenization are consumed through the
//! [`InferenceBackend`] and [`Tokenizer`] traits; everything else here is
//! plain, synchronous Rust.

pub mod backend;
pub mod common;
pub mod decoder;
pub mod tokenizer;

pub use crate::{
    backend::{InferenceBackend, MockBackend},
    common::{
        GenerationConfig, GenerationConfigBuilder, GenerationError, GenerationResult,
        SamplingStrategy, StopReason, select_strategy,
    },
    decoder::{DecodeLoop, DecodeOutput, DecodeState, DecodeStep, Decoder, TokenStream},
    tokenizer::{HfTokenizer, SimpleTokenizer, Tokenizer},
};
