//! spindle: text generation over a pluggable next-token backend.
//!
//! This crate wraps the decoding core in [`spindle_decode`] with model
//! loading, generation-config resolution, and a Hugging Face model cache.
//!
//! ```
//! use spindle::{Engine, GenerationConfig};
//!
//! # fn main() -> spindle::SpindleResult<()> {
//! let engine = Engine::mock_seeded(500, 256, 7);
//! for fragment in engine.generate_stream("tell me a story", &GenerationConfig::greedy(8))? {
//!     print!("{}", fragment?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod engine;
pub mod generation;
pub mod hub;
pub mod model;

pub use common::{SpindleError, SpindleResult};
pub use engine::{Engine, ModelInfo};
pub use generation::{GenerationOverrides, resolve_generation_config};
pub use hub::{HubCache, ModelResolver};
pub use model::{ModelConfig, ModelFormat};

// Re-export the decoding core
pub use spindle_decode::{
    DecodeOutput, GenerationConfig, GenerationError, InferenceBackend, MockBackend,
    SamplingStrategy, StopReason, TokenStream, Tokenizer,
};
