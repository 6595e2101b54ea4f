//! The autoregressive decode loop and its streaming cursor.

pub mod generator;
pub mod stream;

pub use generator::{DecodeLoop, DecodeOutput, DecodeState, DecodeStep, Decoder};
pub use stream::TokenStream;
