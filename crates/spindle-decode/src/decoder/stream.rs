//! Pull-based streaming over a [`DecodeLoop`].

use std::iter::FusedIterator;

use crate::common::{GenerationResult, StopReason};
use crate::decoder::generator::{DecodeLoop, DecodeStep};

/// Lazily yields one decoded fragment per generated token.
///
/// The cursor stays one step ahead of its consumer: each pull hands back the
/// fragment computed earlier and immediately computes the next. Dropping it
/// early stops generation.
///
/// A failing step is *not* reported by the pull that ran it. That pull still
/// returns the fragment it already held, and the error comes on the next pull,
/// after which the cursor is exhausted. Every fragment produced before the
/// failure therefore reaches the caller. Only a failure while priming is
/// reported immediately, by [`TokenStream::new`].
///
/// ```
/// use spindle_decode::backend::MockBackend;
/// use spindle_decode::common::GenerationConfig;
/// use spindle_decode::decoder::Decoder;
/// use spindle_decode::tokenizer::SimpleTokenizer;
///
/// # fn main() -> anyhow::Result<()> {
/// let backend = MockBackend::new(64, 128, Some(1));
/// let tokenizer = SimpleTokenizer::new();
/// let decoder = Decoder::new(&backend, &tokenizer);
///
/// for fragment in decoder.generate_stream(&[4, 5], &GenerationConfig::greedy(8))? {
///     print!("{} ", fragment?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TokenStream<'a> {
    decode: DecodeLoop<'a>,
    pending: Option<GenerationResult<String>>,
}

impl<'a> TokenStream<'a> {
    /// Primes the cursor by running the first step.
    pub fn new(decode: DecodeLoop<'a>) -> GenerationResult<Self> {
        let mut stream = Self {
            decode,
            pending: None,
        };
        stream.pending = stream.advance()?.map(Ok);
        Ok(stream)
    }

    /// Set once the underlying loop has terminated normally.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.decode.stop_reason()
    }

    /// Text produced so far, including a fragment not yet pulled.
    pub fn generated_text(&self) -> &str {
        self.decode.generated_text()
    }

    fn advance(&mut self) -> GenerationResult<Option<String>> {
        match self.decode.step()? {
            DecodeStep::Token(fragment) => Ok(Some(fragment)),
            DecodeStep::Finished(_) => Ok(None),
        }
    }
}

impl Iterator for TokenStream<'_> {
    type Item = GenerationResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.pending.take()?;
        if current.is_ok() {
            self.pending = self.advance().transpose();
        }
        Some(current)
    }
}

impl FusedIterator for TokenStream<'_> {}
