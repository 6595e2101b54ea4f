use std::fmt;

use serde::Serialize;

use crate::model::ModelFormat;

/// Summary of the model an [`Engine`](super::Engine) has loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub format: ModelFormat,
    pub vocab_size: usize,
    pub context_length: usize,
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, vocab {}, context {})",
            self.name, self.format, self.vocab_size, self.context_length
        )
    }
}
