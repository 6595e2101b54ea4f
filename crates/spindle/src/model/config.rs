use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Context length assumed when a model does not declare one.
pub const DEFAULT_CONTEXT_LENGTH: usize = 2048;

/// On-disk weights format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    #[default]
    Onnx,
    SafeTensors,
    PyTorch,
}

impl ModelFormat {
    /// Detects the format from a file extension. Unknown extensions map to ONNX.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".safetensors") {
            Self::SafeTensors
        } else if name.ends_with(".pt") || name.ends_with(".pth") || name.ends_with(".bin") {
            Self::PyTorch
        } else {
            Self::Onnx
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onnx => "onnx",
            Self::SafeTensors => "safetensors",
            Self::PyTorch => "pytorch",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a model's files live and how to interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Weights file, or the model directory when no weights file was found.
    pub model_path: Option<PathBuf>,
    /// `tokenizer.json`, or a directory expected to contain one.
    pub tokenizer_path: Option<PathBuf>,
    pub format: ModelFormat,
    pub context_length: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            tokenizer_path: None,
            format: ModelFormat::default(),
            context_length: DEFAULT_CONTEXT_LENGTH,
        }
    }
}

impl ModelConfig {
    pub fn builder() -> ModelConfigBuilder {
        ModelConfigBuilder::default()
    }

    /// Directory holding the model's side files (`config.json`, `generation_config.json`).
    pub fn model_dir(&self) -> Option<&Path> {
        let path = self.model_path.as_deref()?;
        if path.is_dir() { Some(path) } else { path.parent() }
    }

    /// Display name: the weights file name, or `"mock"` when there is none.
    pub fn name(&self) -> String {
        self.model_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mock".to_string())
    }
}

/// Builder for [`ModelConfig`].
#[derive(Debug, Clone, Default)]
pub struct ModelConfigBuilder {
    config: ModelConfig,
}

impl ModelConfigBuilder {
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    pub fn tokenizer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tokenizer_path = Some(path.into());
        self
    }

    pub fn format(mut self, format: ModelFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn context_length(mut self, context_length: usize) -> Self {
        self.config.context_length = context_length;
        self
    }

    pub fn build(self) -> ModelConfig {
        self.config
    }
}
