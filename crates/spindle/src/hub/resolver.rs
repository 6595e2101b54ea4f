//! Resolves a model identifier to a [`ModelConfig`] with local paths.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::common::{SpindleError, SpindleResult};
use crate::model::{DEFAULT_CONTEXT_LENGTH, ModelConfig, ModelFormat};

use super::cache::HubCache;

/// Weight file patterns in priority order.
const MODEL_EXTENSIONS: &[&str] = &["onnx", "safetensors", "bin", "pt", "pth"];

/// `config.json` keys that may carry the context window, in lookup order.
const CONTEXT_LENGTH_KEYS: &[&str] = &["max_position_embeddings", "n_positions", "max_seq_len"];

/// Whether `id` looks like a Hugging Face repository id (`org/repo`).
pub fn is_repo_id(id: &str) -> bool {
    !id.is_empty()
        && id.matches('/').count() == 1
        && !id.starts_with('/')
        && !id.starts_with('.')
        && !id.contains('\\')
        && !id.contains("//")
}

/// Maps local paths and Hugging Face repo ids to loadable model configs.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    cache: HubCache,
}

impl ModelResolver {
    pub fn new(cache: HubCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &HubCache {
        &self.cache
    }

    /// Resolves `model_id`, downloading a repository that is not yet cached.
    ///
    /// An existing local path always wins over a repo id of the same spelling.
    pub async fn resolve(&self, model_id: &str, force_download: bool) -> SpindleResult<ModelConfig> {
        let local = Path::new(model_id);
        let model_path = if local.exists() {
            info!("Using local model: {}", local.display());
            local.to_path_buf()
        } else if is_repo_id(model_id) {
            info!("Resolving Hugging Face model: {}", model_id);
            self.cache.get_model(model_id, force_download).await?
        } else {
            return Err(SpindleError::ModelNotFound(model_id.to_string()));
        };

        build_config(&model_path)
    }

    /// Whether `model_id` can be resolved without a download.
    pub fn is_available(&self, model_id: &str) -> bool {
        Path::new(model_id).exists() || (is_repo_id(model_id) && self.cache.is_cached(model_id))
    }
}

/// Builds a [`ModelConfig`] from a model directory or a single weights file.
pub fn build_config(path: &Path) -> SpindleResult<ModelConfig> {
    let mut builder = ModelConfig::builder();

    if path.is_dir() {
        match find_model_file(path)? {
            Some(model_file) => {
                builder = builder
                    .format(ModelFormat::from_path(&model_file))
                    .model_path(model_file);
            }
            None => builder = builder.model_path(path),
        }

        let tokenizer_json = path.join("tokenizer.json");
        builder = if tokenizer_json.is_file() {
            builder.tokenizer_path(tokenizer_json)
        } else {
            builder.tokenizer_path(path)
        };

        builder = builder.context_length(read_context_length(path));
    } else {
        builder = builder
            .format(ModelFormat::from_path(path))
            .model_path(path);
        if let Some(parent) = path.parent() {
            builder = builder
                .tokenizer_path(parent)
                .context_length(read_context_length(parent));
        }
    }

    Ok(builder.build())
}

/// First weights file by extension priority, skipping tokenizer and optimizer state.
fn find_model_file(dir: &Path) -> SpindleResult<Option<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    for ext in MODEL_EXTENSIONS {
        let found = files.iter().find(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let matches_ext = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            matches_ext && !name.contains("tokenizer") && !name.contains("optimizer")
        });
        if let Some(path) = found {
            return Ok(Some(path.clone()));
        }
    }
    Ok(None)
}

/// Reads the context window from `config.json`, defaulting to 2048.
fn read_context_length(model_dir: &Path) -> usize {
    let config_path = model_dir.join("config.json");
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return DEFAULT_CONTEXT_LENGTH;
    };
    let json: serde_json::Value = match serde_json::from_str(&content) {
        Ok(json) => json,
        Err(e) => {
            debug!("Could not parse {}: {}", config_path.display(), e);
            return DEFAULT_CONTEXT_LENGTH;
        }
    };

    CONTEXT_LENGTH_KEYS
        .iter()
        .find_map(|key| json.get(key).and_then(|v| v.as_u64()))
        .and_then(|v| usize::try_from(v).ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_CONTEXT_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_detection() {
        assert!(is_repo_id("openai-community/gpt2"));
        assert!(is_repo_id("org/model-name"));
        assert!(!is_repo_id(""));
        assert!(!is_repo_id("gpt2"));
        assert!(!is_repo_id("/abs/path"));
        assert!(!is_repo_id("./model"));
        assert!(!is_repo_id(".hidden/model"));
        assert!(!is_repo_id("a/b/c"));
        assert!(!is_repo_id("a\\b"));
        assert!(!is_repo_id("org//"));
    }

    #[test]
    fn test_build_config_prefers_onnx() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["pytorch_model.bin", "model.safetensors", "model.onnx", "tokenizer.json"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let config = build_config(dir.path()).unwrap();

        assert_eq!(config.model_path, Some(dir.path().join("model.onnx")));
        assert_eq!(config.format, ModelFormat::Onnx);
        assert_eq!(config.tokenizer_path, Some(dir.path().join("tokenizer.json")));
        assert_eq!(config.context_length, 2048);
    }

    #[test]
    fn test_build_config_skips_optimizer_state() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("optimizer.pt"), b"x").unwrap();
        std::fs::write(dir.path().join("weights.pth"), b"x").unwrap();

        let config = build_config(dir.path()).unwrap();

        assert_eq!(config.model_path, Some(dir.path().join("weights.pth")));
        assert_eq!(config.format, ModelFormat::PyTorch);
        assert_eq!(config.tokenizer_path, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_build_config_without_weights() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_config(dir.path()).unwrap();
        assert_eq!(config.model_path, Some(dir.path().to_path_buf()));
        assert_eq!(config.format, ModelFormat::Onnx);
    }

    #[test]
    fn test_context_length_from_config_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"model_type": "gpt2", "n_positions": 1024, "n_embd": 768}"#,
        )
        .unwrap();
        assert_eq!(read_context_length(dir.path()), 1024);

        std::fs::write(
            dir.path().join("config.json"),
            r#"{"max_position_embeddings": 4096, "n_positions": 1024}"#,
        )
        .unwrap();
        assert_eq!(read_context_length(dir.path()), 4096);

        std::fs::write(dir.path().join("config.json"), "not json").unwrap();
        assert_eq!(read_context_length(dir.path()), 2048);
    }

    #[test]
    fn test_build_config_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.safetensors");
        std::fs::write(&file, b"x").unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"max_seq_len": 512}"#).unwrap();

        let config = build_config(&file).unwrap();

        assert_eq!(config.model_path, Some(file));
        assert_eq!(config.format, ModelFormat::SafeTensors);
        assert_eq!(config.tokenizer_path, Some(dir.path().to_path_buf()));
        assert_eq!(config.context_length, 512);
    }

    #[tokio::test]
    async fn test_resolve_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"x").unwrap();
        let resolver = ModelResolver::new(HubCache::new(dir.path().join("cache")));

        let config = resolver
            .resolve(dir.path().to_str().unwrap(), false)
            .await
            .unwrap();

        assert_eq!(config.model_path, Some(dir.path().join("model.onnx")));
        assert!(resolver.is_available(dir.path().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_resolve_cached_repo() {
        let root = tempfile::tempdir().unwrap();
        let cache = HubCache::new(root.path());
        let model_dir = cache.model_dir("org/tiny");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join(super::super::cache::DOWNLOAD_MARKER), "org/tiny").unwrap();
        std::fs::write(model_dir.join("model.onnx"), b"x").unwrap();
        let resolver = ModelResolver::new(cache);

        assert!(resolver.is_available("org/tiny"));
        let config = resolver.resolve("org/tiny", false).await.unwrap();
        assert_eq!(config.model_path, Some(model_dir.join("model.onnx")));
    }

    #[tokio::test]
    async fn test_resolve_unknown() {
        let root = tempfile::tempdir().unwrap();
        let resolver = ModelResolver::new(HubCache::new(root.path()));
        let err = resolver.resolve("no-such-model", false).await.unwrap_err();
        assert!(matches!(err, SpindleError::ModelNotFound(_)));
        assert!(!resolver.is_available("no-such-model"));
    }
}
