//! Local cache of models downloaded from the Hugging Face Hub.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::common::{SpindleError, SpindleResult, default_cache_dir, hf_token_from_env};

use super::resolver::is_repo_id;

const HF_ENDPOINT: &str = "https://huggingface.co";

const PROGRESS_STEP_PERCENT: u64 = 10;

/// Written into a model directory once every essential file was fetched.
pub const DOWNLOAD_MARKER: &str = ".spindle_downloaded";

const WEIGHT_EXTENSIONS: &[&str] = &[".onnx", ".bin", ".safetensors", ".pt", ".pth"];
const CONFIG_FILES: &[&str] = &[
    "config.json",
    "generation_config.json",
    "model_index.json",
    "vocab.json",
    "merges.txt",
    "special_tokens_map.json",
];

#[derive(Debug, Deserialize)]
struct RepoListing {
    #[serde(default)]
    siblings: Vec<RepoFile>,
}

#[derive(Debug, Deserialize)]
struct RepoFile {
    rfilename: String,
}

/// Whether a repository file is needed to run the model locally.
pub fn is_essential_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    let file_name = lower.rsplit('/').next().unwrap_or(&lower);

    WEIGHT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || lower.contains("tokenizer")
        || CONFIG_FILES.contains(&file_name)
}

/// Model cache rooted at one directory, one sub-directory per repository.
#[derive(Debug, Clone)]
pub struct HubCache {
    root: PathBuf,
    auth_token: Option<String>,
    endpoint: String,
}

impl HubCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            auth_token: None,
            endpoint: HF_ENDPOINT.to_string(),
        }
    }

    /// Cache at the default location, authenticated from `HF_TOKEN` if set.
    pub fn from_env() -> SpindleResult<Self> {
        Ok(Self::new(default_cache_dir()?).with_auth_token(hf_token_from_env()))
    }

    /// Bearer token for private or gated repositories.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Points downloads at a hub mirror instead of huggingface.co.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a repository is (or would be) cached in. `org/repo` maps to `org--repo`.
    pub fn model_dir(&self, repo_id: &str) -> PathBuf {
        self.root.join(repo_id.replace('/', "--"))
    }

    pub fn is_cached(&self, repo_id: &str) -> bool {
        self.model_dir(repo_id).join(DOWNLOAD_MARKER).is_file()
    }

    /// Repository ids of every completely downloaded model, sorted.
    pub fn list_cached(&self) -> SpindleResult<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut models = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() && path.join(DOWNLOAD_MARKER).is_file() {
                if let Some(name) = path.file_name() {
                    models.push(name.to_string_lossy().replace("--", "/"));
                }
            }
        }
        models.sort();
        Ok(models)
    }

    /// Removes a cached model. Returns `false` if there was nothing to remove.
    pub fn delete(&self, repo_id: &str) -> SpindleResult<bool> {
        let dir = self.model_dir(repo_id);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)?;
        info!("Deleted cached model: {}", dir.display());
        Ok(true)
    }

    /// Returns the local directory for `repo_id`, downloading it first when it
    /// is not cached or `force_download` is set.
    pub async fn get_model(&self, repo_id: &str, force_download: bool) -> SpindleResult<PathBuf> {
        if !is_repo_id(repo_id) {
            return Err(SpindleError::InvalidConfig(format!(
                "invalid repository id '{}', expected 'org/repo'",
                repo_id
            )));
        }

        let model_dir = self.model_dir(repo_id);
        if !force_download && self.is_cached(repo_id) {
            info!("Model '{}' found in cache: {}", repo_id, model_dir.display());
            return Ok(model_dir);
        }

        info!("Downloading model '{}' from {}...", repo_id, self.endpoint);
        self.download(repo_id, &model_dir)
            .await
            .map_err(|e| SpindleError::DownloadFailed {
                model: repo_id.to_string(),
                source: e,
            })?;
        Ok(model_dir)
    }

    async fn download(&self, repo_id: &str, model_dir: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(model_dir).await?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("spindle/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let files: Vec<String> = self
            .list_repo_files(&client, repo_id)
            .await?
            .into_iter()
            .filter(|f| is_essential_file(f))
            .collect();
        if files.is_empty() {
            return Err(anyhow!("no model files found in repository {}", repo_id));
        }
        info!("Found {} files to download", files.len());

        let mut downloaded = 0;
        for file in &files {
            match self.download_file(&client, repo_id, file, model_dir).await {
                Ok(()) => {
                    downloaded += 1;
                    info!("Downloaded ({}/{}) {}", downloaded, files.len(), file);
                }
                Err(e) => warn!("Failed to download {}: {}", file, e),
            }
        }
        if downloaded == 0 {
            return Err(anyhow!("failed to download any files from {}", repo_id));
        }

        tokio::fs::write(model_dir.join(DOWNLOAD_MARKER), format!("{}\n", repo_id)).await?;
        info!("Model downloaded successfully to: {}", model_dir.display());
        Ok(())
    }

    async fn list_repo_files(
        &self,
        client: &reqwest::Client,
        repo_id: &str,
    ) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/api/models/{}", self.endpoint, repo_id);
        let response = self.authorized(client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "failed to get model info for {}: HTTP {}",
                repo_id,
                response.status()
            ));
        }
        let body = response.text().await?;
        let listing: RepoListing = serde_json::from_str(&body)?;
        Ok(listing.siblings.into_iter().map(|f| f.rfilename).collect())
    }

    async fn download_file(
        &self,
        client: &reqwest::Client,
        repo_id: &str,
        filename: &str,
        model_dir: &Path,
    ) -> anyhow::Result<()> {
        let local_path = model_dir.join(filename);
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let url = format!("{}/{}/resolve/main/{}", self.endpoint, repo_id, filename);
        debug!("GET {}", url);
        let mut response = self.authorized(client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {}", response.status()));
        }

        // Written under a temporary name so an interrupted transfer never looks complete.
        let partial_path = model_dir.join(format!("{}.part", filename));
        let total = response.content_length().filter(|&len| len > 0);
        let mut file = tokio::fs::File::create(&partial_path).await?;
        let mut written: u64 = 0;
        let mut last_percent = 0;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if let Some(total) = total {
                let percent = written * 100 / total;
                if percent >= last_percent + PROGRESS_STEP_PERCENT {
                    last_percent = percent;
                    debug!("{}: {}% ({}/{} bytes)", filename, percent, written, total);
                }
            }
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial_path, &local_path).await?;
        debug!("{}: {} bytes", filename, written);
        Ok(())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}
