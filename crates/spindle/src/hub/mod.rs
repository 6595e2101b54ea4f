//! Model resolution and the Hugging Face download cache.

pub mod cache;
pub mod resolver;

pub use cache::{DOWNLOAD_MARKER, HubCache, is_essential_file};
pub use resolver::{ModelResolver, build_config, is_repo_id};
