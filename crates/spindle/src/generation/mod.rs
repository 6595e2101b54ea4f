//! Generation configuration and resolution.
//!
//! This module handles the merging of generation parameters from
//! multiple sources: model defaults, user preferences, and runtime overrides.

pub mod overrides;

mod resolution;

pub use overrides::GenerationOverrides;
pub use resolution::{GENERATION_CONFIG_FILE, load_model_defaults, resolve_generation_config};
