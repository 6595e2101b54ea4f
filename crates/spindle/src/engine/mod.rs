//! Text-level generation over a loaded model.

mod model;
mod types;

pub use model::Engine;
pub use types::ModelInfo;
