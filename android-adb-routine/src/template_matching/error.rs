use std::path::PathBuf;
use thiserror::Error;

/// Why a template could not be resolved. Always a precondition failure:
/// the matcher gives up on the call without capturing.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {name} ({path:?})")]
    NotFound { name: String, path: PathBuf },

    #[error("Template not found: {name}")]
    Unknown { name: String },

    #[error("Failed to decode template {name}: {source}")]
    Decode {
        name: String,
        source: image::ImageError,
    },

    #[error("Template {name} has no pixels")]
    Empty { name: String },
}
