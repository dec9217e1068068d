use std::path::PathBuf;

use thiserror::Error;

/// Errors at the persistence boundary. Editing operations themselves never
/// fail; they degrade to no-ops.
#[derive(Error, Debug)]
pub enum BlockwiseError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid block document: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BlockwiseError>;
