//! JSON file persistence for block documents.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::block::Block;
use crate::error::{BlockwiseError, Result};

/// Read a block array from `path`. Entries are deserialized leniently; the
/// store's `initialize` finishes the cleanup.
pub fn load_blocks(path: &Path) -> Result<Vec<Block>> {
    let content = fs::read_to_string(path).map_err(|source| BlockwiseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        debug!(path = %path.display(), "empty document file");
        return Ok(Vec::new());
    }
    let blocks: Vec<Block> = serde_json::from_str(&content)?;
    info!(path = %path.display(), count = blocks.len(), "loaded blocks");
    Ok(blocks)
}

/// Write `blocks` to `path` as pretty JSON, replacing the file atomically.
pub fn save_blocks(path: &Path, blocks: &[Block]) -> Result<()> {
    let json = serde_json::to_string_pretty(blocks)?;
    let tmp = temp_path(path);
    let io_error = |source| BlockwiseError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, json).map_err(io_error)?;
    fs::rename(&tmp, path).map_err(io_error)?;
    info!(path = %path.display(), count = blocks.len(), "saved blocks");
    Ok(())
}

/// Sibling of `path` with `.tmp` appended to the full file name.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
