//! Storage module for persisting downloaded pages
//!
//! Every fetched URL becomes one artifact file. Artifacts are grouped by
//! story:
//!
//! ```text
//! <download_dir>/
//!   <story_id>/
//!     <sha256 of url>.<ext>
//! ```

mod artifacts;

pub use artifacts::{artifact_name, extension_for, ArtifactStore};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting artifacts
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact name: {0:?}")]
    InvalidName(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
