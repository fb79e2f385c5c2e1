//! Aegis storage layer
//!
//! Two stores, both rooted in a data directory:
//!
//! ```text
//! <data_dir>/
//! ├── sessions.json            SessionStore: sessions + ordered messages
//! └── corpora/
//!     └── <session-id>/
//!         ├── reference.json   CorpusStore: one index per (session, role)
//!         └── subject.json
//! ```
//!
//! ## Corpus lifecycle
//!
//! - **create**: index a document's chunks for a session role; same content twice is a no-op
//! - **attach**: load a persisted index; attaching twice returns the same handle
//! - **destroy**: drop every index of a session, in memory and on disk
//!
//! Handles carry a generation. Replacing or destroying an index invalidates
//! every handle issued for it, and searches through such a handle fail with
//! [`StorageError::CorpusDetached`] instead of returning stale chunks.

pub mod corpus;
pub mod index;
pub mod sessions;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

pub use corpus::{CorpusHandle, CorpusInfo, CorpusRole, CorpusStore, ScoredChunk};
pub use index::CorpusIndex;
pub use sessions::{
    MessageRole, SessionId, SessionStore, SessionSummary, StoredMessage, MAX_TITLE_CHARS,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("corpus handle for {role} of session {session} is no longer attached")]
    CorpusDetached { session: SessionId, role: CorpusRole },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes).map_err(|e| StorageError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

/// Read and deserialize a JSON file, `None` when it does not exist.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, StorageError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}
