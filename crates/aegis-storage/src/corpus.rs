//! Session-scoped corpus indices.

use crate::index::{content_digest, CorpusIndex, PersistedIndex};
use crate::{read_json, write_atomic, SessionId, StorageError};
use aegis_ingest::Chunk;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Which side of the comparison a corpus holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusRole {
    /// The governing text (law, regulation, standard)
    Reference,
    /// The text audited against it (internal policy, contract)
    Subject,
}

impl CorpusRole {
    pub const ALL: [CorpusRole; 2] = [CorpusRole::Reference, CorpusRole::Subject];

    pub fn as_str(self) -> &'static str {
        match self {
            CorpusRole::Reference => "reference",
            CorpusRole::Subject => "subject",
        }
    }
}

impl fmt::Display for CorpusRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque token for one attached corpus.
///
/// Valid only while the index it was issued for is still attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorpusHandle {
    session: SessionId,
    role: CorpusRole,
    generation: u64,
}

impl CorpusHandle {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn role(&self) -> CorpusRole {
        self.role
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusInfo {
    pub document_name: String,
    pub chunk_count: usize,
}

/// A search hit with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub score: f32,
    pub document_name: String,
    pub chunk: Chunk,
}

struct Slot {
    generation: u64,
    index: Arc<CorpusIndex>,
}

/// Owns every corpus index, keyed by `(session, role)`.
pub struct CorpusStore {
    root: PathBuf,
    slots: RwLock<HashMap<(SessionId, CorpusRole), Slot>>,
    next_generation: AtomicU64,
}

impl CorpusStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            slots: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session: SessionId) -> PathBuf {
        self.root.join(session.to_string())
    }

    fn index_path(&self, session: SessionId, role: CorpusRole) -> PathBuf {
        self.session_dir(session).join(format!("{}.json", role.as_str()))
    }

    fn handle(session: SessionId, role: CorpusRole, slot: &Slot) -> CorpusHandle {
        CorpusHandle {
            session,
            role,
            generation: slot.generation,
        }
    }

    fn slot(&self, index: CorpusIndex) -> Slot {
        Slot {
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            index: Arc::new(index),
        }
    }

    /// Index `chunks` as the `role` corpus of `session`.
    ///
    /// Same document (name and content) as the attached index: returns the
    /// existing handle. Anything else replaces it, invalidating earlier handles.
    pub fn create(
        &self,
        session: SessionId,
        role: CorpusRole,
        document_name: &str,
        chunks: Vec<Chunk>,
    ) -> Result<CorpusHandle, StorageError> {
        let digest = content_digest(&chunks);
        let key = (session, role);
        let unchanged = |slot: &Slot| {
            slot.index.digest() == digest && slot.index.document_name() == document_name
        };

        if let Some(slot) = self.slots.read().get(&key).filter(|slot| unchanged(slot)) {
            tracing::debug!(session = %session, %role, "corpus already attached");
            return Ok(Self::handle(session, role, slot));
        }

        // Held across the write so concurrent creates cannot interleave.
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get(&key).filter(|slot| unchanged(slot)) {
            return Ok(Self::handle(session, role, slot));
        }

        let index = CorpusIndex::build(document_name, chunks);
        let path = self.index_path(session, role);
        let bytes = serde_json::to_vec(&index.to_persisted()).map_err(|source| {
            StorageError::Corrupt {
                path: path.clone(),
                source,
            }
        })?;
        write_atomic(&path, &bytes)?;

        tracing::info!(
            session = %session,
            %role,
            document = document_name,
            chunks = index.len(),
            "indexed corpus"
        );
        let slot = self.slot(index);
        let handle = Self::handle(session, role, &slot);
        slots.insert(key, slot);
        Ok(handle)
    }

    /// Load the persisted `role` corpus of `session`, if any.
    ///
    /// Every caller gets the same handle until the corpus is replaced or
    /// destroyed, however many attach at once.
    pub fn attach(
        &self,
        session: SessionId,
        role: CorpusRole,
    ) -> Result<Option<CorpusHandle>, StorageError> {
        if let Some(slot) = self.slots.read().get(&(session, role)) {
            return Ok(Some(Self::handle(session, role, slot)));
        }

        let mut slots = self.slots.write();
        match slots.entry((session, role)) {
            Entry::Occupied(entry) => Ok(Some(Self::handle(session, role, entry.get()))),
            Entry::Vacant(entry) => {
                let path = self.index_path(session, role);
                let Some(persisted) = read_json::<PersistedIndex>(&path)? else {
                    return Ok(None);
                };
                let index = CorpusIndex::from_persisted(persisted);
                tracing::debug!(session = %session, %role, chunks = index.len(), "attached corpus");
                let slot = entry.insert(self.slot(index));
                Ok(Some(Self::handle(session, role, slot)))
            }
        }
    }

    /// Drop every corpus of `session` and delete its directory.
    ///
    /// Returns how many in-memory indices were detached.
    pub fn destroy(&self, session: SessionId) -> Result<usize, StorageError> {
        let detached = {
            let mut slots = self.slots.write();
            let before = slots.len();
            slots.retain(|(s, _), _| *s != session);
            before - slots.len()
        };

        let dir = self.session_dir(session);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(&dir, e)),
        }

        tracing::info!(session = %session, detached, "destroyed corpora");
        Ok(detached)
    }

    fn resolve(&self, handle: &CorpusHandle) -> Result<Arc<CorpusIndex>, StorageError> {
        self.slots
            .read()
            .get(&(handle.session, handle.role))
            .filter(|slot| slot.generation == handle.generation)
            .map(|slot| Arc::clone(&slot.index))
            .ok_or(StorageError::CorpusDetached {
                session: handle.session,
                role: handle.role,
            })
    }

    pub fn is_attached(&self, handle: &CorpusHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    pub fn info(&self, handle: &CorpusHandle) -> Option<CorpusInfo> {
        self.resolve(handle).ok().map(|index| CorpusInfo {
            document_name: index.document_name().to_string(),
            chunk_count: index.len(),
        })
    }

    /// Top `k` chunks for `query`; fails closed on a stale handle.
    pub fn search(
        &self,
        handle: &CorpusHandle,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StorageError> {
        let index = self.resolve(handle)?;
        Ok(index
            .search(query, k)
            .into_iter()
            .map(|(score, chunk)| ScoredChunk {
                score,
                document_name: index.document_name().to_string(),
                chunk: chunk.clone(),
            })
            .collect())
    }
}
