//! Conversation sessions and their message history.

use crate::{read_json, write_atomic, StorageError};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Opaque session identifier
pub type SessionId = Uuid;

/// Session titles are cut to this many characters.
pub const MAX_TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    id: SessionId,
    title: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(r: &SessionRecord) -> Self {
        Self {
            id: r.id,
            title: r.title.clone(),
            created_at: r.created_at,
            message_count: r.messages.len(),
        }
    }
}

/// JSON-file backed session store.
///
/// The whole file is rewritten after every mutation; an in-memory store
/// (no path) is used by tests and one-shot runs.
pub struct SessionStore {
    path: Option<PathBuf>,
    sessions: RwLock<Vec<SessionRecord>>,
}

impl SessionStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let sessions: Vec<SessionRecord> = read_json(&path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), sessions = sessions.len(), "opened session store");
        Ok(Self {
            path: Some(path),
            sessions: RwLock::new(sessions),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            sessions: RwLock::new(Vec::new()),
        }
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub fn create_session(&self, title: &str) -> Result<SessionId, StorageError> {
        let record = SessionRecord {
            id: Uuid::new_v4(),
            title: truncate_title(title),
            created_at: Utc::now(),
            messages: Vec::new(),
        };
        let id = record.id;
        self.mutate(|sessions| {
            sessions.push(record);
            Ok(())
        })?;

        tracing::info!(session = %id, "created session");
        Ok(id)
    }

    pub fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        self.mutate(|sessions| {
            let before = sessions.len();
            sessions.retain(|s| s.id != id);
            if sessions.len() == before {
                return Err(StorageError::SessionNotFound(id));
            }
            Ok(())
        })?;

        tracing::info!(session = %id, "deleted session");
        Ok(())
    }

    pub fn rename_session(&self, id: SessionId, title: &str) -> Result<(), StorageError> {
        self.mutate(|sessions| {
            find_mut(sessions, id)?.title = truncate_title(title);
            Ok(())
        })
    }

    /// All sessions, newest first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read();
        let mut out: Vec<SessionSummary> = sessions.iter().rev().map(Into::into).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn session(&self, id: SessionId) -> Option<SessionSummary> {
        self.sessions.read().iter().find(|s| s.id == id).map(Into::into)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn append_message(
        &self,
        id: SessionId,
        role: MessageRole,
        content: &str,
    ) -> Result<(), StorageError> {
        self.mutate(|sessions| {
            find_mut(sessions, id)?.messages.push(StoredMessage {
                role,
                content: content.to_string(),
                created_at: Utc::now(),
            });
            Ok(())
        })
    }

    /// Messages of a session in creation order.
    pub fn messages(&self, id: SessionId) -> Result<Vec<StoredMessage>, StorageError> {
        self.sessions
            .read()
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.messages.clone())
            .ok_or(StorageError::SessionNotFound(id))
    }

    /// Apply `change` to a copy, persist it, and only then publish it.
    ///
    /// A failed write leaves the in-memory state as it was on disk.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<SessionRecord>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut sessions = self.sessions.write();
        let mut next = sessions.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *sessions = next;
        Ok(out)
    }

    fn persist(&self, sessions: &[SessionRecord]) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(sessions).map_err(|source| StorageError::Corrupt {
            path: path.clone(),
            source,
        })?;
        write_atomic(path, &bytes)
    }
}

fn find_mut(sessions: &mut [SessionRecord], id: SessionId) -> Result<&mut SessionRecord, StorageError> {
    sessions
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or(StorageError::SessionNotFound(id))
}

fn truncate_title(title: &str) -> String {
    title.trim().chars().take(MAX_TITLE_CHARS).collect()
}
