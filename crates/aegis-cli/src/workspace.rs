//! On-disk layout of one Aegis data directory.

use aegis_audit::AuditConfig;
use aegis_ingest::{extract_document, Chunk, TextSplitter};
use aegis_storage::{CorpusHandle, CorpusRole, CorpusStore, SessionId, SessionStore};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SESSIONS_FILE: &str = "sessions.json";
pub const CORPORA_DIR: &str = "corpora";
pub const AUDIT_CONFIG_FILE: &str = "audit.json";

pub struct Workspace {
    root: PathBuf,
    pub sessions: Arc<SessionStore>,
    pub corpora: Arc<CorpusStore>,
}

impl Workspace {
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("failed to create data dir {}", root.display()))?;
        let sessions = SessionStore::open(root.join(SESSIONS_FILE))?;
        Ok(Self {
            root: root.to_path_buf(),
            sessions: Arc::new(sessions),
            corpora: Arc::new(CorpusStore::new(root.join(CORPORA_DIR))),
        })
    }

    /// `audit.json` in the data dir if present, defaults otherwise.
    pub fn audit_config(&self) -> Result<AuditConfig> {
        let path = self.root.join(AUDIT_CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("invalid audit config {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AuditConfig::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn require_session(&self, id: SessionId) -> Result<()> {
        self.sessions
            .session(id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("no session {id} (see `aegis session list`)"))
    }

    /// Reference and subject handles, `None` where nothing was ingested.
    pub fn attach(&self, id: SessionId) -> Result<(Option<CorpusHandle>, Option<CorpusHandle>)> {
        Ok((
            self.corpora.attach(id, CorpusRole::Reference)?,
            self.corpora.attach(id, CorpusRole::Subject)?,
        ))
    }
}

/// Display name and bounded chunks of one document file.
pub fn extract(path: &Path) -> Result<(String, Vec<Chunk>)> {
    let extraction = extract_document(path, &TextSplitter::default())
        .with_context(|| format!("failed to extract {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| extraction.document_id.clone());
    Ok((name, extraction.chunks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_config_defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        assert_eq!(ws.audit_config().unwrap(), AuditConfig::default());

        std::fs::write(dir.path().join(AUDIT_CONFIG_FILE), r#"{"concurrency": 3}"#).unwrap();
        assert_eq!(ws.audit_config().unwrap().concurrency, 3);
    }

    #[test]
    fn extract_names_documents_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.md");
        std::fs::write(&path, "# Policy\nIncidents are reported within 30 days.").unwrap();

        let (name, chunks) = extract(&path).unwrap();
        assert_eq!(name, "policy.md");
        assert_eq!(chunks.len(), 1);
        assert!(extract(&dir.path().join("missing.pdf")).is_err());
    }

    #[test]
    fn attach_without_ingest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let id = ws.sessions.create_session("t").unwrap();
        ws.require_session(id).unwrap();
        assert_eq!(ws.attach(id).unwrap(), (None, None));
        assert!(ws.require_session(uuid::Uuid::new_v4()).is_err());
    }
}
