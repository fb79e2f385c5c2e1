//! A conversation bound to one stored session.

use crate::answer::{AnswerStream, Assistant};
use crate::AuditError;
use aegis_llm::Turn;
use aegis_storage::{
    CorpusHandle, MessageRole, SessionId, SessionStore, StorageError, StoredMessage,
};
use async_stream::stream;
use futures::StreamExt;
use std::sync::Arc;

pub const DEFAULT_SESSION_TITLE: &str = "New Audit";

pub struct ChatSession {
    store: Arc<SessionStore>,
    id: SessionId,
}

impl ChatSession {
    /// Bind to an existing session.
    pub fn open(store: Arc<SessionStore>, id: SessionId) -> Result<Self, StorageError> {
        if store.session(id).is_none() {
            return Err(StorageError::SessionNotFound(id));
        }
        Ok(Self { store, id })
    }

    /// Create an untitled session; the first message names it.
    pub fn start(store: Arc<SessionStore>) -> Result<Self, StorageError> {
        let id = store.create_session(DEFAULT_SESSION_TITLE)?;
        Ok(Self { store, id })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn history(&self) -> Result<Vec<Turn>, StorageError> {
        Ok(self.store.messages(self.id)?.into_iter().map(to_turn).collect())
    }

    /// Store a user message, titling the session if this is its first.
    pub fn record_user(&self, content: &str) -> Result<(), StorageError> {
        if let Some(summary) = self.store.session(self.id) {
            if summary.message_count == 0 && summary.title == DEFAULT_SESSION_TITLE {
                self.store.rename_session(self.id, content.trim())?;
            }
        }
        self.store.append_message(self.id, MessageRole::User, content)
    }

    /// Ask `query`; the reply is stored once the stream is drained.
    ///
    /// A stream that ends in an error stores nothing for the assistant.
    pub async fn ask(
        &self,
        assistant: &Assistant,
        query: &str,
        reference: Option<&CorpusHandle>,
        subject: Option<&CorpusHandle>,
    ) -> Result<AnswerStream, AuditError> {
        let history = self.history()?;
        self.record_user(query)?;

        let mut inner = assistant.answer(query, reference, subject, &history).await?;
        let store = Arc::clone(&self.store);
        let id = self.id;

        let s = stream! {
            let mut full = String::new();
            while let Some(piece) = inner.next().await {
                match piece {
                    Ok(text) => {
                        full.push_str(&text);
                        yield Ok(text);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            if let Err(e) = store.append_message(id, MessageRole::Assistant, &full) {
                yield Err(AuditError::from(e));
            }
        };
        Ok(s.boxed())
    }
}

fn to_turn(message: StoredMessage) -> Turn {
    match message.role {
        MessageRole::User => Turn::user(message.content),
        MessageRole::Assistant => Turn::assistant(message.content),
    }
}
