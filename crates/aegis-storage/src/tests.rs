//! Store tests against temp directories

use super::*;
use aegis_ingest::{extract_text, Chunk};
use tempfile::tempdir;
use uuid::Uuid;

fn chunks(text: &str) -> Vec<Chunk> {
    extract_text(text, "doc").chunks
}

const ACT: &str = "Section 12. Processors must notify the authority within 72 hours.\n\n\
Section 13. Records of processing shall be retained for five years.\n\n\
Section 14. Penalties apply for late notification.";

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_sessions_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sessions.json");

    let id = {
        let store = SessionStore::open(&path).unwrap();
        let id = store.create_session("New Audit").unwrap();
        store.append_message(id, MessageRole::User, "hello").unwrap();
        store
            .append_message(id, MessageRole::Assistant, "hi there")
            .unwrap();
        id
    };

    let store = SessionStore::open(&path).unwrap();
    let messages = store.messages(id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].content, "hi there");
    assert!(messages[0].created_at <= messages[1].created_at);
}

#[test]
fn test_failed_write_leaves_state_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sessions.json");
    let store = SessionStore::open(&path).unwrap();
    let id = store.create_session("New Audit").unwrap();
    store.append_message(id, MessageRole::User, "hello").unwrap();

    // a directory where the temp file goes makes every write fail
    std::fs::create_dir(dir.path().join("sessions.json.tmp")).unwrap();

    assert!(store.append_message(id, MessageRole::Assistant, "lost").is_err());
    assert!(store.rename_session(id, "renamed").is_err());
    assert!(store.create_session("another").is_err());
    assert!(store.delete_session(id).is_err());

    assert_eq!(store.messages(id).unwrap().len(), 1);
    assert_eq!(store.session(id).unwrap().title, "New Audit");
    assert_eq!(store.list_sessions().len(), 1);

    let reopened = SessionStore::open(&path).unwrap();
    assert_eq!(reopened.messages(id).unwrap().len(), 1);
}

#[test]
fn test_list_sessions_newest_first() {
    let store = SessionStore::in_memory();
    let first = store.create_session("first").unwrap();
    let second = store.create_session("second").unwrap();

    let listed: Vec<_> = store.list_sessions().into_iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![second, first]);
}

#[test]
fn test_rename_truncates_title() {
    let store = SessionStore::in_memory();
    let id = store.create_session("New Chat").unwrap();
    store.rename_session(id, &"x".repeat(80)).unwrap();

    let summary = store.session(id).unwrap();
    assert_eq!(summary.title.chars().count(), MAX_TITLE_CHARS);
}

#[test]
fn test_delete_removes_messages_and_unknown_ids_error() {
    let store = SessionStore::in_memory();
    let id = store.create_session("gone").unwrap();
    store.append_message(id, MessageRole::User, "q").unwrap();
    store.delete_session(id).unwrap();

    assert!(matches!(
        store.messages(id),
        Err(StorageError::SessionNotFound(_))
    ));
    assert!(matches!(
        store.delete_session(id),
        Err(StorageError::SessionNotFound(_))
    ));
    assert!(matches!(
        store.append_message(Uuid::new_v4(), MessageRole::User, "q"),
        Err(StorageError::SessionNotFound(_))
    ));
}

// ============================================================================
// Corpora
// ============================================================================

#[test]
fn test_search_ranks_matching_chunk_first() {
    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let session = Uuid::new_v4();
    let handle = store
        .create(session, CorpusRole::Reference, "act.pdf", chunks(ACT))
        .unwrap();

    let hits = store.search(&handle, "retention of records", 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].chunk.text.contains("Section 13"));
    assert_eq!(hits[0].document_name, "act.pdf");
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn test_search_returns_at_most_k_even_without_matches() {
    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let handle = store
        .create(Uuid::new_v4(), CorpusRole::Subject, "policy", chunks(ACT))
        .unwrap();

    assert_eq!(store.search(&handle, "zebra", 2).unwrap().len(), 2);
    assert_eq!(store.search(&handle, "zebra", 10).unwrap().len(), 3);
}

#[test]
fn test_numbers_are_searchable() {
    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let handle = store
        .create(Uuid::new_v4(), CorpusRole::Reference, "act", chunks(ACT))
        .unwrap();

    let hits = store.search(&handle, "section 14", 1).unwrap();
    assert!(hits[0].chunk.text.starts_with("Section 14"));
}

#[test]
fn test_create_is_idempotent_for_same_content() {
    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let session = Uuid::new_v4();

    let a = store
        .create(session, CorpusRole::Reference, "act", chunks(ACT))
        .unwrap();
    let b = store
        .create(session, CorpusRole::Reference, "act", chunks(ACT))
        .unwrap();
    assert_eq!(a, b);
    assert!(store.is_attached(&a));
}

#[test]
fn test_replacing_content_invalidates_old_handle() {
    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let session = Uuid::new_v4();

    let old = store
        .create(session, CorpusRole::Subject, "v1", chunks("Old policy text."))
        .unwrap();
    let new = store
        .create(session, CorpusRole::Subject, "v2", chunks("New policy text."))
        .unwrap();

    assert_ne!(old, new);
    assert!(matches!(
        store.search(&old, "policy", 3),
        Err(StorageError::CorpusDetached { .. })
    ));
    assert_eq!(store.info(&new).unwrap().document_name, "v2");
}

#[test]
fn test_attach_loads_from_disk_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let session = Uuid::new_v4();
    {
        let store = CorpusStore::new(dir.path());
        store
            .create(session, CorpusRole::Reference, "act", chunks(ACT))
            .unwrap();
    }

    let store = CorpusStore::new(dir.path());
    let first = store.attach(session, CorpusRole::Reference).unwrap().unwrap();
    let second = store.attach(session, CorpusRole::Reference).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(store.info(&first).unwrap().chunk_count, 3);

    assert!(store.attach(session, CorpusRole::Subject).unwrap().is_none());
}

#[test]
fn test_concurrent_attach_issues_one_handle() {
    use std::sync::Barrier;

    let dir = tempdir().unwrap();
    let session = Uuid::new_v4();
    CorpusStore::new(dir.path())
        .create(session, CorpusRole::Reference, "act", chunks(ACT))
        .unwrap();

    for _ in 0..20 {
        let store = CorpusStore::new(dir.path());
        let barrier = Barrier::new(4);
        let handles: Vec<CorpusHandle> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        store.attach(session, CorpusRole::Reference).unwrap().unwrap()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(handles.iter().all(|h| store.is_attached(h)));
        assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    }
}

#[test]
fn test_concurrent_create_of_same_document_issues_one_handle() {
    use std::sync::Barrier;

    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let session = Uuid::new_v4();
    let barrier = Barrier::new(4);

    let handles: Vec<CorpusHandle> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    store
                        .create(session, CorpusRole::Subject, "policy", chunks(ACT))
                        .unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(handles.iter().all(|h| store.is_attached(h)));
}

#[test]
fn test_same_text_under_new_name_replaces_index() {
    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let session = Uuid::new_v4();

    let old = store
        .create(session, CorpusRole::Reference, "act-2023.pdf", chunks(ACT))
        .unwrap();
    let new = store
        .create(session, CorpusRole::Reference, "act-2024.pdf", chunks(ACT))
        .unwrap();

    assert_ne!(old, new);
    assert!(!store.is_attached(&old));
    assert_eq!(store.info(&new).unwrap().document_name, "act-2024.pdf");
}

#[test]
fn test_destroy_is_total() {
    let dir = tempdir().unwrap();
    let store = CorpusStore::new(dir.path());
    let session = Uuid::new_v4();
    let other = Uuid::new_v4();

    let reference = store
        .create(session, CorpusRole::Reference, "act", chunks(ACT))
        .unwrap();
    let subject = store
        .create(session, CorpusRole::Subject, "policy", chunks("Policy."))
        .unwrap();
    let unrelated = store
        .create(other, CorpusRole::Reference, "act", chunks(ACT))
        .unwrap();

    assert_eq!(store.destroy(session).unwrap(), 2);

    assert!(!dir.path().join(session.to_string()).exists());
    assert!(store.search(&reference, "notify", 1).is_err());
    assert!(store.info(&subject).is_none());
    assert!(store.attach(session, CorpusRole::Reference).unwrap().is_none());
    assert!(store.is_attached(&unrelated));

    // destroying twice is harmless
    assert_eq!(store.destroy(session).unwrap(), 0);
}
