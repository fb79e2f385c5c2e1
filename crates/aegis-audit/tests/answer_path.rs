//! Streaming answers and chat sessions.

mod common;

use aegis_audit::{AuditConfig, Assistant, ChatSession};
use aegis_llm::{Role, Turn};
use aegis_storage::{MessageRole, SessionStore};
use common::{Fixture, Mode, Reply, ScriptedCompletion};
use futures::StreamExt;
use std::sync::Arc;

const ROUTER: &str = "Classify the user's message";
const GROUNDED: &str = "CONTEXT:";
const NO_DOCUMENTS: &str = "NO DOCUMENTS";

async fn drain(mut stream: aegis_audit::AnswerStream) -> (String, bool) {
    let mut out = String::new();
    while let Some(piece) = stream.next().await {
        match piece {
            Ok(text) => out.push_str(&text),
            Err(_) => return (out, false),
        }
    }
    (out, true)
}

fn assistant(llm: &Arc<ScriptedCompletion>, fx: &Fixture) -> Assistant {
    Assistant::new(llm.clone(), fx.store.clone(), &AuditConfig::default())
}

#[tokio::test]
async fn test_without_documents_skips_router_and_refuses_to_fabricate() {
    let fx = Fixture::standard();
    let llm = ScriptedCompletion::new()
        .on(NO_DOCUMENTS, Reply::Text(vec!["I don't have ", "any documents yet."]))
        .shared();
    let assistant = assistant(&llm, &fx);

    let stream = assistant
        .answer("what does clause 4 say?", None, Some(&fx.subject), &[])
        .await
        .unwrap();
    let (text, ok) = drain(stream).await;
    assert!(ok);
    assert_eq!(text, "I don't have any documents yet.");
    assert_eq!(llm.count(ROUTER), 0);
    assert_eq!(llm.calls()[0].mode, Mode::Stream);
}

#[tokio::test]
async fn test_evidence_query_streams_grounded_answer_with_history() {
    let fx = Fixture::standard();
    let llm = ScriptedCompletion::new()
        .on(ROUTER, Reply::Text(vec!["DOCUMENT"]))
        .on(GROUNDED, Reply::Text(vec!["Clause 4 ", "allows 30 days."]))
        .shared();
    let assistant = assistant(&llm, &fx);
    let history = vec![Turn::user("hi"), Turn::assistant("hello")];

    let stream = assistant
        .answer(
            "how fast must breaches be reported?",
            Some(&fx.reference),
            Some(&fx.subject),
            &history,
        )
        .await
        .unwrap();
    let (text, _) = drain(stream).await;
    assert_eq!(text, "Clause 4 allows 30 days.");

    let calls = llm.calls();
    let answer = calls.iter().find(|c| c.prompt.contains(GROUNDED)).unwrap();
    assert!(answer.prompt.contains("source: act.pdf"));
    assert!(answer.prompt.contains("source: policy.pdf"));
    assert!(answer.prompt.contains("72 hours"));
    assert_eq!(answer.history, history);
}

#[tokio::test]
async fn test_conversational_query_with_documents_does_not_retrieve() {
    let fx = Fixture::standard();
    let llm = ScriptedCompletion::new()
        .on(ROUTER, Reply::Text(vec!["CONVERSATION"]))
        .on("USER MESSAGE: hello there", Reply::Text(vec!["Hi!"]))
        .shared();
    let assistant = assistant(&llm, &fx);

    let stream = assistant
        .answer("hello there", Some(&fx.reference), Some(&fx.subject), &[])
        .await
        .unwrap();
    assert_eq!(drain(stream).await.0, "Hi!");

    let last = llm.calls().pop().unwrap();
    assert!(!last.prompt.contains(GROUNDED));
    assert!(!last.prompt.contains(NO_DOCUMENTS));
}

#[tokio::test]
async fn test_detached_documents_are_treated_as_absent() {
    let fx = Fixture::standard();
    fx.store.destroy(fx.session).unwrap();
    let llm = ScriptedCompletion::new()
        .on(NO_DOCUMENTS, Reply::Text(vec!["Please upload your documents."]))
        .shared();
    let assistant = assistant(&llm, &fx);

    let stream = assistant
        .answer("audit my policy", Some(&fx.reference), Some(&fx.subject), &[])
        .await
        .unwrap();
    assert_eq!(drain(stream).await.0, "Please upload your documents.");
    assert_eq!(llm.count(ROUTER), 0);
    assert_eq!(llm.count(GROUNDED), 0);
}

#[tokio::test]
async fn test_service_failure_surfaces_as_error() {
    let fx = Fixture::standard();
    let llm = ScriptedCompletion::new().shared();
    let assistant = assistant(&llm, &fx);
    assert!(assistant.answer("hi", None, None, &[]).await.is_err());
}

// ============================================================================
// ChatSession
// ============================================================================

#[tokio::test]
async fn test_chat_session_records_turns_after_drain() {
    let fx = Fixture::standard();
    let store = Arc::new(SessionStore::in_memory());
    let llm = ScriptedCompletion::new()
        .on(ROUTER, Reply::Text(vec!["DOCUMENT"]))
        .on("QUESTION: does clause 4 comply?", Reply::Text(vec!["No, ", "it does not."]))
        .on("QUESTION: why?", Reply::Text(vec!["30 days > 72 hours."]))
        .shared();
    let assistant = assistant(&llm, &fx);

    let chat = ChatSession::start(store.clone()).unwrap();
    let stream = chat
        .ask(&assistant, "does clause 4 comply?", Some(&fx.reference), Some(&fx.subject))
        .await
        .unwrap();

    // user turn is stored immediately, assistant turn only after draining
    assert_eq!(store.messages(chat.id()).unwrap().len(), 1);
    assert_eq!(drain(stream).await, ("No, it does not.".to_string(), true));

    let messages = store.messages(chat.id()).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "No, it does not.");
    assert_eq!(store.session(chat.id()).unwrap().title, "does clause 4 comply?");

    let stream = chat
        .ask(&assistant, "why?", Some(&fx.reference), Some(&fx.subject))
        .await
        .unwrap();
    drain(stream).await;

    let follow_up = llm
        .calls()
        .into_iter()
        .find(|c| c.prompt.contains("QUESTION: why?"))
        .unwrap();
    let roles: Vec<Role> = follow_up.history.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(store.session(chat.id()).unwrap().title, "does clause 4 comply?");
    assert_eq!(chat.history().unwrap().len(), 4);
}

#[tokio::test]
async fn test_interrupted_stream_stores_no_assistant_turn() {
    let fx = Fixture::standard();
    let store = Arc::new(SessionStore::in_memory());
    let llm = ScriptedCompletion::new()
        .on(NO_DOCUMENTS, Reply::TextThenError(vec!["partial"]))
        .shared();
    let assistant = assistant(&llm, &fx);

    let chat = ChatSession::start(store.clone()).unwrap();
    let stream = chat.ask(&assistant, "hello", None, None).await.unwrap();
    assert_eq!(drain(stream).await, ("partial".to_string(), false));

    let messages = store.messages(chat.id()).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
}

#[tokio::test]
async fn test_open_rejects_unknown_session() {
    let store = Arc::new(SessionStore::in_memory());
    assert!(ChatSession::open(store, uuid::Uuid::new_v4()).is_err());
}
