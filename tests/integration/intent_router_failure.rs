use chrono::Utc;
use gigchat::backend::BackendError;
use gigchat::models::Conversation;
use uuid::Uuid;

use crate::support::{fixed_user, session, RecordingBackend};
use crate::IntegrationHarness;

fn open_direct(
    backend: &RecordingBackend,
) -> (gigchat::chat::ChatSession<RecordingBackend>, Uuid) {
    let conversation = Conversation::direct("Assistant room");
    let conversation_id = conversation.conversation_id;
    backend.seed_conversation(conversation);
    let mut session = session(backend.clone());
    session.refresh_directory();
    session
        .open_conversation(conversation_id, Utc::now())
        .expect("conversation opens");
    (session, conversation_id)
}

#[test]
fn backend_reason_is_echoed_verbatim() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    backend.fail_once(
        "update_order_status",
        BackendError::Rejected("Order already delivered".into()),
    );
    let (mut session, _) = open_direct(&backend);

    let replies = session
        .handle_input("update order #482 to delivered", Utc::now())
        .expect("input handled");
    assert!(replies[0].text.starts_with("[ERR] orders.update_status"));
    assert!(
        replies[0].text.contains("Order already delivered"),
        "reason not echoed: {}",
        replies[0].text
    );
}

#[test]
fn unreachable_backend_gets_generic_failure_line() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    backend.fail_once("release_escrow", BackendError::Unreachable);
    let (mut session, _) = open_direct(&backend);

    let replies = session
        .handle_input("release escrow payment for order 9", Utc::now())
        .expect("input handled");
    assert!(replies[0].text.starts_with("[ERR]"));
    assert!(replies[0]
        .text
        .contains("The request could not be completed"));
}

#[test]
fn missing_profile_triggers_create_then_set() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    backend.fail_once("update_freelancer_profile", BackendError::NotFound);
    let (mut session, _) = open_direct(&backend);

    let replies = session
        .handle_input("set hourly rate to 50", Utc::now())
        .expect("input handled");
    assert!(
        replies[0].text.starts_with("[OK]"),
        "fallback should recover: {}",
        replies[0].text
    );

    let calls: Vec<String> = backend
        .calls()
        .into_iter()
        .filter(|call| call.contains("freelancer_profile"))
        .collect();
    assert_eq!(
        calls,
        vec![
            "update_freelancer_profile:hourly_rate".to_string(),
            "create_freelancer_profile".to_string(),
            "update_freelancer_profile:hourly_rate".to_string(),
        ]
    );
}

#[test]
fn partial_multi_entity_failure_reports_independently() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    backend.fail_once(
        "update_freelancer_profile",
        BackendError::Rejected("Rate out of range".into()),
    );
    let (mut session, _) = open_direct(&backend);

    let replies = session
        .handle_input("set city to Oslo and set hourly rate to 50", Utc::now())
        .expect("input handled");
    let text = &replies[0].text;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "one outcome line per entity: {text}");
    assert!(lines[0].starts_with("[OK]"), "account line: {}", lines[0]);
    assert!(lines[1].starts_with("[ERR]"), "freelancer line: {}", lines[1]);
    assert!(lines[1].contains("Rate out of range"));
    // The account update was not rolled back.
    assert!(backend
        .calls()
        .contains(&"update_account:city".to_string()));
}

#[test]
fn failed_send_surfaces_one_failure_line() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    backend.fail_once("create_message", BackendError::Unreachable);
    let (mut session, _) = open_direct(&backend);

    let replies = session
        .handle_input("hello there", Utc::now())
        .expect("input handled");
    assert_eq!(replies.len(), 1);
    assert!(replies[0].text.starts_with("[ERR] messages.create"));
    assert!(session.timeline().is_empty(), "nothing rendered on failure");
}
