use chrono::{Duration, Utc};
use gigchat::models::{Conversation, Message};
use gigchat::sync::{ScrollMetrics, SyncOutcome, ViewportState};

use crate::support::{fixed_user, other_user, session, RecordingBackend};
use crate::IntegrationHarness;

fn scrolled_up() -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: 0.0,
        scroll_height: 2_000.0,
        client_height: 600.0,
    }
}

#[test]
fn poll_renders_backend_batches_in_timestamp_order() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    let conversation = Conversation::direct("Ada");
    let conversation_id = conversation.conversation_id;
    backend.seed_conversation(conversation);

    let base = Utc::now();
    // Seeded deliberately out of order; the backend is not trusted to sort.
    backend.seed_message(Message::new(
        conversation_id,
        other_user(),
        "second",
        base + Duration::seconds(2),
    ));
    backend.seed_message(Message::new(
        conversation_id,
        other_user(),
        "first",
        base + Duration::seconds(1),
    ));

    let mut session = session(backend);
    session.refresh_directory();
    session.open_conversation(conversation_id, base).unwrap();

    match session.poll_tick(base) {
        Some(SyncOutcome::Rendered { appended, .. }) => assert_eq!(appended.len(), 2),
        other => panic!("expected Rendered, got {other:?}"),
    }
    let bodies: Vec<&str> = session
        .timeline()
        .iter()
        .map(|message| message.body.as_str())
        .collect();
    assert_eq!(bodies, vec!["first", "second"]);
}

#[test]
fn scrolled_up_messages_wait_for_flush() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    let conversation = Conversation::direct("Ada");
    let conversation_id = conversation.conversation_id;
    backend.seed_conversation(conversation);

    let base = Utc::now();
    backend.seed_message(Message::new(
        conversation_id,
        other_user(),
        "old",
        base - Duration::seconds(60),
    ));

    let mut session = session(backend.clone());
    session.refresh_directory();
    session.open_conversation(conversation_id, base).unwrap();
    session.poll_tick(base);
    assert_eq!(session.timeline().len(), 1);

    session.observe_scroll(scrolled_up(), base);
    assert_eq!(session.viewport(), Some(ViewportState::ScrolledUp));

    backend.seed_message(Message::new(conversation_id, other_user(), "new", base));
    match session.force_refresh(base) {
        Some(SyncOutcome::Buffered { queued, unseen }) => {
            assert_eq!(queued.len(), 1);
            assert_eq!(unseen, 1);
        }
        other => panic!("expected Buffered, got {other:?}"),
    }
    // Not rendered until flush.
    assert_eq!(session.timeline().len(), 1);
    assert_eq!(session.unseen_count(), 1);

    let batch = session.flush_new_messages(base).expect("pending batch");
    assert_eq!(batch.separator.message_count, 1);
    assert_eq!(session.timeline().len(), 2);
    assert_eq!(session.unseen_count(), 0);
    assert_eq!(session.viewport(), Some(ViewportState::AtBottom));
}

#[test]
fn repeated_identical_polls_do_not_mutate() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    let conversation = Conversation::direct("Ada");
    let conversation_id = conversation.conversation_id;
    backend.seed_conversation(conversation);
    backend.seed_message(Message::new(
        conversation_id,
        other_user(),
        "only",
        Utc::now(),
    ));

    let base = Utc::now();
    let mut session = session(backend);
    session.refresh_directory();
    session.open_conversation(conversation_id, base).unwrap();
    session.poll_tick(base);

    assert_eq!(session.force_refresh(base), Some(SyncOutcome::Unchanged));
    assert_eq!(session.force_refresh(base), Some(SyncOutcome::Unchanged));
    assert_eq!(session.timeline().len(), 1);
}

#[test]
fn switching_conversations_isolates_state() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    let first = Conversation::direct("Ada");
    let second = Conversation::direct("Grace");
    let first_id = first.conversation_id;
    let second_id = second.conversation_id;
    backend.seed_conversation(first);
    backend.seed_conversation(second);

    let base = Utc::now();
    backend.seed_message(Message::new(first_id, other_user(), "for ada", base));

    let mut session = session(backend.clone());
    session.refresh_directory();
    session.open_conversation(first_id, base).unwrap();
    session.poll_tick(base);
    session.observe_scroll(scrolled_up(), base);
    backend.seed_message(Message::new(
        first_id,
        other_user(),
        "buffered",
        base + Duration::seconds(1),
    ));
    session.force_refresh(base);
    assert_eq!(session.unseen_count(), 1);

    // Switch: buffer and counter reset, the other room's history loads.
    session.open_conversation(second_id, base).unwrap();
    assert_eq!(session.unseen_count(), 0);
    assert!(session.timeline().is_empty());
    session.poll_tick(base);
    assert!(session
        .timeline()
        .iter()
        .all(|message| message.conversation_id == second_id));
}

#[test]
fn failed_fetch_is_journaled_and_skipped() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    let conversation = Conversation::direct("Ada");
    let conversation_id = conversation.conversation_id;
    backend.seed_conversation(conversation);

    let base = Utc::now();
    let mut session = session(backend.clone());
    session.refresh_directory();
    session.open_conversation(conversation_id, base).unwrap();

    backend.fail_once("list_messages", gigchat::backend::BackendError::Unreachable);
    match session.poll_tick(base) {
        Some(SyncOutcome::Failed { .. }) => {}
        other => panic!("expected Failed, got {other:?}"),
    }
    // The next due tick retries and succeeds.
    backend.seed_message(Message::new(conversation_id, other_user(), "late", base));
    let retry_at = base + Duration::milliseconds(5_000);
    match session.poll_tick(retry_at) {
        Some(SyncOutcome::Rendered { appended, .. }) => assert_eq!(appended.len(), 1),
        other => panic!("expected Rendered on retry, got {other:?}"),
    }

    let events = session.journal().load_all().expect("journal readable");
    assert!(events
        .iter()
        .any(|event| event.event_type == gigchat::events::EventType::SyncFailed));
}

#[test]
fn unread_counter_clears_on_open() {
    let _harness = IntegrationHarness::new();
    let backend = RecordingBackend::new(fixed_user());
    let mut conversation = Conversation::direct("Ada");
    conversation.unread_count = 7;
    let conversation_id = conversation.conversation_id;
    backend.seed_conversation(conversation);

    let mut session = session(backend);
    session.refresh_directory();
    assert_eq!(
        session.directory().get(conversation_id).map(|c| c.unread_count),
        Some(7)
    );
    session.open_conversation(conversation_id, Utc::now()).unwrap();
    assert_eq!(
        session.directory().get(conversation_id).map(|c| c.unread_count),
        Some(0)
    );
}
