//! Executes classified intents against the backend collaborators.
//!
//! Every dispatch path has the same shape: one backend call (up to three
//! for multi-entity field batches), outcome converted into a user-facing
//! message, optional action cards or a navigation target attached. Backend
//! failures never escape this module; the backend-provided reason is echoed
//! verbatim when present, otherwise a generic failure line is used.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{fallback, format_intent_failure, format_intent_success, ClassifiedIntent};
use crate::backend::{BackendError, BackendResult, MarketplaceBackend};
use crate::chat::intents::fields::FieldUpdate;
use crate::events::{EventJournal, EventType};
use crate::models::{OrderStatus, ProfileEntity};

/// Suggested follow-up operation shown alongside a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCard {
    pub label: String,
    pub description: String,
    pub target: String,
}

pub const MAX_ACTION_CARDS: usize = 3;

const GENERIC_FAILURE: &str = "The request could not be completed. Please try again.";

/// User-facing outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchReply {
    pub text: String,
    pub cards: Vec<ActionCard>,
    pub navigate: Option<String>,
}

impl DispatchReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cards: Vec::new(),
            navigate: None,
        }
    }

    fn with_navigate(mut self, target: impl Into<String>) -> Self {
        self.navigate = Some(target.into());
        self
    }

    fn with_card(
        mut self,
        label: impl Into<String>,
        description: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        if self.cards.len() < MAX_ACTION_CARDS {
            self.cards.push(ActionCard {
                label: label.into(),
                description: description.into(),
                target: target.into(),
            });
        }
        self
    }
}

pub struct ActionDispatcher;

impl ActionDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Executes the intent. Never returns an error: failures become reply
    /// text, journaled with the event id echoed in the message.
    pub fn dispatch<B: MarketplaceBackend>(
        &self,
        backend: &B,
        journal: &EventJournal,
        intent: &ClassifiedIntent,
    ) -> DispatchReply {
        let action = intent.action_name();
        journal.record(
            EventType::IntentDetected,
            json!({ "action": action, "intent": intent }),
        );
        match intent {
            ClassifiedIntent::SwitchRole { role } => {
                match backend.switch_role(role.as_str()) {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            &format!("You are now operating as a {}.", role.as_str()),
                        ))
                        .with_navigate("/dashboard")
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::SetProfilePublished { entity, published } => {
                self.dispatch_publish(backend, journal, action, *entity, *published)
            }
            ClassifiedIntent::UpdateFields { updates } => {
                self.dispatch_field_updates(backend, journal, action, updates)
            }
            ClassifiedIntent::ListOrders => match backend.list_orders() {
                Ok(items) => {
                    let event_id = self.executed(journal, action);
                    let mut details = format!("You have {} order(s).", items.len());
                    for line in preview_lines(&items) {
                        details.push_str("\n- ");
                        details.push_str(&line);
                    }
                    DispatchReply::text(format_intent_success(action, &event_id, &details))
                        .with_navigate("/orders")
                }
                Err(err) => self.failure(journal, action, &err),
            },
            ClassifiedIntent::UpdateOrderStatus { order_id, status } => {
                match backend.update_order_status(*order_id, status.as_str()) {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        let mut reply = DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            &format!("Order #{order_id} is now {}.", status.as_str()),
                        ));
                        if matches!(status, OrderStatus::Delivered | OrderStatus::Completed) {
                            reply = reply
                                .with_card(
                                    "Release escrow",
                                    format!("Release the payment held for order #{order_id}."),
                                    format!("/orders/{order_id}/escrow"),
                                )
                                .with_card(
                                    "Leave a rating",
                                    format!("Rate your experience on order #{order_id}."),
                                    format!("/orders/{order_id}/review"),
                                );
                        }
                        reply
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::ReleaseEscrow { order_id } => {
                match backend.release_escrow(*order_id) {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            &format!("Escrow for order #{order_id} released."),
                        ))
                        .with_card(
                            "Leave a rating",
                            format!("Rate your experience on order #{order_id}."),
                            format!("/orders/{order_id}/review"),
                        )
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::SubmitRating { order_id, rating } => {
                match backend.create_review(*order_id, *rating, None) {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            &format!("Thanks! Order #{order_id} rated {rating} star(s)."),
                        ))
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::ListNotifications => match backend.list_notifications() {
                Ok(items) => {
                    // Listing doubles as acknowledgement; a mark-read
                    // failure is not worth interrupting the reply for.
                    let _ = backend.mark_notifications_read();
                    let event_id = self.executed(journal, action);
                    let mut details = format!("You have {} notification(s).", items.len());
                    for line in preview_lines(&items) {
                        details.push_str("\n- ");
                        details.push_str(&line);
                    }
                    DispatchReply::text(format_intent_success(action, &event_id, &details))
                }
                Err(err) => self.failure(journal, action, &err),
            },
            ClassifiedIntent::SetNotificationsMuted { muted } => {
                match backend.set_notifications_muted(*muted) {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        let details = if *muted {
                            "Notifications muted."
                        } else {
                            "Notifications unmuted."
                        };
                        DispatchReply::text(format_intent_success(action, &event_id, details))
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::FileReport { subject } => {
                match backend.create_report(subject, subject) {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            "Report filed. The trust & safety team will review it.",
                        ))
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::OpenSupportTicket { subject } => {
                match backend.create_support_ticket(subject, subject) {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            "Support ticket opened. You'll hear back shortly.",
                        ))
                        .with_navigate("/support")
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::RequestDocumentUpload => {
                match backend.request_document_upload() {
                    Ok(_) => {
                        let event_id = self.executed(journal, action);
                        DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            "Document upload requested. Use the upload page to attach files.",
                        ))
                        .with_navigate("/documents/upload")
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::SearchGigs { query } => {
                self.dispatch_search(journal, action, query, "/gigs", backend.search_gigs(query))
            }
            ClassifiedIntent::SearchJobs { query } => {
                self.dispatch_search(journal, action, query, "/jobs", backend.search_jobs(query))
            }
            ClassifiedIntent::DiscoverGroups => match backend.list_groups() {
                Ok(items) => {
                    let event_id = self.executed(journal, action);
                    let mut reply = DispatchReply::text(format_intent_success(
                        action,
                        &event_id,
                        &format!("Found {} group(s) you could join.", items.len()),
                    ));
                    for item in items.iter().take(MAX_ACTION_CARDS) {
                        let target = item_id(item)
                            .map(|id| format!("/groups/{id}"))
                            .unwrap_or_else(|| "/groups".into());
                        reply = reply.with_card(
                            item_title(item),
                            "Open this group.".to_string(),
                            target,
                        );
                    }
                    reply
                }
                Err(err) => self.failure(journal, action, &err),
            },
            ClassifiedIntent::JoinGroup { group_id } => match backend.join_group(*group_id) {
                Ok(_) => {
                    let event_id = self.executed(journal, action);
                    DispatchReply::text(format_intent_success(
                        action,
                        &event_id,
                        &format!("You joined group #{group_id}."),
                    ))
                    .with_navigate(format!("/groups/{group_id}"))
                }
                Err(err) => self.failure(journal, action, &err),
            },
            ClassifiedIntent::CreateGroup { name } => match backend.create_group(name) {
                Ok(payload) => {
                    let event_id = self.executed(journal, action);
                    let navigate = item_id(&payload)
                        .map(|id| format!("/groups/{id}"))
                        .unwrap_or_else(|| "/groups".into());
                    DispatchReply::text(format_intent_success(
                        action,
                        &event_id,
                        &format!("Group `{name}` created."),
                    ))
                    .with_navigate(navigate)
                }
                Err(err) => self.failure(journal, action, &err),
            },
            ClassifiedIntent::SearchUsers { query } => {
                self.dispatch_search(journal, action, query, "/users", backend.search_users(query))
            }
            ClassifiedIntent::StartDirectConversation { handle } => {
                match backend.start_direct_conversation(handle) {
                    Ok(conversation) => {
                        let event_id = self.executed(journal, action);
                        DispatchReply::text(format_intent_success(
                            action,
                            &event_id,
                            &format!("Opened a conversation with {}.", conversation.display_name),
                        ))
                        .with_navigate(format!(
                            "/conversations/{}",
                            conversation.conversation_id
                        ))
                    }
                    Err(err) => self.failure(journal, action, &err),
                }
            }
            ClassifiedIntent::Clarify { form } => {
                journal.record(
                    EventType::IntentFailed,
                    json!({ "action": action, "reason": "clarification_required", "form": form.form_id() }),
                );
                DispatchReply::text(form.prompt().to_string()).with_card(
                    form.card_label(),
                    "Open the form to fill in what's missing.".to_string(),
                    form.form_id(),
                )
            }
            ClassifiedIntent::Unhandled => {
                // Callers normally route unmatched input to the
                // conversational fallback before dispatch.
                DispatchReply::text(fallback::no_match_response(""))
            }
        }
    }

    fn dispatch_publish<B: MarketplaceBackend>(
        &self,
        backend: &B,
        journal: &EventJournal,
        action: &str,
        entity: ProfileEntity,
        published: bool,
    ) -> DispatchReply {
        let profile = match entity {
            ProfileEntity::FreelancerProfile => "freelancer",
            ProfileEntity::ClientProfile => "client",
            // Accounts have no publish bit; field updates handle them.
            ProfileEntity::Account => {
                return self.failure(
                    journal,
                    action,
                    &BackendError::Rejected("Accounts cannot be published.".into()),
                )
            }
        };
        let result = upsert_profile(
            || backend.set_profile_published(profile, published),
            || match entity {
                ProfileEntity::ClientProfile => backend.create_client_profile(),
                _ => backend.create_freelancer_profile(),
            },
        );
        match result {
            Ok(_) => {
                let event_id = self.executed(journal, action);
                let details = if published {
                    format!("Your {} profile is now live.", entity.label())
                } else {
                    format!("Your {} profile is no longer visible.", entity.label())
                };
                DispatchReply::text(format_intent_success(action, &event_id, &details))
            }
            Err(err) => self.failure(journal, action, &err),
        }
    }

    /// Multi-entity field batch: one call per target entity, outcomes
    /// reported independently, no rollback on partial failure.
    fn dispatch_field_updates<B: MarketplaceBackend>(
        &self,
        backend: &B,
        journal: &EventJournal,
        action: &str,
        updates: &[FieldUpdate],
    ) -> DispatchReply {
        let mut lines = Vec::new();
        for entity in [
            ProfileEntity::Account,
            ProfileEntity::FreelancerProfile,
            ProfileEntity::ClientProfile,
        ] {
            let fields: Map<String, Value> = updates
                .iter()
                .filter(|update| update.entity == entity)
                .map(|update| (update.field_name.clone(), update.coerced.clone()))
                .collect();
            if fields.is_empty() {
                continue;
            }
            let field_names = fields.keys().cloned().collect::<Vec<_>>().join(", ");
            let result = match entity {
                ProfileEntity::Account => backend.update_account(&fields),
                ProfileEntity::FreelancerProfile => upsert_profile(
                    || backend.update_freelancer_profile(&fields),
                    || backend.create_freelancer_profile(),
                ),
                ProfileEntity::ClientProfile => upsert_profile(
                    || backend.update_client_profile(&fields),
                    || backend.create_client_profile(),
                ),
            };
            match result {
                Ok(_) => {
                    let event_id = self.executed(journal, action);
                    lines.push(format_intent_success(
                        action,
                        &event_id,
                        &format!("Updated {} ({field_names}).", entity.label()),
                    ));
                }
                Err(err) => {
                    lines.push(self.failure(journal, action, &err).text);
                }
            }
        }
        DispatchReply {
            text: lines.join("\n"),
            cards: Vec::new(),
            navigate: None,
        }
    }

    fn dispatch_search(
        &self,
        journal: &EventJournal,
        action: &str,
        query: &str,
        route: &str,
        result: BackendResult<Vec<Value>>,
    ) -> DispatchReply {
        match result {
            Ok(items) => {
                let event_id = self.executed(journal, action);
                let mut reply = DispatchReply::text(format_intent_success(
                    action,
                    &event_id,
                    &format!("Found {} result(s) for `{query}`.", items.len()),
                ))
                .with_navigate(format!("{route}?q={}", query.replace(' ', "+")));
                for item in items.iter().take(MAX_ACTION_CARDS) {
                    let target = item_id(item)
                        .map(|id| format!("{route}/{id}"))
                        .unwrap_or_else(|| route.to_string());
                    reply = reply.with_card(item_title(item), "Open this result.".to_string(), target);
                }
                reply
            }
            Err(err) => self.failure(journal, action, &err),
        }
    }

    fn executed(&self, journal: &EventJournal, action: &str) -> Uuid {
        journal.record(EventType::IntentExecuted, json!({ "action": action }))
    }

    fn failure(&self, journal: &EventJournal, action: &str, err: &BackendError) -> DispatchReply {
        let event_id = journal.record(
            EventType::IntentFailed,
            json!({ "action": action, "reason": err.to_string() }),
        );
        let reason = err
            .reason()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        DispatchReply::text(format_intent_failure(action, &event_id, &reason))
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Profile upsert: on entity-not-found, create the profile and retry once.
fn upsert_profile<F, C>(attempt: F, create: C) -> BackendResult<Value>
where
    F: Fn() -> BackendResult<Value>,
    C: FnOnce() -> BackendResult<Value>,
{
    match attempt() {
        Err(BackendError::NotFound) => {
            create()?;
            attempt()
        }
        other => other,
    }
}

fn item_title(item: &Value) -> String {
    item.get("title")
        .or_else(|| item.get("name"))
        .or_else(|| item.get("subject"))
        .and_then(Value::as_str)
        .unwrap_or("Untitled")
        .to_string()
}

fn item_id(item: &Value) -> Option<String> {
    let id = item.get("id").or_else(|| item.get("group_id"))?;
    if let Some(number) = id.as_u64() {
        return Some(number.to_string());
    }
    id.as_str().map(str::to_string)
}

fn preview_lines(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .take(3)
        .map(|item| {
            let title = item_title(item);
            match item.get("status").and_then(Value::as_str) {
                Some(status) => format!("{title} ({status})"),
                None => title,
            }
        })
        .collect()
}
