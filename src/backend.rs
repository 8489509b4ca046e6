//! Backend collaborator seam.
//!
//! Every operation the conversational layer consumes from the marketplace
//! backend, shape-level only. Payloads travel as small JSON values; error
//! payloads carry the backend's human-readable reason, which the dispatcher
//! surfaces verbatim when present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Attachment, Conversation, Message};

/// Failure reported by a backend collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend rejected the call and explained why.
    #[error("{0}")]
    Rejected(String),
    /// The addressed entity does not exist (drives create-then-set fallbacks).
    #[error("entity not found")]
    NotFound,
    /// Transient transport failure; the next poll tick retries.
    #[error("backend unreachable")]
    Unreachable,
}

impl BackendError {
    /// Human-readable reason when the backend provided one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            BackendError::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Outbound message payload (the send path).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageDraft {
    pub body: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

impl MessageDraft {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            attachment: None,
            reply_to: None,
        }
    }
}

/// The marketplace operations the chat surface dispatches against.
///
/// Request/response polling only; no push channel. Implementations return
/// either a success payload or a `BackendError` — no other failure path.
pub trait MarketplaceBackend {
    // Conversations and messages.
    fn list_conversations(&self) -> BackendResult<Vec<Conversation>>;
    fn list_messages(&self, conversation_id: Uuid) -> BackendResult<Vec<Message>>;
    fn create_message(&self, conversation_id: Uuid, draft: MessageDraft) -> BackendResult<Message>;
    fn start_direct_conversation(&self, handle: &str) -> BackendResult<Conversation>;

    // Account and role.
    fn switch_role(&self, role: &str) -> BackendResult<Value>;
    fn update_account(&self, fields: &Map<String, Value>) -> BackendResult<Value>;

    // Profiles. Updates may fail with `NotFound` for users who never created
    // the profile; callers then create and retry.
    fn create_freelancer_profile(&self) -> BackendResult<Value>;
    fn update_freelancer_profile(&self, fields: &Map<String, Value>) -> BackendResult<Value>;
    fn create_client_profile(&self) -> BackendResult<Value>;
    fn update_client_profile(&self, fields: &Map<String, Value>) -> BackendResult<Value>;
    fn set_profile_published(&self, profile: &str, published: bool) -> BackendResult<Value>;

    // Orders.
    fn list_orders(&self) -> BackendResult<Vec<Value>>;
    fn update_order_status(&self, order_id: u64, status: &str) -> BackendResult<Value>;
    fn release_escrow(&self, order_id: u64) -> BackendResult<Value>;
    fn create_review(&self, order_id: u64, rating: u8, comment: Option<&str>)
        -> BackendResult<Value>;

    // Notifications.
    fn list_notifications(&self) -> BackendResult<Vec<Value>>;
    fn mark_notifications_read(&self) -> BackendResult<Value>;
    fn set_notifications_muted(&self, muted: bool) -> BackendResult<Value>;

    // Trust and support.
    fn create_report(&self, subject: &str, details: &str) -> BackendResult<Value>;
    fn create_support_ticket(&self, subject: &str, details: &str) -> BackendResult<Value>;
    fn request_document_upload(&self) -> BackendResult<Value>;

    // Discovery.
    fn search_gigs(&self, query: &str) -> BackendResult<Vec<Value>>;
    fn search_jobs(&self, query: &str) -> BackendResult<Vec<Value>>;
    fn list_groups(&self) -> BackendResult<Vec<Value>>;
    fn join_group(&self, group_id: u64) -> BackendResult<Value>;
    fn create_group(&self, name: &str) -> BackendResult<Value>;
    fn search_users(&self, query: &str) -> BackendResult<Vec<Value>>;
}
