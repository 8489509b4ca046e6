//! Intent definitions for the chat command router.

pub mod classifier;
pub mod dispatcher;
pub mod fallback;
pub mod fields;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OrderStatus, ProfileEntity, Role};
pub use fields::{FieldMapper, FieldUpdate};

/// Structured result of classifying one free-text input line.
///
/// Classification is exhaustive first-match over an ordered rule table, not
/// probabilistic; there is no confidence score. Constructed transiently per
/// line and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedIntent {
    SwitchRole { role: Role },
    SetProfilePublished { entity: ProfileEntity, published: bool },
    UpdateFields { updates: Vec<FieldUpdate> },
    ListOrders,
    UpdateOrderStatus { order_id: u64, status: OrderStatus },
    ReleaseEscrow { order_id: u64 },
    SubmitRating { order_id: u64, rating: u8 },
    ListNotifications,
    SetNotificationsMuted { muted: bool },
    FileReport { subject: String },
    OpenSupportTicket { subject: String },
    RequestDocumentUpload,
    SearchGigs { query: String },
    SearchJobs { query: String },
    DiscoverGroups,
    JoinGroup { group_id: u64 },
    CreateGroup { name: String },
    SearchUsers { query: String },
    StartDirectConversation { handle: String },
    /// The rule shape matched but a required parameter is missing; the
    /// caller should surface the named follow-up form instead of guessing.
    Clarify { form: FollowUpForm },
    Unhandled,
}

impl ClassifiedIntent {
    /// Stable action name used in journal entries and response formatting.
    pub fn action_name(&self) -> &'static str {
        match self {
            ClassifiedIntent::SwitchRole { .. } => "roles.switch",
            ClassifiedIntent::SetProfilePublished { .. } => "profiles.publish",
            ClassifiedIntent::UpdateFields { .. } => "profiles.update_fields",
            ClassifiedIntent::ListOrders => "orders.list",
            ClassifiedIntent::UpdateOrderStatus { .. } => "orders.update_status",
            ClassifiedIntent::ReleaseEscrow { .. } => "orders.release_escrow",
            ClassifiedIntent::SubmitRating { .. } => "orders.submit_rating",
            ClassifiedIntent::ListNotifications => "notifications.list",
            ClassifiedIntent::SetNotificationsMuted { .. } => "notifications.mute",
            ClassifiedIntent::FileReport { .. } => "reports.create",
            ClassifiedIntent::OpenSupportTicket { .. } => "support.create_ticket",
            ClassifiedIntent::RequestDocumentUpload => "documents.request_upload",
            ClassifiedIntent::SearchGigs { .. } => "search.gigs",
            ClassifiedIntent::SearchJobs { .. } => "search.jobs",
            ClassifiedIntent::DiscoverGroups => "groups.discover",
            ClassifiedIntent::JoinGroup { .. } => "groups.join",
            ClassifiedIntent::CreateGroup { .. } => "groups.create",
            ClassifiedIntent::SearchUsers { .. } => "users.search",
            ClassifiedIntent::StartDirectConversation { .. } => "conversations.start_direct",
            ClassifiedIntent::Clarify { .. } => "clarify",
            ClassifiedIntent::Unhandled => "unhandled",
        }
    }
}

/// Follow-up form suggested when a rule matched without its required
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpForm {
    RolePicker,
    ProfileFields,
    OrderStatus,
    EscrowRelease,
    Rating,
    GroupJoin,
    GroupCreate,
    Report,
    DirectMessage,
    Search,
}

impl FollowUpForm {
    pub fn form_id(&self) -> &'static str {
        match self {
            FollowUpForm::RolePicker => "form.role_picker",
            FollowUpForm::ProfileFields => "form.profile_fields",
            FollowUpForm::OrderStatus => "form.order_status",
            FollowUpForm::EscrowRelease => "form.escrow_release",
            FollowUpForm::Rating => "form.rating",
            FollowUpForm::GroupJoin => "form.group_join",
            FollowUpForm::GroupCreate => "form.group_create",
            FollowUpForm::Report => "form.report",
            FollowUpForm::DirectMessage => "form.direct_message",
            FollowUpForm::Search => "form.search",
        }
    }

    /// Clarification question shown instead of a guessed dispatch.
    pub fn prompt(&self) -> &'static str {
        match self {
            FollowUpForm::RolePicker => {
                "Which role should I switch you to — freelancer or client?"
            }
            FollowUpForm::ProfileFields => {
                "Which field should I update, and to what value? For example: `set hourly rate to 50`."
            }
            FollowUpForm::OrderStatus => {
                "Which order is this about? Include the order number, e.g. `update order #482 to delivered`."
            }
            FollowUpForm::EscrowRelease => {
                "Which order's escrow should I release? Include the order number."
            }
            FollowUpForm::Rating => {
                "I need the order number and a star rating, e.g. `rate order 12, 5 stars`."
            }
            FollowUpForm::GroupJoin => "Which group should I join? Include the group number.",
            FollowUpForm::GroupCreate => {
                "What should the new group be called? Try `create a group called ...`."
            }
            FollowUpForm::Report => "Who or what are you reporting? Add a short description.",
            FollowUpForm::DirectMessage => "Who should I start the conversation with?",
            FollowUpForm::Search => "What should I search for?",
        }
    }

    pub fn card_label(&self) -> &'static str {
        match self {
            FollowUpForm::RolePicker => "Pick a role",
            FollowUpForm::ProfileFields => "Edit profile fields",
            FollowUpForm::OrderStatus => "Choose an order",
            FollowUpForm::EscrowRelease => "Choose an order",
            FollowUpForm::Rating => "Leave a rating",
            FollowUpForm::GroupJoin => "Browse groups",
            FollowUpForm::GroupCreate => "Create a group",
            FollowUpForm::Report => "File a report",
            FollowUpForm::DirectMessage => "Find people",
            FollowUpForm::Search => "Open search",
        }
    }
}

/// Response prefix helpers shared by the dispatcher.
pub fn format_intent_success(action: &str, event_id: &Uuid, details: &str) -> String {
    format!("[OK] {action} completed (event {event_id}). {details}")
}

pub fn format_intent_failure(action: &str, event_id: &Uuid, reason: &str) -> String {
    format!("[ERR] {action} failed (event {event_id}): {reason}")
}
