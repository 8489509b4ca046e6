//! Core conversation and message data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a conversation is one-on-one or a group room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Direct,
    Group,
}

/// A user (or the assistant) taking part in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub is_assistant: bool,
}

impl Participant {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            participant_id: Uuid::new_v4(),
            display_name: display_name.into(),
            is_assistant: false,
        }
    }

    pub fn assistant(display_name: impl Into<String>) -> Self {
        Self {
            participant_id: Uuid::new_v4(),
            display_name: display_name.into(),
            is_assistant: true,
        }
    }
}

/// Group-only metadata carried by a conversation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub member_count: u32,
    #[serde(default)]
    pub admin_id: Option<Uuid>,
}

/// A conversation summary as reported by the backend, plus the two fields
/// mutated locally: the unread counter and the last-message preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: Uuid,
    pub display_name: String,
    pub kind: ConversationKind,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub group: Option<GroupInfo>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message_preview: Option<String>,
    /// Rendered locally only (the assistant's own room); never polled.
    #[serde(default)]
    pub synthetic: bool,
}

impl Conversation {
    pub fn direct(display_name: impl Into<String>) -> Self {
        Self {
            conversation_id: Uuid::new_v4(),
            display_name: display_name.into(),
            kind: ConversationKind::Direct,
            participants: Vec::new(),
            group: None,
            unread_count: 0,
            last_message_preview: None,
            synthetic: false,
        }
    }

    pub fn group(display_name: impl Into<String>, member_count: u32) -> Self {
        Self {
            conversation_id: Uuid::new_v4(),
            display_name: display_name.into(),
            kind: ConversationKind::Group,
            participants: Vec::new(),
            group: Some(GroupInfo {
                member_count,
                admin_id: None,
            }),
            unread_count: 0,
            last_message_preview: None,
            synthetic: false,
        }
    }
}

/// Kind of file attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

/// Descriptor for a message attachment; the bytes live behind `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
    pub name: String,
    pub size_bytes: u64,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }
}

/// A single chat message. Immutable once rendered, except for `read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub sender: Participant,
    pub body: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Identity of the message this one replies to, when any.
    #[serde(default)]
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    pub fn new(
        conversation_id: Uuid,
        sender: Participant,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            conversation_id,
            sender,
            body: body.into(),
            attachment: None,
            reply_to: None,
            created_at,
            read: false,
        }
    }

    /// Canonical ordering key: creation timestamp, ties broken by identity.
    pub fn ordering_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.message_id)
    }
}

/// Sorts messages into canonical timeline order. The backend is not trusted
/// to return sorted batches, so every fetched list goes through here.
pub fn sort_timeline(messages: &mut [Message]) {
    messages.sort_by_key(Message::ordering_key);
}

/// Which entity a field update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileEntity {
    Account,
    FreelancerProfile,
    ClientProfile,
}

impl ProfileEntity {
    pub fn label(&self) -> &'static str {
        match self {
            ProfileEntity::Account => "account",
            ProfileEntity::FreelancerProfile => "freelancer profile",
            ProfileEntity::ClientProfile => "client profile",
        }
    }
}

/// Marketplace-side role the user is currently acting as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Freelancer,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Freelancer => "freelancer",
            Role::Client => "client",
        }
    }
}

/// Order lifecycle states the chat surface can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Local mirror of the conversation-list summary. Replaced wholesale on each
/// poll; unread counters and previews are the only local mutations.
#[derive(Debug, Default)]
pub struct ConversationDirectory {
    conversations: Vec<Conversation>,
}

impl ConversationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a freshly fetched summary. Synthetic conversations already in
    /// the directory survive, since the backend does not know about them.
    pub fn apply_summary(&mut self, fetched: Vec<Conversation>) {
        let mut next: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|conversation| conversation.synthetic)
            .cloned()
            .collect();
        next.extend(fetched.into_iter().filter(|c| !c.synthetic));
        self.conversations = next;
    }

    pub fn insert(&mut self, conversation: Conversation) {
        self.conversations
            .retain(|existing| existing.conversation_id != conversation.conversation_id);
        self.conversations.push(conversation);
    }

    pub fn get(&self, conversation_id: Uuid) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.conversation_id == conversation_id)
    }

    pub fn mark_read(&mut self, conversation_id: Uuid) {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.conversation_id == conversation_id)
        {
            conversation.unread_count = 0;
        }
    }

    pub fn record_preview(&mut self, conversation_id: Uuid, preview: impl Into<String>) {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.conversation_id == conversation_id)
        {
            conversation.last_message_preview = Some(preview.into());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
