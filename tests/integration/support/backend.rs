//! In-memory recording backend for session-level tests.
//!
//! Records every call (with the arguments that matter for assertions) and
//! supports scripted one-shot failures per operation.

use chrono::Utc;
use gigchat::backend::{BackendError, BackendResult, MarketplaceBackend, MessageDraft};
use gigchat::models::{Conversation, Message, Participant};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use uuid::Uuid;

struct State {
    user: Participant,
    conversations: Vec<Conversation>,
    messages: HashMap<Uuid, Vec<Message>>,
    orders: Vec<Value>,
    gigs: Vec<Value>,
    jobs: Vec<Value>,
    groups: Vec<Value>,
    users: Vec<Value>,
    notifications: Vec<Value>,
    calls: Vec<String>,
    fail_once: HashMap<String, BackendError>,
}

#[derive(Clone)]
pub struct RecordingBackend {
    state: Rc<RefCell<State>>,
}

impl RecordingBackend {
    pub fn new(user: Participant) -> Self {
        let state = State {
            user,
            conversations: Vec::new(),
            messages: HashMap::new(),
            orders: Vec::new(),
            gigs: Vec::new(),
            jobs: Vec::new(),
            groups: Vec::new(),
            users: Vec::new(),
            notifications: Vec::new(),
            calls: Vec::new(),
            fail_once: HashMap::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn seed_conversation(&self, conversation: Conversation) {
        self.state.borrow_mut().conversations.push(conversation);
    }

    pub fn seed_message(&self, message: Message) {
        self.state
            .borrow_mut()
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message);
    }

    pub fn seed_orders(&self, orders: Vec<Value>) {
        self.state.borrow_mut().orders = orders;
    }

    pub fn seed_gigs(&self, gigs: Vec<Value>) {
        self.state.borrow_mut().gigs = gigs;
    }

    pub fn seed_groups(&self, groups: Vec<Value>) {
        self.state.borrow_mut().groups = groups;
    }

    /// The named operation fails exactly once with the given error.
    pub fn fail_once(&self, op: &str, error: BackendError) {
        self.state.borrow_mut().fail_once.insert(op.into(), error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    fn guard(&self, call: String, op: &str) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        match state.fail_once.remove(op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn field_names(fields: &Map<String, Value>) -> String {
        fields.keys().cloned().collect::<Vec<_>>().join(",")
    }
}

impl MarketplaceBackend for RecordingBackend {
    fn list_conversations(&self) -> BackendResult<Vec<Conversation>> {
        self.guard("list_conversations".into(), "list_conversations")?;
        Ok(self.state.borrow().conversations.clone())
    }

    fn list_messages(&self, conversation_id: Uuid) -> BackendResult<Vec<Message>> {
        self.guard(format!("list_messages:{conversation_id}"), "list_messages")?;
        Ok(self
            .state
            .borrow()
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    fn create_message(&self, conversation_id: Uuid, draft: MessageDraft) -> BackendResult<Message> {
        self.guard(format!("create_message:{conversation_id}"), "create_message")?;
        let mut state = self.state.borrow_mut();
        let mut message = Message::new(conversation_id, state.user.clone(), draft.body, Utc::now());
        message.attachment = draft.attachment;
        message.reply_to = draft.reply_to;
        state
            .messages
            .entry(conversation_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    fn start_direct_conversation(&self, handle: &str) -> BackendResult<Conversation> {
        self.guard(
            format!("start_direct_conversation:{handle}"),
            "start_direct_conversation",
        )?;
        let conversation = Conversation::direct(handle);
        self.state
            .borrow_mut()
            .conversations
            .push(conversation.clone());
        Ok(conversation)
    }

    fn switch_role(&self, role: &str) -> BackendResult<Value> {
        self.guard(format!("switch_role:{role}"), "switch_role")?;
        Ok(json!({ "role": role }))
    }

    fn update_account(&self, fields: &Map<String, Value>) -> BackendResult<Value> {
        self.guard(
            format!("update_account:{}", Self::field_names(fields)),
            "update_account",
        )?;
        Ok(json!({ "updated": fields.len() }))
    }

    fn create_freelancer_profile(&self) -> BackendResult<Value> {
        self.guard(
            "create_freelancer_profile".into(),
            "create_freelancer_profile",
        )?;
        Ok(json!({ "created": true }))
    }

    fn update_freelancer_profile(&self, fields: &Map<String, Value>) -> BackendResult<Value> {
        self.guard(
            format!("update_freelancer_profile:{}", Self::field_names(fields)),
            "update_freelancer_profile",
        )?;
        Ok(json!({ "updated": fields.len() }))
    }

    fn create_client_profile(&self) -> BackendResult<Value> {
        self.guard("create_client_profile".into(), "create_client_profile")?;
        Ok(json!({ "created": true }))
    }

    fn update_client_profile(&self, fields: &Map<String, Value>) -> BackendResult<Value> {
        self.guard(
            format!("update_client_profile:{}", Self::field_names(fields)),
            "update_client_profile",
        )?;
        Ok(json!({ "updated": fields.len() }))
    }

    fn set_profile_published(&self, profile: &str, published: bool) -> BackendResult<Value> {
        self.guard(
            format!("set_profile_published:{profile}:{published}"),
            "set_profile_published",
        )?;
        Ok(json!({ "published": published }))
    }

    fn list_orders(&self) -> BackendResult<Vec<Value>> {
        self.guard("list_orders".into(), "list_orders")?;
        Ok(self.state.borrow().orders.clone())
    }

    fn update_order_status(&self, order_id: u64, status: &str) -> BackendResult<Value> {
        self.guard(
            format!("update_order_status:{order_id}:{status}"),
            "update_order_status",
        )?;
        Ok(json!({ "id": order_id, "status": status }))
    }

    fn release_escrow(&self, order_id: u64) -> BackendResult<Value> {
        self.guard(format!("release_escrow:{order_id}"), "release_escrow")?;
        Ok(json!({ "id": order_id, "released": true }))
    }

    fn create_review(
        &self,
        order_id: u64,
        rating: u8,
        _comment: Option<&str>,
    ) -> BackendResult<Value> {
        self.guard(
            format!("create_review:{order_id}:{rating}"),
            "create_review",
        )?;
        Ok(json!({ "id": order_id, "rating": rating }))
    }

    fn list_notifications(&self) -> BackendResult<Vec<Value>> {
        self.guard("list_notifications".into(), "list_notifications")?;
        Ok(self.state.borrow().notifications.clone())
    }

    fn mark_notifications_read(&self) -> BackendResult<Value> {
        self.guard(
            "mark_notifications_read".into(),
            "mark_notifications_read",
        )?;
        Ok(json!({ "ok": true }))
    }

    fn set_notifications_muted(&self, muted: bool) -> BackendResult<Value> {
        self.guard(
            format!("set_notifications_muted:{muted}"),
            "set_notifications_muted",
        )?;
        Ok(json!({ "muted": muted }))
    }

    fn create_report(&self, subject: &str, _details: &str) -> BackendResult<Value> {
        self.guard(format!("create_report:{subject}"), "create_report")?;
        Ok(json!({ "ok": true }))
    }

    fn create_support_ticket(&self, subject: &str, _details: &str) -> BackendResult<Value> {
        self.guard(
            format!("create_support_ticket:{subject}"),
            "create_support_ticket",
        )?;
        Ok(json!({ "ok": true }))
    }

    fn request_document_upload(&self) -> BackendResult<Value> {
        self.guard(
            "request_document_upload".into(),
            "request_document_upload",
        )?;
        Ok(json!({ "ok": true }))
    }

    fn search_gigs(&self, query: &str) -> BackendResult<Vec<Value>> {
        self.guard(format!("search_gigs:{query}"), "search_gigs")?;
        Ok(self.state.borrow().gigs.clone())
    }

    fn search_jobs(&self, query: &str) -> BackendResult<Vec<Value>> {
        self.guard(format!("search_jobs:{query}"), "search_jobs")?;
        Ok(self.state.borrow().jobs.clone())
    }

    fn list_groups(&self) -> BackendResult<Vec<Value>> {
        self.guard("list_groups".into(), "list_groups")?;
        Ok(self.state.borrow().groups.clone())
    }

    fn join_group(&self, group_id: u64) -> BackendResult<Value> {
        self.guard(format!("join_group:{group_id}"), "join_group")?;
        Ok(json!({ "id": group_id }))
    }

    fn create_group(&self, name: &str) -> BackendResult<Value> {
        self.guard(format!("create_group:{name}"), "create_group")?;
        Ok(json!({ "id": 99, "name": name }))
    }

    fn search_users(&self, query: &str) -> BackendResult<Vec<Value>> {
        self.guard(format!("search_users:{query}"), "search_users")?;
        Ok(self.state.borrow().users.clone())
    }
}
