//! Session facade wiring the classifier, dispatcher, synchronizer, and
//! participation trigger around one backend connection.
//!
//! All shared state (current user, open conversation, pending assistant
//! replies) lives here and is passed explicitly into the components; none
//! of them read ambient globals.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use uuid::Uuid;

use crate::backend::{MarketplaceBackend, MessageDraft};
use crate::chat::intents::classifier::IntentClassifier;
use crate::chat::intents::dispatcher::{ActionDispatcher, DispatchReply};
use crate::chat::intents::{fallback, format_intent_failure, ClassifiedIntent};
use crate::chat::participation::{AiParticipationTrigger, ResponseRoute, ScheduledReply};
use crate::config::AppConfig;
use crate::events::{EventJournal, EventType};
use crate::models::{
    ConversationDirectory, ConversationKind, Message, Participant,
};
use crate::sync::buffer::FlushBatch;
use crate::sync::poller::{FetchTicket, PollingSynchronizer, SyncOutcome};
use crate::sync::scroll::{ScrollMetrics, ViewportState};
use crate::sync::ScrollObservation;

pub struct ChatSession<B: MarketplaceBackend> {
    backend: B,
    config: AppConfig,
    journal: EventJournal,
    classifier: IntentClassifier,
    dispatcher: ActionDispatcher,
    synchronizer: PollingSynchronizer,
    directory: ConversationDirectory,
    trigger: AiParticipationTrigger,
    pending_replies: Vec<ScheduledReply>,
    current_user: Participant,
    assistant: Participant,
    typing_until: Option<DateTime<Utc>>,
}

impl<B: MarketplaceBackend> ChatSession<B> {
    pub fn new(backend: B, config: AppConfig, current_user: Participant) -> Result<Self> {
        Self::with_rng(backend, config, current_user, StdRng::from_entropy())
    }

    /// Deterministic construction for tests: seed the participation RNG.
    pub fn with_rng(
        backend: B,
        config: AppConfig,
        current_user: Participant,
        rng: StdRng,
    ) -> Result<Self> {
        let journal = EventJournal::open_default()?;
        let synchronizer = PollingSynchronizer::new(&config.sync);
        let trigger = AiParticipationTrigger::with_rng(config.participation.clone(), rng);
        let assistant = Participant::assistant(config.participation.assistant_handle.clone());
        Ok(Self {
            backend,
            config,
            journal,
            classifier: IntentClassifier::new(),
            dispatcher: ActionDispatcher::new(),
            synchronizer,
            directory: ConversationDirectory::new(),
            trigger,
            pending_replies: Vec::new(),
            current_user,
            assistant,
            typing_until: None,
        })
    }

    /// Pulls the conversation-list summary outside the poll cycle (initial
    /// load). Failures are journaled and skipped.
    pub fn refresh_directory(&mut self) {
        match self.backend.list_conversations() {
            Ok(list) => self.directory.apply_summary(list),
            Err(error) => {
                self.journal.record(
                    EventType::SyncFailed,
                    json!({ "scope": "conversations", "reason": error.to_string() }),
                );
            }
        }
    }

    /// Registers a locally rendered conversation (the assistant's own room).
    pub fn register_conversation(&mut self, conversation: crate::models::Conversation) {
        self.directory.insert(conversation);
    }

    /// Opens a conversation: pending state from the previous one is dropped
    /// and its in-flight fetches/timers are invalidated.
    pub fn open_conversation(&mut self, conversation_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let conversation = self
            .directory
            .get(conversation_id)
            .cloned()
            .context("Unknown conversation")?;
        self.pending_replies
            .retain(|reply| reply.conversation_id == conversation_id);
        self.typing_until = None;
        self.synchronizer.open_conversation(&conversation, now);
        self.directory.mark_read(conversation_id);
        Ok(())
    }

    /// Unmount: cancels the poll schedule and any pending assistant timers.
    pub fn close(&mut self) {
        self.synchronizer.close();
        self.pending_replies.clear();
        self.typing_until = None;
    }

    /// Interval tick. Returns `None` while no poll is due.
    pub fn poll_tick(&mut self, now: DateTime<Utc>) -> Option<SyncOutcome> {
        let ticket = self.synchronizer.begin_poll(now)?;
        Some(self.run_poll(ticket, now))
    }

    /// User-triggered manual refresh; ignores the interval schedule.
    pub fn force_refresh(&mut self, now: DateTime<Utc>) -> Option<SyncOutcome> {
        let ticket = self.synchronizer.force_poll(now)?;
        Some(self.run_poll(ticket, now))
    }

    fn run_poll(&mut self, ticket: FetchTicket, now: DateTime<Utc>) -> SyncOutcome {
        match self.backend.list_conversations() {
            Ok(list) => self.directory.apply_summary(list),
            Err(error) => {
                self.journal.record(
                    EventType::SyncFailed,
                    json!({ "scope": "conversations", "reason": error.to_string() }),
                );
            }
        }
        // History present before the room opened must not replay into the
        // participation trigger.
        let initial_load = self.synchronizer.timeline().is_empty();
        let result = self.backend.list_messages(ticket.conversation_id);
        let outcome = self.synchronizer.complete_poll(&ticket, result, now);
        match &outcome {
            SyncOutcome::Rendered { appended, .. } => {
                self.journal.record(
                    EventType::SyncApplied,
                    json!({
                        "conversation_id": ticket.conversation_id,
                        "appended": appended.len()
                    }),
                );
                if !initial_load {
                    self.consider_participation(appended.clone(), now);
                }
            }
            SyncOutcome::Buffered { queued, unseen } => {
                self.journal.record(
                    EventType::SyncBuffered,
                    json!({
                        "conversation_id": ticket.conversation_id,
                        "queued": queued.len(),
                        "unseen": unseen
                    }),
                );
                if !initial_load {
                    self.consider_participation(queued.clone(), now);
                }
            }
            SyncOutcome::Failed { error } => {
                self.journal.record(
                    EventType::SyncFailed,
                    json!({
                        "conversation_id": ticket.conversation_id,
                        "reason": error.to_string()
                    }),
                );
            }
            SyncOutcome::Discarded => {
                self.journal.record(
                    EventType::SyncDiscarded,
                    json!({ "conversation_id": ticket.conversation_id }),
                );
            }
            SyncOutcome::Unchanged => {}
        }
        outcome
    }

    /// Evaluates incoming group messages for autonomous participation.
    fn consider_participation(&mut self, messages: Vec<Message>, now: DateTime<Utc>) {
        let Some(open_id) = self.synchronizer.open_conversation_id() else {
            return;
        };
        let is_group = self
            .directory
            .get(open_id)
            .map(|conversation| conversation.kind == ConversationKind::Group)
            .unwrap_or(false);
        if !is_group {
            return;
        }
        for message in messages {
            // Own messages are evaluated at send time, not on echo-back.
            if message.sender.participant_id == self.current_user.participant_id {
                continue;
            }
            let replied_to = message.reply_to.and_then(|parent_id| {
                self.synchronizer
                    .timeline()
                    .iter()
                    .find(|candidate| candidate.message_id == parent_id)
                    .cloned()
            });
            if let Some(reply) = self.trigger.evaluate(&message, replied_to.as_ref(), now) {
                self.journal.record(
                    EventType::AssistantTriggered,
                    json!({
                        "trigger": reply.trigger,
                        "message_id": message.message_id,
                        "conversation_id": message.conversation_id
                    }),
                );
                self.pending_replies.push(reply);
            }
        }
    }

    /// Processes a line the user typed: posts it, dispatches command
    /// intents, and routes non-command text to the conversational fallback
    /// (gated by the participation trigger in groups).
    pub fn handle_input(&mut self, text: &str, now: DateTime<Utc>) -> Result<Vec<DispatchReply>> {
        let open_id = self
            .synchronizer
            .open_conversation_id()
            .context("No conversation is open")?;

        let sent = match self.backend.create_message(open_id, MessageDraft::text(text)) {
            Ok(message) => {
                self.journal.record(
                    EventType::MessageSent,
                    json!({ "conversation_id": open_id, "message_id": message.message_id }),
                );
                self.directory.record_preview(open_id, preview_of(text));
                self.synchronizer.append_local(message.clone());
                message
            }
            Err(error) => {
                let event_id = self.journal.record(
                    EventType::IntentFailed,
                    json!({ "action": "messages.create", "reason": error.to_string() }),
                );
                return Ok(vec![DispatchReply::text(format_intent_failure(
                    "messages.create",
                    &event_id,
                    &error.to_string(),
                ))]);
            }
        };

        let intent = self.classifier.classify(text);
        if matches!(intent, ClassifiedIntent::Unhandled) {
            let is_group = self
                .directory
                .get(open_id)
                .map(|conversation| conversation.kind == ConversationKind::Group)
                .unwrap_or(false);
            if is_group {
                if let Some(reply) = self.trigger.evaluate(&sent, None, now) {
                    self.journal.record(
                        EventType::AssistantTriggered,
                        json!({ "trigger": reply.trigger, "message_id": sent.message_id }),
                    );
                    self.pending_replies.push(reply);
                }
                return Ok(Vec::new());
            }
            let reply_text = fallback::conversational_reply(text);
            self.post_assistant_message(open_id, &reply_text, now);
            return Ok(vec![DispatchReply::text(reply_text)]);
        }

        let reply = self.dispatcher.dispatch(&self.backend, &self.journal, &intent);
        self.post_assistant_message(open_id, &reply.text, now);
        Ok(vec![reply])
    }

    /// Plain send path (attachments, replies) without command routing.
    pub fn send_message(&mut self, draft: MessageDraft) -> Result<Message> {
        let open_id = self
            .synchronizer
            .open_conversation_id()
            .context("No conversation is open")?;
        let message = self
            .backend
            .create_message(open_id, draft)
            .map_err(anyhow::Error::from)?;
        self.journal.record(
            EventType::MessageSent,
            json!({ "conversation_id": open_id, "message_id": message.message_id }),
        );
        self.directory.record_preview(open_id, preview_of(&message.body));
        self.synchronizer.append_local(message.clone());
        Ok(message)
    }

    /// Emits assistant replies whose randomized delay has elapsed. Replies
    /// scheduled for a conversation that is no longer open are dropped.
    pub fn drain_due_replies(&mut self, now: DateTime<Utc>) -> Vec<Message> {
        let open_id = match self.synchronizer.open_conversation_id() {
            Some(id) => id,
            None => {
                self.pending_replies.clear();
                return Vec::new();
            }
        };
        self.pending_replies
            .retain(|reply| reply.conversation_id == open_id);
        let (due, remaining): (Vec<ScheduledReply>, Vec<ScheduledReply>) =
            std::mem::take(&mut self.pending_replies)
                .into_iter()
                .partition(|reply| reply.respond_at <= now);
        self.pending_replies = remaining;

        let mut posted = Vec::new();
        for reply in due {
            let body = match reply.route {
                ResponseRoute::ImageAnalysis => {
                    let name = self.prompt_attachment_name(reply.prompt_message_id);
                    fallback::image_analysis_reply(name.as_deref())
                }
                ResponseRoute::Text => {
                    let prompt = self
                        .find_message(reply.prompt_message_id)
                        .map(|message| message.body.clone())
                        .unwrap_or_default();
                    fallback::conversational_reply(&prompt)
                }
            };
            posted.push(self.post_assistant_message(open_id, &body, now));
        }
        posted
    }

    fn find_message(&self, message_id: Uuid) -> Option<&Message> {
        self.synchronizer
            .timeline()
            .iter()
            .find(|message| message.message_id == message_id)
    }

    /// Name of the image the prompt carries, following one reply hop.
    fn prompt_attachment_name(&self, prompt_id: Uuid) -> Option<String> {
        let prompt = self.find_message(prompt_id)?;
        if let Some(attachment) = &prompt.attachment {
            return Some(attachment.name.clone());
        }
        let parent = prompt.reply_to.and_then(|id| self.find_message(id))?;
        parent.attachment.as_ref().map(|a| a.name.clone())
    }

    fn post_assistant_message(
        &mut self,
        conversation_id: Uuid,
        body: &str,
        now: DateTime<Utc>,
    ) -> Message {
        // A reply sorts after the prompt even when the backend stamped the
        // prompt a moment later than the caller's clock.
        let created_at = match self.synchronizer.timeline().last() {
            Some(last) if last.created_at >= now => {
                last.created_at + Duration::milliseconds(1)
            }
            _ => now,
        };
        let mut message = Message::new(conversation_id, self.assistant.clone(), body, created_at);
        message.read = true;
        self.synchronizer.append_local(message.clone());
        self.directory.record_preview(conversation_id, preview_of(body));
        self.journal.record(
            EventType::AssistantReplied,
            json!({ "conversation_id": conversation_id, "message_id": message.message_id }),
        );
        message
    }

    // ---- viewport plumbing ----

    pub fn observe_scroll(
        &mut self,
        metrics: ScrollMetrics,
        now: DateTime<Utc>,
    ) -> Option<ScrollObservation> {
        self.synchronizer.observe_scroll(metrics, now)
    }

    /// The "N new messages" affordance.
    pub fn flush_new_messages(&mut self, now: DateTime<Utc>) -> Option<FlushBatch> {
        self.synchronizer.flush_pending(now)
    }

    // ---- typing indicator ----

    pub fn note_typing(&mut self, now: DateTime<Utc>) {
        let timeout = Duration::milliseconds(self.config.sync.typing_indicator_timeout_ms as i64);
        self.typing_until = Some(now + timeout);
    }

    pub fn typing_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.typing_until, Some(until) if now < until)
    }

    // ---- accessors ----

    pub fn timeline(&self) -> &[Message] {
        self.synchronizer.timeline()
    }

    pub fn viewport(&self) -> Option<ViewportState> {
        self.synchronizer.viewport()
    }

    pub fn unseen_count(&self) -> u32 {
        self.synchronizer.unseen_count()
    }

    pub fn directory(&self) -> &ConversationDirectory {
        &self.directory
    }

    pub fn pending_reply_count(&self) -> usize {
        self.pending_replies.len()
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn current_user(&self) -> &Participant {
        &self.current_user
    }
}

fn preview_of(text: &str) -> String {
    const MAX_CHARS: usize = 80;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_string()
    } else {
        let mut preview: String = trimmed.chars().take(MAX_CHARS).collect();
        preview.push('…');
        preview
    }
}
