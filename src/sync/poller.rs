//! Poll scheduling and reconciliation for the open conversation.
//!
//! The synchronizer is a deterministic state machine driven by explicit
//! calls carrying the current instant: `begin_poll` hands out a fetch
//! ticket when the interval is due, the caller performs the backend fetch,
//! and `complete_poll` applies the result. Tickets are tagged with the
//! conversation id and a generation counter captured at issue time, so a
//! completion that lands after a conversation switch or close is discarded
//! instead of mutating the wrong conversation's state.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::backend::{BackendError, BackendResult};
use crate::config::SyncSettings;
use crate::models::{sort_timeline, Conversation, Message};
use crate::sync::buffer::{FlushBatch, MessageBuffer};
use crate::sync::scroll::{ScrollMetrics, ScrollPositionTracker, ViewportState};

/// Tag carried by every in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub conversation_id: Uuid,
    pub generation: u64,
    pub issued_at: DateTime<Utc>,
}

/// What a completed poll did to the open view.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Length and tail identity matched the rendered list; nothing moved.
    Unchanged,
    /// Viewport was at the bottom; new messages joined the timeline.
    Rendered {
        appended: Vec<Message>,
        scroll_to_bottom: bool,
    },
    /// Viewport was scrolled up; new messages went to the buffer.
    Buffered { queued: Vec<Message>, unseen: u32 },
    /// The ticket no longer matches the open conversation.
    Discarded,
    /// The fetch failed; the next interval retries.
    Failed { error: BackendError },
}

/// Result of a scroll observation, including the merge performed when the
/// user returns to the bottom with messages pending.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollObservation {
    pub state: ViewportState,
    pub flushed: Option<FlushBatch>,
}

#[derive(Debug)]
struct OpenView {
    conversation_id: Uuid,
    synthetic: bool,
    timeline: Vec<Message>,
    buffer: MessageBuffer,
    scroll: ScrollPositionTracker,
    unseen: u32,
}

/// Keeps the rendered timeline of the open conversation consistent with the
/// polled backend state.
#[derive(Debug)]
pub struct PollingSynchronizer {
    interval: Duration,
    epsilon_px: f64,
    generation: u64,
    next_poll_at: Option<DateTime<Utc>>,
    view: Option<OpenView>,
}

impl PollingSynchronizer {
    pub fn new(settings: &SyncSettings) -> Self {
        Self {
            interval: Duration::milliseconds(settings.poll_interval_ms as i64),
            epsilon_px: settings.scroll_epsilon_px,
            generation: 0,
            next_poll_at: None,
            view: None,
        }
    }

    /// Opens a conversation: previous pending state is dropped, outstanding
    /// tickets are invalidated, and the viewport starts at the bottom.
    /// Synthetic conversations are rendered locally and never polled.
    pub fn open_conversation(&mut self, conversation: &Conversation, now: DateTime<Utc>) {
        self.generation += 1;
        self.view = Some(OpenView {
            conversation_id: conversation.conversation_id,
            synthetic: conversation.synthetic,
            timeline: Vec::new(),
            buffer: MessageBuffer::new(),
            scroll: ScrollPositionTracker::new(self.epsilon_px),
            unseen: 0,
        });
        self.next_poll_at = if conversation.synthetic {
            None
        } else {
            Some(now)
        };
    }

    /// Closes the view; outstanding tickets are invalidated and the
    /// schedule stops.
    pub fn close(&mut self) {
        self.generation += 1;
        self.view = None;
        self.next_poll_at = None;
    }

    pub fn open_conversation_id(&self) -> Option<Uuid> {
        self.view.as_ref().map(|view| view.conversation_id)
    }

    pub fn poll_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.next_poll_at, Some(due) if now >= due)
    }

    /// Issues a fetch ticket when the interval is due, advancing the
    /// schedule. The caller fetches and reports back via `complete_poll`.
    pub fn begin_poll(&mut self, now: DateTime<Utc>) -> Option<FetchTicket> {
        if !self.poll_due(now) {
            return None;
        }
        self.issue_ticket(now)
    }

    /// Manual refresh: issues a ticket immediately regardless of schedule.
    pub fn force_poll(&mut self, now: DateTime<Utc>) -> Option<FetchTicket> {
        self.view.as_ref()?;
        self.issue_ticket(now)
    }

    fn issue_ticket(&mut self, now: DateTime<Utc>) -> Option<FetchTicket> {
        let view = self.view.as_ref()?;
        if view.synthetic {
            return None;
        }
        self.next_poll_at = Some(now + self.interval);
        Some(FetchTicket {
            conversation_id: view.conversation_id,
            generation: self.generation,
            issued_at: now,
        })
    }

    /// Applies a fetch result. Stale tickets are discarded without touching
    /// state; failures are reported and the fixed interval retries.
    pub fn complete_poll(
        &mut self,
        ticket: &FetchTicket,
        result: BackendResult<Vec<Message>>,
        _now: DateTime<Utc>,
    ) -> SyncOutcome {
        let stale = ticket.generation != self.generation
            || self
                .view
                .as_ref()
                .map(|view| view.conversation_id != ticket.conversation_id)
                .unwrap_or(true);
        if stale {
            return SyncOutcome::Discarded;
        }
        let mut fetched = match result {
            Ok(messages) => messages,
            Err(error) => return SyncOutcome::Failed { error },
        };
        sort_timeline(&mut fetched);

        let view = match self.view.as_mut() {
            Some(view) => view,
            None => return SyncOutcome::Discarded,
        };

        let unchanged = fetched.len() == view.timeline.len()
            && fetched.last().map(|m| m.message_id)
                == view.timeline.last().map(|m| m.message_id);
        if unchanged {
            return SyncOutcome::Unchanged;
        }

        let rendered: HashSet<Uuid> = view
            .timeline
            .iter()
            .map(|message| message.message_id)
            .collect();
        let new_messages: Vec<Message> = fetched
            .iter()
            .filter(|message| !rendered.contains(&message.message_id))
            .cloned()
            .collect();

        match view.scroll.state() {
            ViewportState::AtBottom => {
                // Union-merge rather than replace: a locally appended send
                // may not have shown up in the backend list yet.
                let fetched_ids: HashSet<Uuid> =
                    fetched.iter().map(|message| message.message_id).collect();
                let mut merged = fetched;
                merged.extend(
                    view.timeline
                        .iter()
                        .filter(|message| !fetched_ids.contains(&message.message_id))
                        .cloned(),
                );
                sort_timeline(&mut merged);
                view.timeline = merged;
                SyncOutcome::Rendered {
                    appended: new_messages,
                    scroll_to_bottom: true,
                }
            }
            ViewportState::ScrolledUp => {
                let mut queued = Vec::new();
                for message in new_messages {
                    if view.buffer.offer(message.clone()) {
                        queued.push(message);
                    }
                }
                view.unseen += queued.len() as u32;
                SyncOutcome::Buffered {
                    queued,
                    unseen: view.unseen,
                }
            }
        }
    }

    /// Reclassifies the viewport from fresh metrics. Returning to the
    /// bottom with messages pending merges them, keeping the buffer's
    /// only-while-scrolled-up invariant.
    pub fn observe_scroll(
        &mut self,
        metrics: ScrollMetrics,
        now: DateTime<Utc>,
    ) -> Option<ScrollObservation> {
        let view = self.view.as_mut()?;
        let state = view.scroll.observe(metrics);
        let flushed = if state == ViewportState::AtBottom {
            Self::merge_pending(view, now)
        } else {
            None
        };
        Some(ScrollObservation { state, flushed })
    }

    /// Explicit flush (the "new messages" affordance): merges pending
    /// messages into the timeline and pins the view to the bottom.
    pub fn flush_pending(&mut self, now: DateTime<Utc>) -> Option<FlushBatch> {
        let view = self.view.as_mut()?;
        let batch = Self::merge_pending(view, now)?;
        view.scroll.pin_to_bottom();
        Some(batch)
    }

    fn merge_pending(view: &mut OpenView, now: DateTime<Utc>) -> Option<FlushBatch> {
        let batch = view.buffer.flush(now)?;
        view.timeline.extend(batch.messages.iter().cloned());
        sort_timeline(&mut view.timeline);
        view.unseen = 0;
        Some(batch)
    }

    /// Appends a message produced locally (own send, assistant reply) and
    /// pins the view to the bottom.
    pub fn append_local(&mut self, message: Message) {
        if let Some(view) = self.view.as_mut() {
            if view
                .timeline
                .iter()
                .all(|existing| existing.message_id != message.message_id)
            {
                view.timeline.push(message);
                sort_timeline(&mut view.timeline);
            }
            view.scroll.pin_to_bottom();
        }
    }

    pub fn timeline(&self) -> &[Message] {
        self.view
            .as_ref()
            .map(|view| view.timeline.as_slice())
            .unwrap_or(&[])
    }

    pub fn viewport(&self) -> Option<ViewportState> {
        self.view.as_ref().map(|view| view.scroll.state())
    }

    pub fn unseen_count(&self) -> u32 {
        self.view.as_ref().map(|view| view.unseen).unwrap_or(0)
    }

    pub fn pending_count(&self) -> usize {
        self.view.as_ref().map(|view| view.buffer.len()).unwrap_or(0)
    }
}
