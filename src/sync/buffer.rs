//! Holding queue for messages that arrive while the user is scrolled up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(test)]
use uuid::Uuid;

use crate::models::{sort_timeline, Message};

/// Synthetic record rendered between the old timeline and a flushed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparatorRecord {
    pub label: String,
    pub message_count: usize,
    pub inserted_at: DateTime<Utc>,
}

/// Result of a flush: the separator followed by the queued messages in
/// canonical order. Merging this into the timeline restores total ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushBatch {
    pub separator: SeparatorRecord,
    pub messages: Vec<Message>,
}

/// Ordered queue of messages not yet merged into the rendered timeline.
///
/// Scoped to the open conversation; cleared on conversation switch. A pure,
/// always-succeeding structure — no failure semantics.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    pending: Vec<Message>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message unless one with the same identity is already
    /// pending. Idempotent under retransmission.
    pub fn offer(&mut self, message: Message) -> bool {
        if self
            .pending
            .iter()
            .any(|pending| pending.message_id == message.message_id)
        {
            return false;
        }
        self.pending.push(message);
        true
    }

    /// Returns the pending messages in timestamp order behind a synthetic
    /// separator, emptying the queue. `None` when nothing is pending.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<FlushBatch> {
        if self.pending.is_empty() {
            return None;
        }
        let mut messages = std::mem::take(&mut self.pending);
        sort_timeline(&mut messages);
        let separator = SeparatorRecord {
            label: if messages.len() == 1 {
                "1 new message".into()
            } else {
                format!("{} new messages", messages.len())
            },
            message_count: messages.len(),
            inserted_at: now,
        };
        Some(FlushBatch {
            separator,
            messages,
        })
    }

    /// Drops all pending messages without merging (conversation switch).
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
