//! Append-only event journal for the conversational core.
//!
//! One JSON object per line under `events/journal.jsonl` in the workspace
//! root. Interactive paths treat journaling as best-effort: an append
//! failure never surfaces to the user.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config;

pub const JOURNAL_DIR: &str = "events";
pub const JOURNAL_FILE: &str = "journal.jsonl";

/// Lifecycle points the journal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IntentDetected,
    IntentExecuted,
    IntentFailed,
    MessageSent,
    SyncApplied,
    SyncBuffered,
    SyncFailed,
    SyncDiscarded,
    AssistantTriggered,
    AssistantReplied,
}

/// A single journaled record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub details: Value,
}

/// Handle on the journal file for one installation workspace.
#[derive(Debug, Clone)]
pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    /// Journal under the configured workspace root.
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(&config::workspace_root()?))
    }

    /// Journal under an explicit root (test harnesses point this at a
    /// temp directory).
    pub fn at(root: &Path) -> Self {
        Self {
            path: root.join(JOURNAL_DIR).join(JOURNAL_FILE),
        }
    }

    /// Records an event, returning its identity. Write failures are
    /// swallowed; the id is still valid for response formatting.
    pub fn record(&self, event_type: EventType, details: Value) -> Uuid {
        let event = ChatEvent {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            details,
        };
        let _ = self.append(&event);
        event.event_id
    }

    fn append(&self, event: &ChatEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open journal {:?}", self.path))?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Loads every journaled event (diagnostics and tests).
    pub fn load_all(&self) -> Result<Vec<ChatEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read journal {:?}", self.path))?;
        let mut events = Vec::new();
        for line in data.lines().filter(|line| !line.trim().is_empty()) {
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}
