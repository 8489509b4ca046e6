//! Autonomous-participation heuristic for group conversations.
//!
//! Per incoming non-assistant message: an explicit mention always triggers
//! a reply, a trigger keyword fires with high likelihood, and anything else
//! fires with a small ambient probability. Triggered replies are scheduled
//! after a randomized delay within configured bounds. Assistant-authored
//! messages never re-trigger, which is what keeps the assistant from
//! talking to itself.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ParticipationSettings;
use crate::models::Message;

/// Why the assistant decided to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Mentioned,
    Keyword,
    Ambient,
}

/// How the reply should be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseRoute {
    Text,
    ImageAnalysis,
}

/// A reply the assistant has committed to, due after its delay elapses.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledReply {
    pub conversation_id: Uuid,
    pub prompt_message_id: Uuid,
    pub trigger: TriggerKind,
    pub route: ResponseRoute,
    pub respond_at: DateTime<Utc>,
}

pub struct AiParticipationTrigger {
    settings: ParticipationSettings,
    rng: StdRng,
}

impl AiParticipationTrigger {
    pub fn new(settings: ParticipationSettings) -> Self {
        Self {
            settings,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic construction for tests: pin the RNG seed and the
    /// probabilities/delay bounds via the settings.
    pub fn with_rng(settings: ParticipationSettings, rng: StdRng) -> Self {
        Self { settings, rng }
    }

    /// Decides whether to respond to `message`. `replied_to` is the message
    /// it replies to, when the caller can resolve one; a reply referencing
    /// an image attachment routes through image analysis.
    pub fn evaluate(
        &mut self,
        message: &Message,
        replied_to: Option<&Message>,
        now: DateTime<Utc>,
    ) -> Option<ScheduledReply> {
        if message.sender.is_assistant {
            return None;
        }
        let lower = message.body.to_ascii_lowercase();
        let handle = self.settings.assistant_handle.to_ascii_lowercase();

        let trigger = if lower.contains(&format!("@{handle}")) || lower.contains(&handle) {
            TriggerKind::Mentioned
        } else if self.contains_keyword(&lower) {
            if !self.sample(self.settings.keyword_probability) {
                return None;
            }
            TriggerKind::Keyword
        } else {
            if !self.sample(self.settings.ambient_probability) {
                return None;
            }
            TriggerKind::Ambient
        };

        let has_image = message
            .attachment
            .as_ref()
            .map(|attachment| attachment.is_image())
            .unwrap_or(false)
            || replied_to
                .and_then(|parent| parent.attachment.as_ref())
                .map(|attachment| attachment.is_image())
                .unwrap_or(false);
        let route = if has_image {
            ResponseRoute::ImageAnalysis
        } else {
            ResponseRoute::Text
        };

        Some(ScheduledReply {
            conversation_id: message.conversation_id,
            prompt_message_id: message.message_id,
            trigger,
            route,
            respond_at: now + Duration::milliseconds(self.delay_ms() as i64),
        })
    }

    fn contains_keyword(&self, lower: &str) -> bool {
        self.settings
            .trigger_keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_ascii_lowercase()))
    }

    fn sample(&mut self, probability: f64) -> bool {
        let probability = probability.clamp(0.0, 1.0);
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen_bool(probability)
    }

    fn delay_ms(&mut self) -> u64 {
        let min = self.settings.min_response_delay_ms;
        let max = self.settings.max_response_delay_ms.max(min);
        if min == max {
            min
        } else {
            self.rng.gen_range(min..=max)
        }
    }
}
