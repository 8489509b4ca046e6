//! Viewport classification for the message list.

use serde::{Deserialize, Serialize};

/// Two-state classification of the message viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportState {
    AtBottom,
    ScrolledUp,
}

/// Raw scroll measurements reported by the host view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Distance in pixels between the viewport bottom and the content end.
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }
}

/// Classifies scroll metrics and remembers the last classification.
///
/// Recomputed on every scroll event; a conversation open resets to
/// `AtBottom`. Classification has no side effects — rendering decisions
/// belong to the synchronizer.
#[derive(Debug, Clone)]
pub struct ScrollPositionTracker {
    epsilon_px: f64,
    state: ViewportState,
}

impl ScrollPositionTracker {
    pub fn new(epsilon_px: f64) -> Self {
        Self {
            epsilon_px,
            state: ViewportState::AtBottom,
        }
    }

    /// Updates the classification from fresh metrics.
    pub fn observe(&mut self, metrics: ScrollMetrics) -> ViewportState {
        self.state = if metrics.distance_from_bottom() <= self.epsilon_px {
            ViewportState::AtBottom
        } else {
            ViewportState::ScrolledUp
        };
        self.state
    }

    /// Explicit conversation open: the view starts pinned to the bottom.
    pub fn reset(&mut self) {
        self.state = ViewportState::AtBottom;
    }

    /// The view jumped to the bottom programmatically (flush, send).
    pub fn pin_to_bottom(&mut self) {
        self.state = ViewportState::AtBottom;
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }
}
