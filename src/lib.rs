pub mod backend;
pub mod chat;
pub mod config;
pub mod events;
pub mod models;
pub mod sync;

// Re-export commonly used types for convenience.
pub use backend::{BackendError, BackendResult, MarketplaceBackend, MessageDraft};
pub use chat::{ChatSession, ClassifiedIntent, IntentClassifier};
pub use config::AppConfig;
pub use models::{Conversation, ConversationKind, Message, Participant};
pub use sync::{MessageBuffer, PollingSynchronizer, ScrollPositionTracker, ViewportState};
