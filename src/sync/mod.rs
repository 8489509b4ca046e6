//! Message Stream Synchronizer: viewport classification, pending-message
//! buffering, and poll reconciliation for the open conversation.

pub mod buffer;
pub mod poller;
pub mod scroll;

pub use buffer::{FlushBatch, MessageBuffer, SeparatorRecord};
pub use poller::{FetchTicket, PollingSynchronizer, ScrollObservation, SyncOutcome};
pub use scroll::{ScrollMetrics, ScrollPositionTracker, ViewportState};
