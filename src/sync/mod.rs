//! Synchronization pipeline between Chronik and the alias engine.
//!
//! The pipeline has two phases. Backfill pages through the full transaction
//! history of the fee-collection script, oldest first, and replays every
//! transaction into the engine. Follow then holds a WebSocket subscription on
//! the same script and forwards live events, reconnecting with backoff when
//! the connection drops. Both phases emit [`crate::alias::ChainEvent`]s over a
//! channel; they never touch the registry directly.

pub mod progress;
pub mod service;

pub use progress::{BackfillStats, SyncProgressTracker};
pub use service::{AliasIndexerService, IndexError, IndexerConfig};
