//!
//! Chronik indexer node integration.
//!
//! Provides the HTTP/WebSocket client used to fetch transaction history and follow
//! live chain events, plus the serde models for the Chronik wire JSON.

pub mod client;
pub mod types;

pub use client::ChronikClient;
pub use types::*;
