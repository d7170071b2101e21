//! Progress tracking for history backfill.
//!
//! This module provides the `SyncProgressTracker`, which records how far the
//! backfill has come: pages fetched, distinct transactions replayed, and the
//! highest confirmed height seen. Chronik pagination can shift while blocks
//! arrive mid-backfill, so the tracker also counts duplicate transactions seen
//! across page boundaries.

use std::collections::HashSet;
use tracing::info;

/// Service for tracking backfill progress
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
    /// Total pages fetched so far
    pages_fetched: u32,
    /// Distinct txids replayed into the engine
    seen_txids: HashSet<String>,
    /// Transactions that appeared on more than one page
    duplicates: usize,
    /// Highest confirmed height observed in the history
    highest_height: u32,
    /// Pages fetched when progress was last logged
    last_logged_pages: u32,
}

impl SyncProgressTracker {
    pub fn new() -> Self {
        Self {
            pages_fetched: 0,
            seen_txids: HashSet::new(),
            duplicates: 0,
            highest_height: 0,
            last_logged_pages: 0,
        }
    }

    /// Record one fetched page.
    pub fn record_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Record one replayed transaction.
    ///
    /// Returns false if the txid was already replayed on an earlier page.
    pub fn record_tx(&mut self, txid: &str, height: Option<u32>) -> bool {
        if let Some(height) = height {
            self.highest_height = self.highest_height.max(height);
        }
        if self.seen_txids.insert(txid.to_string()) {
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    /// Log progress every 10 pages, or when forced.
    pub fn log_progress(&mut self, force: bool) {
        let pages_since_last_log = self.pages_fetched - self.last_logged_pages;
        if force || pages_since_last_log >= 10 {
            info!(
                "Backfill progress: {} pages, {} transactions, highest height {}",
                self.pages_fetched,
                self.seen_txids.len(),
                self.highest_height
            );
            self.last_logged_pages = self.pages_fetched;
        }
    }

    /// Get backfill statistics as a BackfillStats struct
    pub fn get_stats(&self) -> BackfillStats {
        BackfillStats {
            pages_fetched: self.pages_fetched,
            transactions_replayed: self.seen_txids.len(),
            duplicates: self.duplicates,
            highest_height: self.highest_height,
        }
    }
}

impl Default for SyncProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a completed backfill
#[derive(Debug, Clone)]
pub struct BackfillStats {
    pub pages_fetched: u32,
    pub transactions_replayed: usize,
    pub duplicates: usize,
    pub highest_height: u32,
}

impl BackfillStats {
    /// Get a human-readable summary of the backfill statistics
    pub fn summary(&self) -> String {
        format!(
            "{} pages, {} transactions replayed up to height {}{}",
            self.pages_fetched,
            self.transactions_replayed,
            self.highest_height,
            if self.duplicates == 0 {
                String::new()
            } else {
                format!(" ({} duplicates skipped)", self.duplicates)
            }
        )
    }
}
