//! Data model for alias registration candidates.
//!
//! A candidate is one decoded, not-yet-judged transaction. Confirmation state is
//! a tagged variant rather than a magic sentinel integer: `Height` implements the
//! canonical comparator directly (every confirmed height sorts before pending),
//! so nothing in the engine ever does arithmetic on a placeholder value. The
//! numeric sentinel only appears when a snapshot is serialized for consumers.

use crate::alias::constants::UNCONFIRMED_BLOCKHEIGHT;
use crate::alias::validate::InvalidReason;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Locking script kind of a registering address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

/// Address derived from a locking script: script kind plus hash160 payload.
///
/// This is the registrant's identity. It is derived from the previous output
/// spent by the candidate's first input and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptAddress {
    pub kind: AddressKind,
    /// The 20-byte hash160 payload, hex encoded.
    pub hash_hex: String,
}

impl fmt::Display for ScriptAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AddressKind::P2pkh => write!(f, "p2pkh:{}", self.hash_hex),
            AddressKind::P2sh => write!(f, "p2sh:{}", self.hash_hex),
        }
    }
}

/// Blockheight of a candidate for canonical ordering purposes.
///
/// `Confirmed(h)` for any real height sorts before `Pending`; confirmed heights
/// sort ascending among themselves. This is the primary key of the canonical
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Height {
    Confirmed(u32),
    Pending,
}

impl Ord for Height {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Height::Confirmed(a), Height::Confirmed(b)) => a.cmp(b),
            (Height::Confirmed(_), Height::Pending) => Ordering::Less,
            (Height::Pending, Height::Confirmed(_)) => Ordering::Greater,
            (Height::Pending, Height::Pending) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Height {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Height {
    /// Numeric height for serialized snapshots: the real height when confirmed,
    /// the unconfirmed sentinel otherwise.
    pub fn sort_height(&self) -> u32 {
        match self {
            Height::Confirmed(h) => *h,
            Height::Pending => UNCONFIRMED_BLOCKHEIGHT,
        }
    }
}

/// Confirmation state of a candidate transaction.
///
/// A candidate starts `Pending` and is lowered to `Confirmed` exactly once; a
/// reorged transaction is removed from the candidate set entirely, never reset
/// to pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Confirmation {
    Confirmed {
        height: u32,
        hash: String,
        timestamp: u64,
    },
    Pending {
        time_first_seen: u64,
    },
}

impl Confirmation {
    pub fn height(&self) -> Height {
        match self {
            Confirmation::Confirmed { height, .. } => Height::Confirmed(*height),
            Confirmation::Pending { .. } => Height::Pending,
        }
    }
}

/// Token metadata carried by the output a candidate spent.
///
/// Transactions whose first input carries SLP state are never accepted as alias
/// registrations, even if the nominal XEC fee is also paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenContext {
    /// Token id, when the spend is an explicit burn record.
    pub token_id: Option<String>,
    /// Token base units attached to the spent output.
    pub amount: u64,
}

/// One parsed, not-yet-judged alias registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasCandidate {
    /// 64-hex-character transaction identifier.
    pub txid: String,
    /// Address of the registrant, derived from the spent input's locking script.
    pub address: ScriptAddress,
    /// Decoded alias text. May be empty or contain disallowed characters;
    /// such candidates are retained for audit but never promoted.
    pub alias: String,
    /// Satoshis paid to the fee-collection address by the second output.
    pub fee_paid: u64,
    /// Confirmation state.
    pub confirmation: Confirmation,
    /// Unix time the node first observed the transaction. Diagnostics only,
    /// never used for ordering.
    pub first_seen: u64,
    /// Coinbase transactions can never register aliases.
    pub is_coinbase: bool,
    /// Token metadata on the spent input, if any.
    pub token: Option<TokenContext>,
}

impl AliasCandidate {
    pub fn height(&self) -> Height {
        self.confirmation.height()
    }
}

/// A candidate together with its validation verdict.
///
/// Records are kept for every decoded candidate, valid or not, so the full
/// history remains available for audit. Only records with no invalid reason are
/// eligible to win conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub candidate: AliasCandidate,
    /// `None` when the candidate passed validation.
    pub invalid: Option<InvalidReason>,
}

impl CandidateRecord {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_none()
    }
}
