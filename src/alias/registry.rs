//! Canonical ordering and conflict resolution.
//!
//! The registry is rebuilt from scratch on every pass: sort the full candidate
//! history into canonical order, then walk it once and let the first valid
//! candidate claim each alias. Rebuilding is a pure function of the candidate
//! set, so two engines fed different permutations of the same events always
//! converge on byte-identical registries.

use crate::alias::candidate::{CandidateRecord, ScriptAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The canonical owner of one alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    pub alias: String,
    pub address: ScriptAddress,
    pub txid: String,
    /// Real height when confirmed, the unconfirmed sentinel otherwise.
    pub blockheight: u32,
}

/// Immutable mapping from alias text to its canonical owner.
///
/// Iteration order is by alias text. Snapshots serialize deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRegistry {
    entries: BTreeMap<String, AliasEntry>,
}

impl AliasRegistry {
    pub fn get(&self, alias: &str) -> Option<&AliasEntry> {
        self.entries.get(alias)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AliasEntry> {
        self.entries.values()
    }

    /// Aliases registered to `address`, in alias order.
    pub fn by_address<'a>(
        &'a self,
        address: &'a ScriptAddress,
    ) -> impl Iterator<Item = &'a AliasEntry> {
        self.entries.values().filter(move |e| &e.address == address)
    }
}

/// Sort records into canonical order: height ascending (every confirmed height
/// before pending), then txid ascending as the tiebreak within a height.
pub fn canonical_order(records: &mut [CandidateRecord]) {
    records.sort_by(|a, b| {
        a.candidate
            .height()
            .cmp(&b.candidate.height())
            .then_with(|| a.candidate.txid.cmp(&b.candidate.txid))
    });
}

/// Build the registry from the full candidate history.
///
/// `records` must already be in canonical order. Invalid records never claim an
/// alias, no matter how early they sort; later valid claims on a taken alias
/// lose silently.
pub fn build_registry(records: &[CandidateRecord]) -> AliasRegistry {
    let mut entries: BTreeMap<String, AliasEntry> = BTreeMap::new();
    for record in records {
        if !record.is_valid() {
            continue;
        }
        let candidate = &record.candidate;
        if entries.contains_key(&candidate.alias) {
            debug!(
                alias = %candidate.alias,
                txid = %candidate.txid,
                "Alias already registered, later claim loses"
            );
            continue;
        }
        entries.insert(
            candidate.alias.clone(),
            AliasEntry {
                alias: candidate.alias.clone(),
                address: candidate.address.clone(),
                txid: candidate.txid.clone(),
                blockheight: candidate.height().sort_height(),
            },
        );
    }
    AliasRegistry { entries }
}
