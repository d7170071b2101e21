//! Alias protocol parameters.
//!
//! The marker, fee schedule, fee-collection script, and length limit are
//! application-level protocol rules, not chain consensus, so they are carried as
//! configuration with the observed on-chain values as defaults rather than being
//! hard-coded inside the engine.

use serde::{Deserialize, Serialize};

/// LOKAD-style protocol marker identifying an OP_RETURN payload as an alias
/// registration: the ASCII bytes ".xec".
pub const ALIAS_LOKAD_ID: [u8; 4] = *b".xec";

/// Maximum alias length in bytes.
pub const MAX_ALIAS_LENGTH: usize = 21;

/// Blockheight reported for unconfirmed registrations at API boundaries.
/// Larger than any real chain height, so pending candidates sort last.
pub const UNCONFIRMED_BLOCKHEIGHT: u32 = 100_000_000;

/// Locking script of the fee-collection address (P2PKH), hex encoded.
pub const REGISTRATION_FEE_SCRIPT_HEX: &str = "76a914638568e36d0b5d7d49a6e99854caa27d9772b09388ac";

/// Registration fee tiers in satoshis, indexed by alias length minus one.
/// Lengths past the end of the table pay the last (flat) tier.
const FEE_TIERS_SATS: [u64; 8] = [558, 557, 556, 555, 554, 553, 552, 551];

/// Application rules of the alias protocol.
///
/// `Default` carries the values observed on-chain; deployments registering a
/// different fee address or schedule construct their own value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasProtocol {
    /// 4-byte marker that must open the OP_RETURN payload.
    pub lokad_id: [u8; 4],
    /// Maximum alias length in bytes.
    pub max_length: usize,
    /// Locking script the fee output must pay, hex encoded.
    pub fee_script_hex: String,
    /// Fee tiers in satoshis, indexed by alias length minus one; lengths past
    /// the table pay the last tier.
    pub fee_tiers: Vec<u64>,
}

impl Default for AliasProtocol {
    fn default() -> Self {
        Self {
            lokad_id: ALIAS_LOKAD_ID,
            max_length: MAX_ALIAS_LENGTH,
            fee_script_hex: REGISTRATION_FEE_SCRIPT_HEX.to_string(),
            fee_tiers: FEE_TIERS_SATS.to_vec(),
        }
    }
}

impl AliasProtocol {
    /// Required registration fee in satoshis for an alias of `length` bytes.
    ///
    /// Returns `None` for lengths outside the protocol's 1..=max range; such
    /// aliases cannot be registered at any price.
    pub fn required_fee(&self, length: usize) -> Option<u64> {
        if length == 0 || length > self.max_length || self.fee_tiers.is_empty() {
            return None;
        }
        let idx = (length - 1).min(self.fee_tiers.len() - 1);
        Some(self.fee_tiers[idx])
    }

    /// The fee-collection locking script as raw bytes.
    pub fn fee_script(&self) -> Vec<u8> {
        hex::decode(&self.fee_script_hex).unwrap_or_default()
    }
}
