//! Structural pre-filter for decoded candidates.
//!
//! Runs between decoding and validation. Candidates excluded here are dropped
//! from the pipeline entirely rather than recorded as invalid: a coinbase or a
//! token-bearing spend is not a failed registration attempt, it is not a
//! registration at all. Syntax and fee problems, by contrast, pass through so
//! the validator can record why they lost.

use crate::alias::candidate::AliasCandidate;
use tracing::debug;

/// Drop candidates that are categorically ineligible.
///
/// Removes coinbase transactions and candidates whose first input carries SLP
/// token state. Order of the surviving candidates is preserved.
pub fn filter_candidates(candidates: Vec<AliasCandidate>) -> Vec<AliasCandidate> {
    candidates
        .into_iter()
        .filter(|candidate| {
            if candidate.is_coinbase {
                debug!(txid = %candidate.txid, "Dropping coinbase candidate");
                return false;
            }
            if candidate.token.is_some() {
                debug!(
                    txid = %candidate.txid,
                    "Dropping candidate spending token-bearing input"
                );
                return false;
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::candidate::{
        AddressKind, Confirmation, ScriptAddress, TokenContext,
    };

    fn candidate(txid: &str) -> AliasCandidate {
        AliasCandidate {
            txid: txid.to_string(),
            address: ScriptAddress {
                kind: AddressKind::P2pkh,
                hash_hex: "9846b6b38ff713334ac19fe3cf851a1f98c07b00".to_string(),
            },
            alias: "foo10".to_string(),
            fee_paid: 554,
            confirmation: Confirmation::Confirmed {
                height: 776585,
                hash: "000000000000000011457cd2e079f588a9849eaaeea273b6d37b2c8e3fa77494"
                    .to_string(),
                timestamp: 1674738897,
            },
            first_seen: 1674738494,
            is_coinbase: false,
            token: None,
        }
    }

    #[test]
    fn keeps_plain_candidates_in_order() {
        let input = vec![candidate("aa"), candidate("bb")];
        let out = filter_candidates(input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn drops_coinbase_candidates() {
        let mut cb = candidate("aa");
        cb.is_coinbase = true;
        let out = filter_candidates(vec![cb, candidate("bb")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].txid, "bb");
    }

    #[test]
    fn drops_token_bearing_candidates() {
        let mut etoken = candidate("aa");
        etoken.token = Some(TokenContext {
            token_id: Some(
                "861dede36f7f73f0af4e979fc3a3f77f37d53fe27be4444601150c21619635f4".to_string(),
            ),
            amount: 100,
        });
        let out = filter_candidates(vec![etoken, candidate("bb")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].txid, "bb");
    }

    #[test]
    fn syntax_problems_are_not_filtered_here() {
        let mut bad = candidate("aa");
        bad.alias = "UPPER".to_string();
        assert_eq!(filter_candidates(vec![bad]).len(), 1);
    }
}
