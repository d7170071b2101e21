//! Alias syntax and fee validation.
//!
//! Validation is total and order-free: the verdict for a candidate depends only
//! on the candidate itself and the protocol rules, never on other candidates or
//! on arrival order. Conflict resolution happens later, in the registry build.

use crate::alias::candidate::{AliasCandidate, CandidateRecord};
use crate::alias::constants::AliasProtocol;
use serde::{Deserialize, Serialize};

/// Why a candidate failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum InvalidReason {
    /// The alias text violates the character or length rules.
    #[error("alias violates syntax rules")]
    BadSyntax,

    /// The fee output pays the wrong amount for this alias length.
    #[error("fee mismatch: required {required} sats, paid {paid}")]
    BadFee { required: u64, paid: u64 },
}

/// Validate one candidate against the protocol rules.
///
/// Syntax is checked first; a candidate with an unregistrable alias reports
/// `BadSyntax` even when its fee happens to match some tier. Fees must match
/// the schedule exactly, overpaying is as invalid as underpaying.
pub fn validate(candidate: &AliasCandidate, protocol: &AliasProtocol) -> Option<InvalidReason> {
    if !alias_syntax_ok(&candidate.alias, protocol.max_length) {
        return Some(InvalidReason::BadSyntax);
    }
    // Syntax passed, so the length has a fee tier.
    let required = match protocol.required_fee(candidate.alias.len()) {
        Some(fee) => fee,
        None => return Some(InvalidReason::BadSyntax),
    };
    if candidate.fee_paid != required {
        return Some(InvalidReason::BadFee {
            required,
            paid: candidate.fee_paid,
        });
    }
    None
}

/// Attach a validation verdict to a candidate.
pub fn judge(candidate: AliasCandidate, protocol: &AliasProtocol) -> CandidateRecord {
    let invalid = validate(&candidate, protocol);
    CandidateRecord { candidate, invalid }
}

/// Alias syntax: 1..=max bytes, lowercase ASCII letters and digits only.
fn alias_syntax_ok(alias: &str, max_length: usize) -> bool {
    let bytes = alias.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= max_length
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::candidate::{AddressKind, Confirmation, ScriptAddress};

    fn candidate(alias: &str, fee_paid: u64) -> AliasCandidate {
        AliasCandidate {
            txid: "9d9fd465f56a7946c48b2e214386b51d7968a3a40d46cc697036e4fc1cc644df".to_string(),
            address: ScriptAddress {
                kind: AddressKind::P2pkh,
                hash_hex: "9846b6b38ff713334ac19fe3cf851a1f98c07b00".to_string(),
            },
            alias: alias.to_string(),
            fee_paid,
            confirmation: Confirmation::Pending {
                time_first_seen: 1674738494,
            },
            first_seen: 1674738494,
            is_coinbase: false,
            token: None,
        }
    }

    #[test]
    fn accepts_well_formed_registrations() {
        let protocol = AliasProtocol::default();
        assert_eq!(validate(&candidate("foo10", 554), &protocol), None);
        assert_eq!(validate(&candidate("a", 558), &protocol), None);
        assert_eq!(validate(&candidate("bytesofman", 551), &protocol), None);
        assert_eq!(
            validate(&candidate("aaaaaaaaaaaaaaaaaaaaa", 551), &protocol),
            None
        );
    }

    #[test]
    fn rejects_syntax_violations() {
        let protocol = AliasProtocol::default();
        for alias in ["", "FOO10", "foo 10", "foo_10", "fo\u{1f600}", "nopedotcom.com"] {
            assert_eq!(
                validate(&candidate(alias, 551), &protocol),
                Some(InvalidReason::BadSyntax),
                "alias {:?} should fail syntax",
                alias
            );
        }
        // 22 bytes, one over the limit
        assert_eq!(
            validate(&candidate("aaaaaaaaaaaaaaaaaaaaaa", 551), &protocol),
            Some(InvalidReason::BadSyntax)
        );
    }

    #[test]
    fn rejects_underpaid_fee() {
        let protocol = AliasProtocol::default();
        assert_eq!(
            validate(&candidate("xyz", 555), &protocol),
            Some(InvalidReason::BadFee {
                required: 556,
                paid: 555
            })
        );
    }

    #[test]
    fn rejects_overpaid_fee() {
        let protocol = AliasProtocol::default();
        assert_eq!(
            validate(&candidate("foo10", 10_000), &protocol),
            Some(InvalidReason::BadFee {
                required: 554,
                paid: 10_000
            })
        );
    }

    #[test]
    fn syntax_verdict_wins_over_fee_verdict() {
        let protocol = AliasProtocol::default();
        // Wrong syntax and wrong fee: syntax is reported.
        assert_eq!(
            validate(&candidate("FOO", 1), &protocol),
            Some(InvalidReason::BadSyntax)
        );
    }

    #[test]
    fn judge_attaches_the_verdict() {
        let protocol = AliasProtocol::default();
        assert!(judge(candidate("foo10", 554), &protocol).is_valid());
        assert!(!judge(candidate("foo10", 553), &protocol).is_valid());
    }
}
