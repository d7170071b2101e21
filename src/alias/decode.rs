//! Transaction decoder for alias registrations.
//!
//! `decode_alias_tx` is a pure transformation from one Chronik transaction to an
//! [`AliasCandidate`]. The cheap protocol-marker check runs first so unrelated
//! OP_RETURN traffic is skipped without any alias-specific parsing. The payload
//! grammar is strict: a single direct push (opcodes 0x01..=0x4b) of 1..=max
//! bytes, nothing after it. `OP_PUSHDATA1/2/4` and empty pushes are rejected
//! even when the bytes they would push look valid, matching the on-chain
//! protocol.
//!
//! The registering address comes from the locking script of the previous output
//! spent by input 0: the spender, not any recipient, is the registrant. Later
//! outputs may pay change back to the same wallet, which would make an
//! output-derived address ambiguous.

use crate::alias::candidate::{
    AddressKind, AliasCandidate, Confirmation, ScriptAddress, TokenContext,
};
use crate::alias::constants::AliasProtocol;
use crate::chronik::{Tx, TxInput};

/// OP_RETURN opcode.
const OP_RETURN: u8 = 0x6a;
/// Largest direct push opcode; pushes `0x4b` bytes.
const OP_PUSH_MAX: u8 = 0x4b;

/// Error types for alias transaction decoding.
///
/// Decode errors are never fatal: the transaction is simply not (or not validly)
/// an alias registration and produces no candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Output 0 is not a zero-value OP_RETURN opening with the protocol marker.
    #[error("not an alias registration")]
    NotAliasProtocol,

    /// Marker matched but the registration is structurally broken.
    #[error("malformed alias registration: {0}")]
    Malformed(&'static str),

    /// Coinbase transactions can never register aliases.
    #[error("coinbase transactions cannot register aliases")]
    Coinbase,
}

/// Decode one transaction into an alias candidate.
///
/// Pure; no side effects. Fails with [`DecodeError::NotAliasProtocol`] before
/// any alias parsing if output 0 does not carry the marker, and with
/// [`DecodeError::Malformed`] if the payload or the fee output violates the
/// protocol's structure. Syntax and fee-amount rules are not checked here; that
/// is the validator's job, so syntactically bad candidates stay visible for
/// audit.
pub fn decode_alias_tx(tx: &Tx, protocol: &AliasProtocol) -> Result<AliasCandidate, DecodeError> {
    if tx.is_coinbase {
        return Err(DecodeError::Coinbase);
    }

    let op_return = tx.outputs.first().ok_or(DecodeError::NotAliasProtocol)?;
    if op_return.value != 0 {
        return Err(DecodeError::NotAliasProtocol);
    }
    let script = hex::decode(&op_return.output_script)
        .map_err(|_| DecodeError::NotAliasProtocol)?;

    // Marker check: OP_RETURN, then a 4-byte push of the LOKAD id.
    if script.len() < 6
        || script[0] != OP_RETURN
        || script[1] != protocol.lokad_id.len() as u8
        || script[2..6] != protocol.lokad_id
    {
        return Err(DecodeError::NotAliasProtocol);
    }

    let alias_bytes = parse_alias_payload(&script[6..], protocol.max_length)?;

    // The fee output is fixed at index 1 and must pay the collection address.
    let fee_output = tx
        .outputs
        .get(1)
        .ok_or(DecodeError::Malformed("missing fee output"))?;
    let fee_script = hex::decode(&fee_output.output_script)
        .map_err(|_| DecodeError::Malformed("fee output script is not valid hex"))?;
    if fee_script != protocol.fee_script() {
        return Err(DecodeError::Malformed(
            "fee output does not pay the registration address",
        ));
    }

    let input = tx
        .inputs
        .first()
        .ok_or(DecodeError::Malformed("transaction has no inputs"))?;
    let address = registrant_address(input)?;

    let confirmation = match &tx.block {
        Some(block) => Confirmation::Confirmed {
            height: block.height,
            hash: block.hash.clone(),
            timestamp: block.timestamp,
        },
        None => Confirmation::Pending {
            time_first_seen: tx.time_first_seen,
        },
    };

    Ok(AliasCandidate {
        txid: tx.txid.clone(),
        address,
        alias: String::from_utf8_lossy(&alias_bytes).into_owned(),
        fee_paid: fee_output.value,
        confirmation,
        first_seen: tx.time_first_seen,
        is_coinbase: tx.is_coinbase,
        token: token_context(input),
    })
}

/// Parse the script bytes after the marker into the alias payload.
///
/// Exactly one direct push of 1..=`max_length` bytes is accepted.
fn parse_alias_payload(rest: &[u8], max_length: usize) -> Result<Vec<u8>, DecodeError> {
    if rest.is_empty() {
        return Err(DecodeError::Malformed("missing alias payload"));
    }
    let opcode = rest[0];
    if opcode < 1 || opcode > OP_PUSH_MAX {
        return Err(DecodeError::Malformed(
            "alias payload must be a direct push",
        ));
    }
    let len = opcode as usize;
    if rest.len() < 1 + len {
        return Err(DecodeError::Malformed("alias push is truncated"));
    }
    if rest.len() > 1 + len {
        return Err(DecodeError::Malformed(
            "trailing bytes after the alias push",
        ));
    }
    if len > max_length {
        return Err(DecodeError::Malformed("alias exceeds the maximum length"));
    }
    Ok(rest[1..1 + len].to_vec())
}

/// Derive the registrant's address from the spent output's locking script.
fn registrant_address(input: &TxInput) -> Result<ScriptAddress, DecodeError> {
    let script_hex = input
        .output_script
        .as_ref()
        .ok_or(DecodeError::Malformed("input has no spent output script"))?;
    let script = hex::decode(script_hex)
        .map_err(|_| DecodeError::Malformed("input script is not valid hex"))?;
    parse_script_address(&script)
        .ok_or(DecodeError::Malformed("unsupported registrant script type"))
}

/// Classify a locking script as P2PKH or P2SH and extract its hash160 payload.
pub fn parse_script_address(script: &[u8]) -> Option<ScriptAddress> {
    // P2PKH: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    if script.len() == 25
        && script[0] == 0x76
        && script[1] == 0xa9
        && script[2] == 0x14
        && script[23] == 0x88
        && script[24] == 0xac
    {
        return Some(ScriptAddress {
            kind: AddressKind::P2pkh,
            hash_hex: hex::encode(&script[3..23]),
        });
    }
    // P2SH: OP_HASH160 <20 bytes> OP_EQUAL
    if script.len() == 23 && script[0] == 0xa9 && script[1] == 0x14 && script[22] == 0x87 {
        return Some(ScriptAddress {
            kind: AddressKind::P2sh,
            hash_hex: hex::encode(&script[2..22]),
        });
    }
    None
}

/// Token metadata on the spent input, if present.
fn token_context(input: &TxInput) -> Option<TokenContext> {
    match (&input.slp_token, &input.slp_burn) {
        (None, None) => None,
        (token, burn) => Some(TokenContext {
            token_id: burn.as_ref().map(|b| b.token_id.clone()),
            amount: token.as_ref().map(|t| t.amount).unwrap_or(0),
        }),
    }
}
