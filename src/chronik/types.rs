//! Types for Chronik indexer integration.
//!
//! These structs mirror the JSON shapes Chronik serves over HTTP and WebSocket.
//! Satoshi amounts and timestamps arrive as decimal strings; the `string_u64`
//! helper accepts both the string form and a plain number. Fields that only
//! exist for confirmed transactions (`block`) or token-carrying inputs
//! (`slpToken`, `slpBurn`) are modeled as explicit `Option`s rather than
//! inspected for presence at runtime.

use serde::{Deserialize, Serialize};

/// Serde helper for u64 values that Chronik encodes as decimal strings.
pub(crate) mod string_u64 {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct StringOrU64;

        impl Visitor<'_> for StringOrU64 {
            type Value = u64;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a u64 or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
                Ok(value)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
                value.parse::<u64>().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(StringOrU64)
    }
}

/// Reference to a transaction output being spent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    /// The txid of the transaction holding the output.
    pub txid: String,
    /// The index of the output within that transaction.
    pub out_idx: u32,
}

/// SLP token amount attached to an input or output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlpToken {
    /// Token base units carried by this input/output.
    #[serde(with = "string_u64", default)]
    pub amount: u64,
    /// Whether this is a mint baton rather than a fungible amount.
    #[serde(default)]
    pub is_mint_baton: bool,
}

/// SLP burn record attached to an input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlpBurn {
    /// The token id of the burned token.
    #[serde(default)]
    pub token_id: String,
}

/// One transaction input as reported by Chronik.
///
/// Chronik resolves the previous output for every input, so `output_script` and
/// `value` describe the coin being spent, not this transaction's own outputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    /// The previous output being spent.
    pub prev_out: OutPoint,
    /// The unlocking script of this input.
    #[serde(default)]
    pub input_script: String,
    /// The locking script of the spent output. Absent for coinbase inputs.
    #[serde(default)]
    pub output_script: Option<String>,
    /// The satoshi value of the spent output.
    #[serde(with = "string_u64", default)]
    pub value: u64,
    #[serde(default)]
    pub sequence_no: u32,
    /// SLP token amount carried by the spent output, if any.
    #[serde(default)]
    pub slp_token: Option<SlpToken>,
    /// SLP burn triggered by spending this input, if any.
    #[serde(default)]
    pub slp_burn: Option<SlpBurn>,
}

/// One transaction output as reported by Chronik
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    /// The satoshi value of the output.
    #[serde(with = "string_u64")]
    pub value: u64,
    /// The locking script of the output, hex encoded.
    pub output_script: String,
    /// The input that spent this output, if it has been spent.
    #[serde(default)]
    pub spent_by: Option<OutPoint>,
    /// SLP token amount carried by this output, if any.
    #[serde(default)]
    pub slp_token: Option<SlpToken>,
}

/// Block metadata attached to confirmed transactions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockMeta {
    /// The height of the block containing the transaction.
    pub height: u32,
    /// The hash of the block containing the transaction.
    pub hash: String,
    /// The block timestamp, unix seconds.
    #[serde(with = "string_u64", default)]
    pub timestamp: u64,
}

/// A transaction as served by Chronik.
///
/// Unconfirmed transactions simply lack the `block` key; `time_first_seen` is
/// when the node first observed the transaction in its mempool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tx {
    pub txid: String,
    #[serde(default)]
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub lock_time: u32,
    /// Present only once the transaction is confirmed.
    #[serde(default)]
    pub block: Option<BlockMeta>,
    /// Unix time the node first saw the transaction.
    #[serde(with = "string_u64", default)]
    pub time_first_seen: u64,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub is_coinbase: bool,
}

impl Tx {
    /// Whether the transaction is confirmed in a block.
    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }
}

/// One page of transaction history for a script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxHistoryPage {
    pub txs: Vec<Tx>,
    #[serde(default)]
    pub num_pages: u32,
}

/// Chain tip information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainInfo {
    pub tip_hash: String,
    pub tip_height: u32,
}

/// Messages received over the Chronik WebSocket subscription.
///
/// The feed reports mempool acceptance, confirmation, block connection, and
/// reorg eviction for transactions touching the subscribed script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WsMsg {
    /// A transaction entered the mempool.
    AddedToMempool { txid: String },
    /// A transaction left the mempool without confirming (double-spend or reorg).
    RemovedFromMempool { txid: String },
    /// A transaction was included in a block.
    Confirmed { txid: String },
    /// A transaction was finalized by Avalanche post-consensus.
    Finalized { txid: String },
    /// A new block was connected to the tip.
    BlockConnected { block_hash: String, block_height: u32 },
    /// A block was disconnected from the tip; its transactions are evicted.
    BlockDisconnected {
        block_hash: String,
        #[serde(default)]
        evicted_txids: Vec<String>,
    },
}

/// Error types for Chronik client operations
#[derive(Debug, thiserror::Error)]
pub enum ChronikError {
    #[error("chronik error: {0}")]
    Rpc(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("subscription error: {0}")]
    Subscription(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed from a real alias registration served by Chronik.
    const TX_JSON: &str = r#"{
        "txid": "9d9fd465f56a7946c48b2e214386b51d7968a3a40d46cc697036e4fc1cc644df",
        "version": 2,
        "inputs": [
            {
                "prevOut": {
                    "txid": "f41ccfbd88d228bbb695b771dd0c266b0351eda9a35aeb8c5e3cb7670e7e17cc",
                    "outIdx": 2
                },
                "inputScript": "483045022100be9fb853",
                "outputScript": "76a9149846b6b38ff713334ac19fe3cf851a1f98c07b0088ac",
                "value": "141348",
                "sequenceNo": 4294967295
            }
        ],
        "outputs": [
            {
                "value": "0",
                "outputScript": "6a042e78656305666f6f3130"
            },
            {
                "value": "554",
                "outputScript": "76a914638568e36d0b5d7d49a6e99854caa27d9772b09388ac"
            }
        ],
        "lockTime": 0,
        "block": {
            "height": 776585,
            "hash": "000000000000000011457cd2e079f588a9849eaaeea273b6d37b2c8e3fa77494",
            "timestamp": "1674738897"
        },
        "timeFirstSeen": "1674738494",
        "size": 247,
        "isCoinbase": false
    }"#;

    #[test]
    fn parses_confirmed_tx_with_stringified_values() {
        let tx: Tx = serde_json::from_str(TX_JSON).expect("tx should parse");
        assert!(tx.is_confirmed());
        assert_eq!(tx.outputs[1].value, 554);
        assert_eq!(tx.inputs[0].value, 141348);
        assert_eq!(tx.time_first_seen, 1674738494);
        assert_eq!(tx.block.as_ref().map(|b| b.height), Some(776585));
        assert!(tx.inputs[0].slp_token.is_none());
    }

    #[test]
    fn missing_block_key_means_unconfirmed() {
        let mut value: serde_json::Value = serde_json::from_str(TX_JSON).unwrap();
        value.as_object_mut().unwrap().remove("block");
        let tx: Tx = serde_json::from_value(value).expect("tx should parse");
        assert!(!tx.is_confirmed());
    }

    #[test]
    fn parses_ws_messages() {
        let msg: WsMsg = serde_json::from_str(
            r#"{"type":"addedToMempool","txid":"ab"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            WsMsg::AddedToMempool {
                txid: "ab".to_string()
            }
        );

        let msg: WsMsg = serde_json::from_str(
            r#"{"type":"blockConnected","blockHash":"00","blockHeight":800000}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            WsMsg::BlockConnected {
                block_hash: "00".to_string(),
                block_height: 800000
            }
        );
    }
}
