//! Event-driven engine maintaining the candidate history and registry snapshot.
//!
//! The engine owns the full candidate history, keyed by txid. Chain events
//! mutate the history; the registry itself is never patched in place. After
//! each batch of events a full rebuild runs (sort, resolve, swap), so readers
//! always observe a complete, internally consistent snapshot behind an `Arc`.
//!
//! Confirmation transitions are monotonic per txid: pending to confirmed only.
//! A reorg never resets a candidate to pending, it evicts the txid outright,
//! and the transaction re-enters as a fresh event if it is mined again.

use crate::alias::candidate::{CandidateRecord, Confirmation};
use crate::alias::constants::AliasProtocol;
use crate::alias::decode::{DecodeError, decode_alias_tx};
use crate::alias::filter::filter_candidates;
use crate::alias::registry::{AliasRegistry, build_registry, canonical_order};
use crate::alias::validate::judge;
use crate::chronik::{BlockMeta, Tx};
use crate::storage::SnapshotPersistence;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Chain events the engine ingests.
///
/// Events are a commutative description of chain state: any permutation of the
/// same event set leaves the engine with the same candidate history.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    /// A transaction appeared, in the mempool or already mined.
    TxAdded { tx: Tx },
    /// A previously seen transaction was mined.
    TxConfirmed { txid: String, block: BlockMeta },
    /// Transactions dropped by a reorg or mempool eviction.
    TxsEvicted { txids: Vec<String> },
    /// A new block extended the chain tip.
    BlockConnected { height: u32 },
}

/// Shared read handle to the latest registry snapshot.
///
/// Cloning is cheap. Readers take an `Arc` to a complete snapshot and are never
/// blocked by an in-progress rebuild beyond the pointer swap itself.
#[derive(Clone, Default)]
pub struct RegistryHandle {
    inner: Arc<RwLock<Arc<AliasRegistry>>>,
}

impl RegistryHandle {
    /// The latest complete registry snapshot.
    pub fn snapshot(&self) -> Arc<AliasRegistry> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn publish(&self, registry: AliasRegistry) {
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Arc::new(registry);
    }
}

/// The validation and canonicalization engine.
pub struct AliasEngine {
    protocol: AliasProtocol,
    /// Full candidate history keyed by txid.
    records: BTreeMap<String, CandidateRecord>,
    handle: RegistryHandle,
    tip_height: Option<u32>,
}

impl AliasEngine {
    pub fn new(protocol: AliasProtocol) -> Self {
        Self {
            protocol,
            records: BTreeMap::new(),
            handle: RegistryHandle::default(),
            tip_height: None,
        }
    }

    /// Read handle for registry consumers.
    pub fn handle(&self) -> RegistryHandle {
        self.handle.clone()
    }

    /// Last chain tip reported through [`ChainEvent::BlockConnected`].
    pub fn tip_height(&self) -> Option<u32> {
        self.tip_height
    }

    /// Full candidate history in txid order, valid and invalid alike.
    pub fn history(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.records.values()
    }

    /// Number of candidates in the history, valid or not.
    pub fn history_len(&self) -> usize {
        self.records.len()
    }

    /// Seed the published snapshot from persisted state.
    ///
    /// The candidate history stays empty; the snapshot serves reads until the
    /// backfill replays the real history and the first rebuild replaces it.
    pub fn restore(&mut self, registry: AliasRegistry) {
        info!(aliases = registry.len(), "Restored registry snapshot");
        self.handle.publish(registry);
    }

    /// Apply one chain event to the candidate history.
    ///
    /// Does not rebuild; callers batch events and call [`rebuild`](Self::rebuild)
    /// once per batch.
    pub fn ingest(&mut self, event: ChainEvent) {
        match event {
            ChainEvent::TxAdded { tx } => self.ingest_tx(tx),
            ChainEvent::TxConfirmed { txid, block } => self.confirm_tx(&txid, block),
            ChainEvent::TxsEvicted { txids } => self.evict_txs(&txids),
            ChainEvent::BlockConnected { height } => {
                debug!(height, "Chain tip advanced");
                self.tip_height = Some(height);
            }
        }
    }

    /// Rebuild the registry from the full history and publish the snapshot.
    pub fn rebuild(&mut self) -> Arc<AliasRegistry> {
        let mut records: Vec<CandidateRecord> = self.records.values().cloned().collect();
        canonical_order(&mut records);
        let registry = build_registry(&records);
        debug!(
            candidates = records.len(),
            aliases = registry.len(),
            "Rebuilt alias registry"
        );
        self.handle.publish(registry);
        self.handle.snapshot()
    }

    fn ingest_tx(&mut self, tx: Tx) {
        let txid = tx.txid.clone();
        let candidate = match decode_alias_tx(&tx, &self.protocol) {
            Ok(candidate) => candidate,
            Err(DecodeError::NotAliasProtocol) => return,
            Err(err) => {
                debug!(txid = %txid, %err, "Skipping transaction");
                return;
            }
        };
        let Some(candidate) = filter_candidates(vec![candidate]).pop() else {
            return;
        };
        let record = judge(candidate, &self.protocol);

        if let Some(existing) = self.records.get(&txid) {
            // Replays must not regress a confirmed candidate to pending.
            let was_confirmed =
                matches!(existing.candidate.confirmation, Confirmation::Confirmed { .. });
            let now_pending =
                matches!(record.candidate.confirmation, Confirmation::Pending { .. });
            if was_confirmed && now_pending {
                debug!(txid = %txid, "Ignoring pending replay of confirmed candidate");
                return;
            }
        }
        debug!(
            txid = %txid,
            alias = %record.candidate.alias,
            valid = record.is_valid(),
            "Recorded alias candidate"
        );
        self.records.insert(txid, record);
    }

    fn confirm_tx(&mut self, txid: &str, block: BlockMeta) {
        match self.records.get_mut(txid) {
            Some(record) => match record.candidate.confirmation {
                Confirmation::Pending { .. } => {
                    debug!(txid, height = block.height, "Candidate confirmed");
                    record.candidate.confirmation = Confirmation::Confirmed {
                        height: block.height,
                        hash: block.hash,
                        timestamp: block.timestamp,
                    };
                }
                Confirmation::Confirmed { .. } => {
                    debug!(txid, "Confirmation for already confirmed candidate");
                }
            },
            None => {
                // Not every confirmed tx is an alias registration.
                debug!(txid, "Confirmation for unknown txid");
            }
        }
    }

    fn evict_txs(&mut self, txids: &[String]) {
        for txid in txids {
            if self.records.remove(txid).is_some() {
                info!(txid = %txid, "Evicted candidate after reorg");
            } else {
                // Benign: the evicted tx was never an alias candidate.
                warn!(txid = %txid, "Eviction for unknown txid, ignoring");
            }
        }
    }
}

/// Run the engine over a channel of chain events.
///
/// Events are drained in batches: after the first blocking receive, everything
/// already queued is taken before a single rebuild and optional snapshot
/// persist. Returns when the sender side closes.
pub async fn run_engine_worker(
    mut engine: AliasEngine,
    mut events: mpsc::Receiver<ChainEvent>,
    persistence: Option<Arc<SnapshotPersistence>>,
) {
    while let Some(event) = events.recv().await {
        engine.ingest(event);
        while let Ok(event) = events.try_recv() {
            engine.ingest(event);
        }
        let snapshot = engine.rebuild();
        if let Some(persistence) = &persistence {
            if let Err(err) = persistence.save(&snapshot, engine.tip_height()).await {
                warn!(%err, "Failed to persist registry snapshot");
            }
        }
    }
    info!("Event channel closed, engine worker stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chronik::{OutPoint, TxInput, TxOutput};
    use rand::seq::SliceRandom;

    const FEE_SCRIPT: &str = "76a914638568e36d0b5d7d49a6e99854caa27d9772b09388ac";
    const REGISTRANT_SCRIPT: &str = "76a9149846b6b38ff713334ac19fe3cf851a1f98c07b0088ac";

    fn alias_tx(txid: &str, alias: &str, fee: u64, height: Option<u32>) -> Tx {
        let payload = format!("6a042e786563{:02x}{}", alias.len(), hex::encode(alias));
        Tx {
            txid: txid.to_string(),
            version: 2,
            inputs: vec![TxInput {
                prev_out: OutPoint {
                    txid: "00".repeat(32),
                    out_idx: 0,
                },
                input_script: String::new(),
                output_script: Some(REGISTRANT_SCRIPT.to_string()),
                value: 10_000,
                sequence_no: 4294967295,
                slp_token: None,
                slp_burn: None,
            }],
            outputs: vec![
                TxOutput {
                    value: 0,
                    output_script: payload,
                    spent_by: None,
                    slp_token: None,
                },
                TxOutput {
                    value: fee,
                    output_script: FEE_SCRIPT.to_string(),
                    spent_by: None,
                    slp_token: None,
                },
            ],
            lock_time: 0,
            block: height.map(|h| BlockMeta {
                height: h,
                hash: "00".repeat(32),
                timestamp: 1674738897,
            }),
            time_first_seen: 1674738494,
            size: 247,
            is_coinbase: false,
        }
    }

    fn valid_tx(txid: &str, alias: &str, height: Option<u32>) -> Tx {
        let fee = AliasProtocol::default().required_fee(alias.len()).unwrap();
        alias_tx(txid, alias, fee, height)
    }

    #[test]
    fn confirmation_displaces_a_first_seen_pending_winner() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        // X seen first, Y second, both pending.
        engine.ingest(ChainEvent::TxAdded {
            tx: valid_tx("aa", "foo", None),
        });
        engine.ingest(ChainEvent::TxAdded {
            tx: valid_tx("bb", "foo", None),
        });
        // While both are pending, the txid tiebreak favors X.
        assert_eq!(engine.rebuild().get("foo").unwrap().txid, "aa");

        // Y confirms at 100, X at 101.
        engine.ingest(ChainEvent::TxConfirmed {
            txid: "bb".to_string(),
            block: BlockMeta {
                height: 100,
                hash: "00".repeat(32),
                timestamp: 1674738897,
            },
        });
        engine.ingest(ChainEvent::TxConfirmed {
            txid: "aa".to_string(),
            block: BlockMeta {
                height: 101,
                hash: "00".repeat(32),
                timestamp: 1674738900,
            },
        });
        let registry = engine.rebuild();
        assert_eq!(registry.get("foo").unwrap().txid, "bb");
        assert_eq!(registry.get("foo").unwrap().blockheight, 100);
    }

    #[test]
    fn eviction_promotes_the_previously_losing_candidate() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        engine.ingest(ChainEvent::TxAdded {
            tx: valid_tx("aa", "bar", Some(50)),
        });
        engine.ingest(ChainEvent::TxAdded {
            tx: valid_tx("zz", "bar", None),
        });
        assert_eq!(engine.rebuild().get("bar").unwrap().txid, "aa");

        engine.ingest(ChainEvent::TxsEvicted {
            txids: vec!["aa".to_string()],
        });
        let registry = engine.rebuild();
        assert_eq!(registry.get("bar").unwrap().txid, "zz");
        assert_eq!(registry.get("bar").unwrap().blockheight, 100_000_000);
    }

    #[test]
    fn unknown_evictions_are_benign() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        engine.ingest(ChainEvent::TxAdded {
            tx: valid_tx("aa", "bar", Some(50)),
        });
        engine.ingest(ChainEvent::TxsEvicted {
            txids: vec!["ffff".to_string()],
        });
        assert_eq!(engine.rebuild().get("bar").unwrap().txid, "aa");
    }

    #[test]
    fn confirmed_candidates_never_regress_to_pending() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        engine.ingest(ChainEvent::TxAdded {
            tx: valid_tx("aa", "foo", Some(100)),
        });
        // A late mempool replay of the same txid without block metadata.
        engine.ingest(ChainEvent::TxAdded {
            tx: valid_tx("aa", "foo", None),
        });
        assert_eq!(engine.rebuild().get("foo").unwrap().blockheight, 100);
    }

    #[test]
    fn non_alias_transactions_leave_no_trace() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        let mut tx = valid_tx("aa", "foo", Some(100));
        tx.outputs[0].output_script = "6a0400746162042e786563056a65737573".to_string();
        engine.ingest(ChainEvent::TxAdded { tx });
        assert_eq!(engine.history_len(), 0);
        assert!(engine.rebuild().is_empty());
    }

    #[test]
    fn invalid_candidates_are_recorded_but_never_win() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        engine.ingest(ChainEvent::TxAdded {
            tx: alias_tx("aa", "xyz", 555, Some(100)),
        });
        assert_eq!(engine.history_len(), 1);
        let record = engine.history().next().unwrap();
        assert_eq!(
            record.invalid,
            Some(crate::alias::validate::InvalidReason::BadFee {
                required: 556,
                paid: 555
            })
        );
        assert!(engine.rebuild().get("xyz").is_none());
    }

    #[test]
    fn ingestion_order_does_not_change_the_registry() {
        let mut events: Vec<ChainEvent> = (1..=20)
            .map(|i| ChainEvent::TxAdded {
                tx: valid_tx(
                    &format!("{:02x}{}", i, "00".repeat(31)),
                    "satoshi",
                    if i % 3 == 0 { None } else { Some(700_000 + i) },
                ),
            })
            .collect();

        let mut engine = AliasEngine::new(AliasProtocol::default());
        for event in events.clone() {
            engine.ingest(event);
        }
        let forward = serde_json::to_string(&*engine.rebuild()).unwrap();

        let mut rng = rand::rng();
        for _ in 0..5 {
            events.shuffle(&mut rng);
            let mut engine = AliasEngine::new(AliasProtocol::default());
            for event in events.clone() {
                engine.ingest(event);
            }
            assert_eq!(serde_json::to_string(&*engine.rebuild()).unwrap(), forward);
        }
    }

    #[test]
    fn distinct_aliases_from_one_address_all_register() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        for i in 1..=14u32 {
            engine.ingest(ChainEvent::TxAdded {
                tx: valid_tx(
                    &format!("{:02x}{}", i, "aa".repeat(31)),
                    &format!("you{}", i),
                    Some(776_000 + i),
                ),
            });
        }
        let registry = engine.rebuild();
        assert_eq!(registry.len(), 14);
        for i in 1..=14u32 {
            let entry = registry.get(&format!("you{}", i)).unwrap();
            assert_eq!(
                entry.address.hash_hex,
                "9846b6b38ff713334ac19fe3cf851a1f98c07b00"
            );
        }
    }

    #[test]
    fn block_connected_tracks_the_tip() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        assert_eq!(engine.tip_height(), None);
        engine.ingest(ChainEvent::BlockConnected { height: 776585 });
        assert_eq!(engine.tip_height(), Some(776585));
    }

    #[test]
    fn restore_serves_reads_until_the_first_rebuild() {
        let mut engine = AliasEngine::new(AliasProtocol::default());
        let mut seeded = AliasEngine::new(AliasProtocol::default());
        seeded.ingest(ChainEvent::TxAdded {
            tx: valid_tx("aa", "foo", Some(100)),
        });
        let snapshot = seeded.rebuild();

        engine.restore((*snapshot).clone());
        let handle = engine.handle();
        assert_eq!(handle.snapshot().get("foo").unwrap().txid, "aa");

        // History is still empty, so the first rebuild replaces the seed.
        engine.rebuild();
        assert!(handle.snapshot().is_empty());
    }

    #[tokio::test]
    async fn worker_rebuilds_after_each_batch() {
        let engine = AliasEngine::new(AliasProtocol::default());
        let handle = engine.handle();
        let (tx, rx) = mpsc::channel(16);
        let worker = tokio::spawn(run_engine_worker(engine, rx, None));

        tx.send(ChainEvent::TxAdded {
            tx: valid_tx("aa", "foo", Some(100)),
        })
        .await
        .unwrap();
        drop(tx);
        worker.await.unwrap();

        assert_eq!(handle.snapshot().get("foo").unwrap().txid, "aa");
    }
}
