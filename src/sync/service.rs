//!
//! Indexer service driving the alias engine from a Chronik node.
//!
//! The service owns the Chronik client and the sending half of the engine's
//! event channel. `run` backfills the full history of the fee-collection script
//! and then follows the WebSocket feed indefinitely, translating Chronik
//! messages into [`ChainEvent`]s. Transient Chronik failures are retried with
//! exponential backoff; a closed engine channel is fatal.

use crate::alias::candidate::AddressKind;
use crate::alias::constants::AliasProtocol;
use crate::alias::decode::parse_script_address;
use crate::alias::engine::ChainEvent;
use crate::chronik::{ChronikClient, ChronikError, TxHistoryPage, WsMsg};
use crate::sync::progress::{BackfillStats, SyncProgressTracker};
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Error types for the indexer service
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
	#[error("chronik error: {0}")]
	Chronik(#[from] ChronikError),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("engine worker stopped")]
	EngineStopped,
}

/// Connection settings for the indexer service.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
	/// Chronik HTTP endpoint.
	pub chronik_url: String,
	/// Chronik WebSocket endpoint.
	pub chronik_ws_url: String,
	/// Transactions per history page during backfill.
	pub page_size: u32,
}

impl Default for IndexerConfig {
	fn default() -> Self {
		Self {
			chronik_url: "https://chronik.be.cash/xec".to_string(),
			chronik_ws_url: "wss://chronik.be.cash/xec/ws".to_string(),
			page_size: 25,
		}
	}
}

/// Service feeding chain events from Chronik into the alias engine.
pub struct AliasIndexerService {
	client: ChronikClient,
	protocol: AliasProtocol,
	events: mpsc::Sender<ChainEvent>,
	page_size: u32,
}

impl AliasIndexerService {
	pub fn new(
		config: IndexerConfig,
		protocol: AliasProtocol,
		events: mpsc::Sender<ChainEvent>,
	) -> Result<Self, IndexError> {
		let client = ChronikClient::new(config.chronik_url, config.chronik_ws_url)?;
		Ok(Self {
			client,
			protocol,
			events,
			page_size: config.page_size,
		})
	}

	/// Backfill the full history, then follow live events until the engine
	/// channel closes or an unrecoverable error occurs.
	pub async fn run(&self) -> Result<(), IndexError> {
		let (script_type, payload) = fee_script_target(&self.protocol)?;
		let stats = self.backfill(&script_type, &payload).await?;
		info!("Backfill complete: {}", stats.summary());
		self.follow(&script_type, &payload).await
	}

	/// Replay the fee script's transaction history into the engine, oldest
	/// page first.
	async fn backfill(
		&self,
		script_type: &str,
		payload: &str,
	) -> Result<BackfillStats, IndexError> {
		// Page 0 holds the newest transactions; fetch it once to learn the
		// page count, then walk from the oldest page forward.
		let first = self.page_with_retry(script_type, payload, 0).await?;
		let num_pages = first.num_pages.max(1);
		info!(num_pages, "Starting history backfill");

		let mut tracker = SyncProgressTracker::new();
		for page in (0..num_pages).rev() {
			let history = self.page_with_retry(script_type, payload, page).await?;
			tracker.record_page();
			for tx in history.txs.into_iter().rev() {
				let height = tx.block.as_ref().map(|b| b.height);
				// Pagination shifts when blocks arrive mid-backfill; the
				// engine tolerates replays, but skipping keeps the log honest.
				if tracker.record_tx(&tx.txid, height) {
					self.send(ChainEvent::TxAdded { tx }).await?;
				}
			}
			tracker.log_progress(false);
		}
		tracker.log_progress(true);

		match self.client.blockchain_info().await {
			Ok(info) => {
				self.send(ChainEvent::BlockConnected {
					height: info.tip_height,
				})
				.await?;
			}
			Err(e) => warn!("Could not fetch chain tip after backfill: {}", e),
		}

		Ok(tracker.get_stats())
	}

	/// Hold a WebSocket subscription on the fee script, reconnecting with
	/// backoff whenever the connection drops.
	async fn follow(&self, script_type: &str, payload: &str) -> Result<(), IndexError> {
		let mut reconnect = ExponentialBackoff {
			max_elapsed_time: None,
			..ExponentialBackoff::default()
		};
		loop {
			match self.client.subscribe(script_type, payload).await {
				Ok(mut stream) => {
					info!("Subscribed to fee script events");
					reconnect.reset();
					while let Some(msg) = stream.next().await {
						match msg {
							Ok(msg) => self.handle_ws_msg(msg).await?,
							Err(e) => {
								warn!("WebSocket stream error: {}", e);
								break;
							}
						}
					}
					warn!("WebSocket stream ended, reconnecting");
				}
				Err(e) => warn!("WebSocket connection failed: {}", e),
			}

			let delay = reconnect
				.next_backoff()
				.unwrap_or(Duration::from_secs(60));
			tokio::time::sleep(delay).await;
		}
	}

	/// Translate one WebSocket message into engine events.
	async fn handle_ws_msg(&self, msg: WsMsg) -> Result<(), IndexError> {
		match msg {
			// Both mempool acceptance and confirmation are handled by
			// refetching the full transaction: the fresh copy carries block
			// metadata when confirmed, and the engine's ingest path covers
			// new candidates and pending-to-confirmed transitions alike.
			WsMsg::AddedToMempool { txid } | WsMsg::Confirmed { txid } => {
				match self.client.tx(&txid).await {
					Ok(tx) => self.send(ChainEvent::TxAdded { tx }).await?,
					Err(e) => {
						// The tx may already be gone again; the next event
						// for it will set the record straight.
						warn!("Could not fetch tx {}: {}", txid, e);
					}
				}
			}
			WsMsg::RemovedFromMempool { txid } => {
				self.send(ChainEvent::TxsEvicted { txids: vec![txid] }).await?;
			}
			WsMsg::Finalized { txid } => {
				debug!("Tx {} finalized", txid);
			}
			WsMsg::BlockConnected { block_height, .. } => {
				self.send(ChainEvent::BlockConnected {
					height: block_height,
				})
				.await?;
			}
			WsMsg::BlockDisconnected {
				block_hash,
				evicted_txids,
			} => {
				info!(
					"Block {} disconnected, evicting {} txs",
					block_hash,
					evicted_txids.len()
				);
				if !evicted_txids.is_empty() {
					self.send(ChainEvent::TxsEvicted {
						txids: evicted_txids,
					})
					.await?;
				}
			}
		}
		Ok(())
	}

	/// Fetch one history page, retrying transient failures with backoff.
	async fn page_with_retry(
		&self,
		script_type: &str,
		payload: &str,
		page: u32,
	) -> Result<TxHistoryPage, ChronikError> {
		let policy = ExponentialBackoff {
			max_elapsed_time: Some(Duration::from_secs(120)),
			..ExponentialBackoff::default()
		};
		backoff::future::retry(policy, || async move {
			self.client
				.script_history(script_type, payload, page, self.page_size)
				.await
				.map_err(|e| {
					warn!("History page {} fetch failed, retrying: {}", page, e);
					backoff::Error::transient(e)
				})
		})
		.await
	}

	async fn send(&self, event: ChainEvent) -> Result<(), IndexError> {
		self.events
			.send(event)
			.await
			.map_err(|_| IndexError::EngineStopped)
	}
}

/// Resolve the Chronik subscription target from the protocol's fee script.
fn fee_script_target(protocol: &AliasProtocol) -> Result<(String, String), IndexError> {
	let script = protocol.fee_script();
	let address = parse_script_address(&script).ok_or_else(|| {
		IndexError::Config("fee script is not P2PKH or P2SH".to_string())
	})?;
	let script_type = match address.kind {
		AddressKind::P2pkh => "p2pkh",
		AddressKind::P2sh => "p2sh",
	};
	Ok((script_type.to_string(), address.hash_hex))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fee_script_target_resolves_the_default_protocol() {
		let (script_type, payload) = fee_script_target(&AliasProtocol::default()).unwrap();
		assert_eq!(script_type, "p2pkh");
		assert_eq!(payload, "638568e36d0b5d7d49a6e99854caa27d9772b093");
	}

	#[test]
	fn fee_script_target_rejects_non_standard_scripts() {
		let protocol = AliasProtocol {
			fee_script_hex: "6a".to_string(),
			..AliasProtocol::default()
		};
		assert!(matches!(
			fee_script_target(&protocol),
			Err(IndexError::Config(_))
		));
	}

	#[test]
	fn default_config_points_at_mainnet_chronik() {
		let config = IndexerConfig::default();
		assert!(config.chronik_url.starts_with("https://"));
		assert!(config.chronik_ws_url.starts_with("wss://"));
		assert!(config.page_size > 0);
	}
}
