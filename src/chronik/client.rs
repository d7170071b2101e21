//!
//! HTTP/WebSocket client for a Chronik indexer node.
//!
//! This module provides an async client for the Chronik JSON API. It supports paged
//! script history queries, single-transaction lookup, chain tip queries, and a
//! real-time WebSocket subscription for script-level chain events. All methods are
//! async and designed for use with Tokio.

use super::types::*;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Chronik indexer client
#[derive(Clone)]
pub struct ChronikClient {
	/// The underlying HTTP client for JSON queries.
	http_client: Client,
	/// The base URL for the Chronik HTTP endpoint.
	api_url: String,
	/// The WebSocket URL for real-time subscriptions.
	ws_url: String,
}

impl ChronikClient {
	/// Create a new Chronik client.
	///
	/// # Arguments
	/// * `api_url` - The HTTP endpoint, e.g. `https://chronik.be.cash/xec`.
	/// * `ws_url` - The WebSocket endpoint, e.g. `wss://chronik.be.cash/xec/ws`.
	pub fn new(api_url: String, ws_url: String) -> Result<Self, ChronikError> {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()?;

		Ok(Self {
			http_client,
			api_url,
			ws_url,
		})
	}

	/// Fetch one page of transaction history for a script.
	///
	/// # Arguments
	/// * `script_type` - The script type, e.g. `p2pkh` or `p2sh`.
	/// * `payload_hex` - The hash payload of the script, hex encoded.
	/// * `page` - Zero-based page index; page 0 holds the most recent transactions.
	/// * `page_size` - Number of transactions per page.
	pub async fn script_history(
		&self,
		script_type: &str,
		payload_hex: &str,
		page: u32,
		page_size: u32,
	) -> Result<TxHistoryPage, ChronikError> {
		let url = format!(
			"{}/script/{}/{}/history?page={}&page_size={}",
			self.api_url, script_type, payload_hex, page, page_size
		);
		self.get_json(&url).await
	}

	/// Fetch a single transaction by txid.
	pub async fn tx(&self, txid: &str) -> Result<Tx, ChronikError> {
		let url = format!("{}/tx/{}", self.api_url, txid);
		self.get_json(&url).await
	}

	/// Fetch the current chain tip.
	pub async fn blockchain_info(&self) -> Result<BlockchainInfo, ChronikError> {
		let url = format!("{}/blockchain-info", self.api_url);
		self.get_json(&url).await
	}

	/// Subscribe to chain events for a script.
	///
	/// Opens a WebSocket connection, registers the subscription, and returns a
	/// pinned async stream of [`WsMsg`] results. The stream ends when the server
	/// closes the connection; callers are expected to resubscribe with backoff.
	///
	/// # Errors
	/// Returns `ChronikError` if the WebSocket connection or subscription fails.
	pub async fn subscribe(
		&self,
		script_type: &str,
		payload_hex: &str,
	) -> Result<
		std::pin::Pin<Box<dyn futures_util::Stream<Item = Result<WsMsg, ChronikError>> + Send>>,
		ChronikError,
	> {
		debug!("Attempting WebSocket connection to: {}", self.ws_url);

		let (ws_stream, response) = connect_async(&self.ws_url).await?;
		debug!(
			"WebSocket connection established, response status: {}",
			response.status()
		);
		let (mut ws_sender, ws_receiver) = ws_stream.split();

		// Register the script subscription
		let subscribe_message = json!({
			"type": "subscribe",
			"scriptType": script_type,
			"payload": payload_hex,
		});
		ws_sender
			.send(Message::Text(subscribe_message.to_string()))
			.await?;

		// Return stream of chain events
		let stream = ws_receiver.filter_map(|msg| async move {
			match msg {
				Ok(Message::Text(text)) => {
					match serde_json::from_str::<WsMsg>(&text) {
						Ok(event) => Some(Ok(event)),
						Err(e) => {
							// Chronik sends keepalives and status frames we do not model
							debug!("Ignoring unrecognized message: {} ({})", text, e);
							None
						}
					}
				}
				Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
				Ok(Message::Close(frame)) => {
					warn!("WebSocket closed by server: {:?}", frame);
					None
				}
				Ok(_) => Some(Err(ChronikError::Subscription(
					"Unexpected message type".to_string(),
				))),
				Err(e) => Some(Err(ChronikError::WebSocket(e))),
			}
		});

		Ok(Box::pin(stream))
	}

	/// Execute a GET request and parse the JSON response.
	async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ChronikError> {
		let response = self.http_client.get(url).send().await?;

		if !response.status().is_success() {
			return Err(ChronikError::Rpc(format!(
				"HTTP error from {}: {}",
				url,
				response.status()
			)));
		}

		Ok(response.json::<T>().await?)
	}
}
