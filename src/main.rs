use alias_indexer::alias::{AliasEngine, AliasProtocol, run_engine_worker};
use alias_indexer::storage::SnapshotPersistence;
use alias_indexer::sync::{AliasIndexerService, IndexerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	// Initialize tracing subscriber with debug logging for the indexer
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive("alias_indexer=debug".parse().unwrap())
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting alias indexer");

	let mut config = IndexerConfig::default();
	if let Ok(url) = std::env::var("CHRONIK_URL") {
		config.chronik_url = url;
	}
	if let Ok(url) = std::env::var("CHRONIK_WS_URL") {
		config.chronik_ws_url = url;
	}
	let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

	let protocol = AliasProtocol::default();
	let persistence = Arc::new(SnapshotPersistence::new(PathBuf::from(data_dir)));

	let mut engine = AliasEngine::new(protocol.clone());
	match persistence.restore().await {
		Ok(Some((registry, meta))) => {
			info!(
				"Serving {} aliases from snapshot (tip {:?}) while backfilling",
				registry.len(),
				meta.tip_height
			);
			engine.restore(registry);
		}
		Ok(None) => info!("No snapshot on disk, starting cold"),
		Err(e) => error!("Failed to restore snapshot: {}", e),
	}

	let registry_handle = engine.handle();
	let (event_tx, event_rx) = mpsc::channel(256);
	let worker = tokio::spawn(run_engine_worker(engine, event_rx, Some(persistence)));

	let service = match AliasIndexerService::new(config, protocol, event_tx) {
		Ok(service) => service,
		Err(e) => {
			error!("Failed to create indexer service: {}", e);
			return;
		}
	};

	tokio::select! {
		result = service.run() => {
			if let Err(e) = result {
				error!("Indexer service stopped: {}", e);
			}
		}
		_ = tokio::signal::ctrl_c() => {
			info!("Shutdown signal received");
		}
	}

	info!(
		"Stopping with {} aliases in the registry",
		registry_handle.snapshot().len()
	);
	worker.abort();
}
