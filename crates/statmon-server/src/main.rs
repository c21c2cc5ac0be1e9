use std::sync::Arc;

use anyhow::Result;
use statmon_common::crypto::Decryptor;
use statmon_common::signing::Signer;
use statmon_server::app;
use statmon_server::config::ServerConfig;
use statmon_server::state::AppState;
use statmon_storage::memory::MemoryStore;
use statmon_storage::snapshot::SnapshotFile;
use statmon_storage::sqlite::SqliteStore;
use statmon_storage::MetricStore;
use tokio::signal;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("statmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    let (store, snapshot): (Arc<dyn MetricStore>, Option<Arc<SnapshotFile>>) =
        match &config.database_path {
            Some(path) => {
                tracing::info!(path, "using sqlite backend");
                (Arc::new(SqliteStore::open(path)?), None)
            }
            None => {
                tracing::info!(path = %config.snapshot_path, "using in-memory backend");
                (
                    Arc::new(MemoryStore::new()),
                    Some(Arc::new(SnapshotFile::new(&config.snapshot_path))),
                )
            }
        };

    if config.restore {
        if let Some(snapshot) = &snapshot {
            match snapshot.restore(store.as_ref()) {
                Ok(count) => tracing::info!(count, "restored metrics from snapshot"),
                Err(e) => tracing::warn!(error = %e, "restore failed, starting empty"),
            }
        }
    }

    let state = AppState {
        store: store.clone(),
        snapshot: snapshot.clone(),
        sync_store: config.store_interval_secs == 0 && snapshot.is_some(),
        signer: config.signing_key().map(|k| Arc::new(Signer::new(k))),
        decryptor: match &config.private_key_path {
            Some(path) => Some(Arc::new(Decryptor::from_pem_file(path)?)),
            None => None,
        },
    };
    tracing::info!(
        listen = %config.listen_addr,
        store_interval_secs = config.store_interval_secs,
        signing = state.signer.is_some(),
        encryption = state.decryptor.is_some(),
        "statmon-server starting"
    );

    let cancel = CancellationToken::new();

    // Interval persistence policy; synchronous flushes happen in the handlers.
    let flush_task = match (&snapshot, config.store_interval_secs) {
        (Some(snapshot), secs) if secs > 0 => {
            let snapshot = snapshot.clone();
            let store = store.clone();
            let cancel = cancel.clone();
            Some(tokio::spawn(async move {
                let mut tick = interval(Duration::from_secs(secs));
                tick.tick().await; // first tick fires immediately
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            if let Err(e) = snapshot.save(store.as_ref()) {
                                tracing::warn!(error = %e, "interval snapshot flush failed");
                            }
                        }
                        () = cancel.cancelled() => break,
                    }
                }
            }))
        }
        _ => None,
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app::build_router(state))
        .with_graceful_shutdown(async move {
            let _ = signal::ctrl_c().await;
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;

    if let Some(task) = flush_task {
        let _ = task.await;
    }
    if let Some(snapshot) = &snapshot {
        match snapshot.save(store.as_ref()) {
            Ok(count) => tracing::info!(count, "final snapshot written"),
            Err(e) => tracing::error!(error = %e, "final snapshot failed"),
        }
    }

    Ok(())
}
