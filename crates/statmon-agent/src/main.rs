mod config;
mod dispatcher;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use statmon_collector::runtime::RuntimeSource;
use statmon_collector::Poller;
use statmon_common::crypto::Encryptor;
use statmon_common::retry::RetryPolicy;
use statmon_common::seal::Sealer;
use statmon_common::signing::Signer;
use statmon_storage::memory::MemoryStore;
use statmon_storage::MetricStore;
use tokio::signal;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::dispatcher::{DispatchConfig, Dispatcher};

/// How long to wait for in-flight deliveries on shutdown before abandoning
/// their retries.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("statmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = config::AgentConfig::load(&config_path)?;
    tracing::info!(
        server = %config.server_endpoint,
        poll_secs = config.poll_interval_secs,
        report_secs = config.report_interval_secs,
        rate_limit = config.rate_limit,
        signing = config.signing_key().is_some(),
        encryption = config.public_key_path.is_some(),
        "statmon-agent starting"
    );

    let store: Arc<dyn MetricStore> = Arc::new(MemoryStore::new());
    let mut poller = Poller::new(vec![Box::new(RuntimeSource::new())], store.clone());

    let sealer = Arc::new(Sealer {
        signer: config.signing_key().map(Signer::new),
        encryptor: match &config.public_key_path {
            Some(path) => Some(Encryptor::from_pem_file(path)?),
            None => None,
        },
        gzip: config.gzip,
    });

    let cancel = CancellationToken::new();
    let (dispatcher, workers) = Dispatcher::spawn(
        DispatchConfig {
            endpoint: config.updates_url(),
            workers: config.rate_limit,
            policy: RetryPolicy::default(),
        },
        sealer,
        cancel.clone(),
    );

    let mut poll_tick = interval(Duration::from_secs(config.poll_interval_secs));
    let mut report_tick = interval(Duration::from_secs(config.report_interval_secs));

    loop {
        tokio::select! {
            _ = poll_tick.tick() => {
                if let Err(e) = poller.poll_once() {
                    tracing::warn!(error = %e, "poll failed");
                }
            }
            _ = report_tick.tick() => {
                if let Err(e) = dispatcher.enqueue_snapshot(store.as_ref()) {
                    tracing::warn!(error = %e, "failed to queue report");
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("shutting down, sending final report");
                let _ = dispatcher.enqueue_snapshot(store.as_ref());
                break;
            }
        }
    }

    // Closing the channel lets workers drain queued jobs and exit.
    drop(dispatcher);
    let drain = async {
        for handle in workers {
            let _ = handle.await;
        }
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        tracing::warn!("shutdown grace expired, abandoning in-flight retries");
        cancel.cancel();
    }

    Ok(())
}
