use std::sync::Arc;

use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use statmon_common::retry::{retry, RetryPolicy};
use statmon_common::seal::Sealer;
use statmon_common::signing::SIGNATURE_HEADER;
use statmon_common::types::Metric;
use statmon_storage::MetricStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Bound on queued-but-unsent batches. Delivery is level-triggered: a dropped
/// batch is recovered by the next report tick re-reading the store.
const JOB_QUEUE_DEPTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded {0}")]
    Status(reqwest::StatusCode),
}

impl SendError {
    /// Connection-level failures and 5xx responses retry; 4xx responses are
    /// application errors (malformed batch, rejected signature) and are
    /// terminal.
    fn is_retryable(&self) -> bool {
        match self {
            SendError::Transport(e) => !e.is_builder(),
            SendError::Status(status) => status.is_server_error(),
        }
    }
}

struct SendJob {
    body: Vec<u8>,
    count: usize,
}

pub struct DispatchConfig {
    /// Full `POST /updates/` URL.
    pub endpoint: String,
    /// Worker pool size (the configured rate limit).
    pub workers: usize,
    pub policy: RetryPolicy,
}

/// Agent-side delivery pipeline: a fixed-size worker pool draining a bounded
/// channel of batch send jobs. Workers share no mutable state besides the
/// channel and a cloned HTTP client.
pub struct Dispatcher {
    tx: mpsc::Sender<SendJob>,
}

impl Dispatcher {
    pub fn spawn(
        config: DispatchConfig,
        sealer: Arc<Sealer>,
        cancel: CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel::<SendJob>(JOB_QUEUE_DEPTH);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let client = reqwest::Client::new();
        let endpoint = Arc::new(config.endpoint);
        let policy = Arc::new(config.policy);

        let handles = (0..config.workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let client = client.clone();
                let endpoint = endpoint.clone();
                let policy = policy.clone();
                let sealer = sealer.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    loop {
                        let job = { rx.lock().await.recv().await };
                        let Some(job) = job else { break };
                        match deliver(&client, &endpoint, &sealer, &policy, &cancel, &job).await {
                            Ok(()) => {
                                tracing::debug!(worker, count = job.count, "batch delivered");
                            }
                            Err(e) => {
                                tracing::error!(
                                    worker,
                                    count = job.count,
                                    attempts = policy.max_attempts(),
                                    error = %e,
                                    "batch dropped after delivery failure"
                                );
                            }
                        }
                    }
                })
            })
            .collect();

        (Self { tx }, handles)
    }

    /// Builds a batch from the store's current snapshot and queues it for
    /// delivery. The store is not drained; the next tick re-sends the
    /// then-current state (at-least-once).
    pub fn enqueue_snapshot(&self, store: &dyn MetricStore) -> anyhow::Result<()> {
        let Some(job) = build_job(store)? else {
            tracing::debug!("store empty, nothing to report");
            return Ok(());
        };
        if let Err(e) = self.tx.try_send(job) {
            tracing::warn!(error = %e, "dispatch queue full, dropping batch");
        }
        Ok(())
    }
}

fn build_job(store: &dyn MetricStore) -> anyhow::Result<Option<SendJob>> {
    let all = store.get_all()?;
    if all.is_empty() {
        return Ok(None);
    }
    let mut records: Vec<Metric> = all.into_values().collect();
    records.sort_by(|a, b| a.key().cmp(&b.key()));
    let count = records.len();
    let body = serde_json::to_vec(&records)?;
    Ok(Some(SendJob { body, count }))
}

async fn deliver(
    client: &reqwest::Client,
    endpoint: &str,
    sealer: &Sealer,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    job: &SendJob,
) -> Result<(), SendError> {
    let sealed = sealer.seal(&job.body).map_err(|e| {
        // A sealing failure is a local bug, not a transport condition.
        tracing::error!(error = %e, "failed to seal batch");
        SendError::Status(reqwest::StatusCode::BAD_REQUEST)
    })?;

    retry(policy, cancel, SendError::is_retryable, || {
        let mut req = client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(sealed.body.clone());
        if sealed.gzipped {
            req = req.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(signature) = &sealed.signature {
            req = req.header(SIGNATURE_HEADER, signature.clone());
        }
        async move {
            let resp = req.send().await?;
            let status = resp.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(SendError::Status(status))
            }
        }
    })
    .await
}
