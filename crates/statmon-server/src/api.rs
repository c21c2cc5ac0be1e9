use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use statmon_common::types::{Metric, MetricKind};
use statmon_storage::StorageError;

use crate::state::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Maps storage-layer errors to transport status codes. Validation failures
/// and malformed input are 400, absent metrics 404, everything else 500.
pub enum ApiError {
    Storage(StorageError),
    BadRequest(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Storage(StorageError::NotFound { kind, id }) => {
                (StatusCode::NOT_FOUND, format!("metric {kind}:{id} not found")).into_response()
            }
            ApiError::Storage(StorageError::Invalid(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage failure".to_string()).into_response()
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        }
    }
}

/// `POST /update/{kind}/{name}/{value}` — plain-text single update.
pub async fn update_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let kind: MetricKind = kind
        .parse()
        .map_err(|e: statmon_common::types::MetricError| ApiError::BadRequest(e.to_string()))?;
    let metric = match kind {
        MetricKind::Gauge => {
            let value: f64 = value
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid gauge value '{value}'")))?;
            Metric::gauge(name, value)
        }
        MetricKind::Counter => {
            let delta: i64 = value
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid counter delta '{value}'")))?;
            Metric::counter(name, delta)
        }
    };
    state.store.update(&metric)?;
    state.flush_sync();
    Ok(StatusCode::OK.into_response())
}

/// `POST /update/` — single-metric JSON; responds with the updated record,
/// so counter updates report the accumulated total.
pub async fn update_json(
    State(state): State<AppState>,
    Json(metric): Json<Metric>,
) -> Result<Json<Metric>, ApiError> {
    let updated = state.store.update(&metric)?;
    state.flush_sync();
    Ok(Json(updated))
}

/// `POST /updates/` — JSON batch, applied atomically w.r.t. readers.
pub async fn updates_json(
    State(state): State<AppState>,
    Json(metrics): Json<Vec<Metric>>,
) -> Result<Json<Vec<Metric>>, ApiError> {
    state.store.update_batch(&metrics)?;
    state.flush_sync();
    Ok(Json(metrics))
}

#[derive(Deserialize)]
pub struct ValueQuery {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

/// `POST /value/` — JSON query for one metric.
pub async fn value_json(
    State(state): State<AppState>,
    Json(query): Json<ValueQuery>,
) -> Result<Json<Metric>, ApiError> {
    let metric = state.store.get(query.kind, &query.id)?;
    Ok(Json(metric))
}

/// `GET /value/{kind}/{name}` — plain-text current value.
pub async fn value_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<String, ApiError> {
    let kind: MetricKind = kind
        .parse()
        .map_err(|e: statmon_common::types::MetricError| ApiError::BadRequest(e.to_string()))?;
    let metric = state.store.get(kind, &name)?;
    Ok(render_value(&metric))
}

/// `GET /ping` — backing-medium liveness with a bounded wait.
pub async fn ping(State(state): State<AppState>) -> Response {
    let store = state.store.clone();
    let probe = tokio::task::spawn_blocking(move || store.ping());
    match tokio::time::timeout(PING_TIMEOUT, probe).await {
        Ok(Ok(Ok(()))) => StatusCode::OK.into_response(),
        Ok(Ok(Err(e))) => {
            tracing::error!(error = %e, "ping failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "ping task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(_) => {
            tracing::error!(timeout_secs = PING_TIMEOUT.as_secs(), "ping timed out");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /` — HTML table of every stored metric.
pub async fn index(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut records: Vec<Metric> = state.store.get_all()?.into_values().collect();
    records.sort_by(|a, b| a.key().cmp(&b.key()));

    let mut html = String::from(
        "<html><head><title>statmon</title></head><body>\
         <h1>Metrics</h1><table border=\"1\">\
         <tr><th>kind</th><th>name</th><th>value</th></tr>",
    );
    for metric in &records {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            metric.kind,
            metric.id,
            render_value(metric)
        ));
    }
    html.push_str("</table></body></html>");

    Ok(Html(html).into_response())
}

fn render_value(metric: &Metric) -> String {
    match metric.kind {
        MetricKind::Gauge => metric.value.unwrap_or_default().to_string(),
        MetricKind::Counter => metric.delta.unwrap_or_default().to_string(),
    }
}
