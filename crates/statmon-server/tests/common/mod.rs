#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use statmon_common::crypto::Decryptor;
use statmon_common::signing::Signer;
use statmon_server::app;
use statmon_server::state::AppState;
use statmon_storage::memory::MemoryStore;
use statmon_storage::snapshot::SnapshotFile;
use statmon_storage::MetricStore;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub app: Router,
}

pub struct ContextOptions {
    pub signer: Option<Signer>,
    pub decryptor: Option<Decryptor>,
    pub sync_store: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            signer: None,
            decryptor: None,
            sync_store: false,
        }
    }
}

pub fn build_test_context() -> TestContext {
    build_context_with(ContextOptions::default())
}

pub fn build_context_with(options: ContextOptions) -> TestContext {
    let temp_dir = TempDir::new().expect("tempdir");
    let store = Arc::new(MemoryStore::new());
    let snapshot = Arc::new(SnapshotFile::new(temp_dir.path().join("metrics.json")));
    let state = AppState {
        store: store.clone() as Arc<dyn MetricStore>,
        snapshot: Some(snapshot),
        sync_store: options.sync_store,
        signer: options.signer.map(Arc::new),
        decryptor: options.decryptor.map(Arc::new),
    };
    let app = app::build_router(state.clone());
    TestContext {
        temp_dir,
        store,
        state,
        app,
    }
}

pub struct WireResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("utf8 body")
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    body: Option<Vec<u8>>,
    headers: &[(&str, &str)],
) -> WireResponse {
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .expect("request");
    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec();
    WireResponse {
        status,
        headers,
        body,
    }
}

pub async fn post_json(app: &Router, path: &str, json: serde_json::Value) -> WireResponse {
    send(
        app,
        "POST",
        path,
        Some(json.to_string().into_bytes()),
        &[("content-type", "application/json")],
    )
    .await
}
