//! statmon collection server.
//!
//! Thin axum adapters over the [`statmon_storage::MetricStore`] capability:
//! the handlers parse the wire shapes, call the store, and map its typed
//! errors to status codes. Body decoding (gzip, signature verification,
//! decryption) lives in [`middleware`] so handlers only ever see plaintext
//! JSON.

pub mod api;
pub mod app;
pub mod config;
pub mod middleware;
pub mod state;
