//! Shared building blocks for the statmon agent and server.
//!
//! Holds the metric value types and their validation rules, the wire/snapshot
//! serialization shapes, HMAC request signing, optional RSA payload sealing,
//! and the retry policy used for transient I/O failures on both sides.

pub mod compress;
pub mod crypto;
pub mod retry;
pub mod seal;
pub mod signing;
pub mod types;
