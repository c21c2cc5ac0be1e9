use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use statmon_common::{compress, signing::SIGNATURE_HEADER};

use crate::state::AppState;

const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

static SIGNATURE_HEADER_NAME: HeaderName = HeaderName::from_static("hashsha256");

/// Decodes inbound bodies and encodes outbound ones, symmetrically with the
/// agent's sealer: inflate, verify the `HashSHA256` signature over the
/// inflated bytes, decrypt; responses are signed on the plaintext body and
/// gzipped afterwards when the client accepts it.
///
/// Verification is strict: when a key is configured, any non-empty request
/// body must carry a valid signature. Missing or mismatching signatures are
/// rejected and logged as security-relevant events.
pub async fn exchange(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let accepts_gzip = header_contains(&req, header::ACCEPT_ENCODING, "gzip");
    let request_gzipped = header_contains(&req, header::CONTENT_ENCODING, "gzip");

    let (parts, body) = req.into_parts();
    let Ok(raw) = to_bytes(body, MAX_BODY_BYTES).await else {
        return (StatusCode::BAD_REQUEST, "unreadable body").into_response();
    };

    let mut plain = raw.to_vec();
    if request_gzipped && !plain.is_empty() {
        match compress::gunzip(&plain) {
            Ok(inflated) => plain = inflated,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting malformed gzip body");
                return (StatusCode::BAD_REQUEST, "malformed gzip body").into_response();
            }
        }
    }

    if let Some(signer) = &state.signer {
        if !plain.is_empty() {
            let presented = parts
                .headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok());
            match presented {
                Some(signature) if signer.verify(&plain, signature) => {}
                Some(_) => {
                    tracing::warn!(path = %parts.uri.path(), "request signature mismatch");
                    return (StatusCode::BAD_REQUEST, "signature mismatch").into_response();
                }
                None => {
                    tracing::warn!(path = %parts.uri.path(), "request signature missing");
                    return (StatusCode::BAD_REQUEST, "signature required").into_response();
                }
            }
        }
    }

    if let Some(decryptor) = &state.decryptor {
        if !plain.is_empty() {
            match decryptor.decrypt(&plain) {
                Ok(decrypted) => plain = decrypted,
                Err(e) => {
                    tracing::warn!(path = %parts.uri.path(), error = %e, "payload decryption failed");
                    return (StatusCode::BAD_REQUEST, "undecryptable payload").into_response();
                }
            }
        }
    }

    let req = Request::from_parts(parts, Body::from(plain));
    let resp = next.run(req).await;

    let (mut parts, body) = resp.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_BODY_BYTES).await else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "unreadable response").into_response();
    };

    if let Some(signer) = &state.signer {
        if let Ok(value) = HeaderValue::from_str(&signer.sign(&bytes)) {
            parts.headers.insert(SIGNATURE_HEADER_NAME.clone(), value);
        }
    }

    let body = if accepts_gzip && !bytes.is_empty() {
        match compress::gzip(&bytes) {
            Ok(packed) => {
                parts
                    .headers
                    .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                parts.headers.remove(header::CONTENT_LENGTH);
                packed
            }
            Err(_) => bytes.to_vec(),
        }
    } else {
        bytes.to_vec()
    };

    Response::from_parts(parts, Body::from(body))
}

fn header_contains(req: &Request, name: header::HeaderName, needle: &str) -> bool {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(needle))
}

/// Request logging in the access-log style; `X-Real-IP` is informational.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let real_ip = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let resp = next.run(req).await;
    tracing::info!(
        %method,
        path,
        status = resp.status().as_u16(),
        real_ip,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    resp
}
