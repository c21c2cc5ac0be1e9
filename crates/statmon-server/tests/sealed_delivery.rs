//! End-to-end coverage of the agent-side sealing pipeline against the
//! server's body-decoding middleware: gzip, HMAC signing, RSA encryption.

mod common;

use axum::http::StatusCode;
use common::{build_context_with, send, ContextOptions};
use rsa::{RsaPrivateKey, RsaPublicKey};
use statmon_common::compress;
use statmon_common::crypto::{Decryptor, Encryptor};
use statmon_common::seal::Sealer;
use statmon_common::signing::{Signer, SIGNATURE_HEADER};
use statmon_common::types::MetricKind;
use statmon_storage::MetricStore;

const KEY: &str = "secret auth key";

fn batch_body() -> Vec<u8> {
    serde_json::json!([
        {"id": "PollCount", "type": "counter", "delta": 2},
        {"id": "Alloc", "type": "gauge", "value": 7.5},
    ])
    .to_string()
    .into_bytes()
}

async fn post_sealed(
    app: &axum::Router,
    sealer: &Sealer,
    plain: &[u8],
) -> common::WireResponse {
    let sealed = sealer.seal(plain).unwrap();
    let mut headers: Vec<(&str, String)> = vec![("content-type", "application/json".to_string())];
    if sealed.gzipped {
        headers.push(("content-encoding", "gzip".to_string()));
    }
    if let Some(signature) = &sealed.signature {
        headers.push((SIGNATURE_HEADER, signature.clone()));
    }
    let header_refs: Vec<(&str, &str)> = headers
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    send(app, "POST", "/updates/", Some(sealed.body), &header_refs).await
}

#[tokio::test]
async fn signed_gzipped_batch_is_accepted_and_response_is_signed() {
    let ctx = build_context_with(ContextOptions {
        signer: Some(Signer::new(KEY)),
        ..ContextOptions::default()
    });
    let sealer = Sealer {
        signer: Some(Signer::new(KEY)),
        encryptor: None,
        gzip: true,
    };

    let resp = post_sealed(&ctx.app, &sealer, &batch_body()).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        ctx.store
            .get(MetricKind::Counter, "PollCount")
            .unwrap()
            .delta,
        Some(2)
    );

    // Responses are signed over the plaintext body when a key is configured.
    let signature = resp
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .expect("response signature");
    assert!(Signer::new(KEY).verify(&resp.body, signature));
}

#[tokio::test]
async fn missing_signature_is_rejected_when_key_configured() {
    let ctx = build_context_with(ContextOptions {
        signer: Some(Signer::new(KEY)),
        ..ContextOptions::default()
    });
    let sealer = Sealer {
        signer: None,
        encryptor: None,
        gzip: false,
    };
    let resp = post_sealed(&ctx.app, &sealer, &batch_body()).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(ctx.store.get(MetricKind::Counter, "PollCount").is_err());
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let ctx = build_context_with(ContextOptions {
        signer: Some(Signer::new(KEY)),
        ..ContextOptions::default()
    });

    let plain = batch_body();
    let signature = Signer::new(KEY).sign(&plain);
    let mut tampered = plain.clone();
    tampered[10] ^= 0x01;
    let packed = compress::gzip(&tampered).unwrap();

    let resp = send(
        &ctx.app,
        "POST",
        "/updates/",
        Some(packed),
        &[
            ("content-type", "application/json"),
            ("content-encoding", "gzip"),
            (SIGNATURE_HEADER, signature.as_str()),
        ],
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_key_signature_is_rejected() {
    let ctx = build_context_with(ContextOptions {
        signer: Some(Signer::new(KEY)),
        ..ContextOptions::default()
    });
    let sealer = Sealer {
        signer: Some(Signer::new("a different key")),
        encryptor: None,
        gzip: true,
    };
    let resp = post_sealed(&ctx.app, &sealer, &batch_body()).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn encrypted_signed_gzipped_batch_round_trips() {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let public = RsaPublicKey::from(&private);

    let ctx = build_context_with(ContextOptions {
        signer: Some(Signer::new(KEY)),
        decryptor: Some(Decryptor::new(private)),
        ..ContextOptions::default()
    });
    let sealer = Sealer {
        signer: Some(Signer::new(KEY)),
        encryptor: Some(Encryptor::new(public)),
        gzip: true,
    };

    let resp = post_sealed(&ctx.app, &sealer, &batch_body()).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        ctx.store.get(MetricKind::Gauge, "Alloc").unwrap().value,
        Some(7.5)
    );
}

#[tokio::test]
async fn undecryptable_payload_is_rejected() {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();

    let ctx = build_context_with(ContextOptions {
        decryptor: Some(Decryptor::new(private)),
        ..ContextOptions::default()
    });
    // Plaintext JSON where ciphertext is expected.
    let resp = send(
        &ctx.app,
        "POST",
        "/updates/",
        Some(batch_body()),
        &[("content-type", "application/json")],
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}
