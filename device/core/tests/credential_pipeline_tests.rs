// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use edge_telemetry_core::application::CredentialService;
use edge_telemetry_core::domain::credential::{ConnectionString, TokenExpiry};
use edge_telemetry_core::domain::device_config::LocalServiceConfig;
use edge_telemetry_core::domain::DeviceError;
use edge_telemetry_core::infrastructure::{IdentityServiceClient, KeyServiceClient};
use hyper::StatusCode;
use tokio_util::sync::CancellationToken;

use common::{identity_envelope, FakeDaemon, StallingDaemon};

const EXPIRY: i64 = 1_700_000_000;

fn service_config(path: &std::path::Path) -> LocalServiceConfig {
    LocalServiceConfig {
        socket_path: path.to_path_buf(),
        api_version: "2020-09-01".to_string(),
    }
}

fn credential_service(identity_socket: &std::path::Path, key_socket: &std::path::Path) -> CredentialService {
    let timeout = Duration::from_secs(5);
    CredentialService::new(
        Arc::new(IdentityServiceClient::new(&service_config(identity_socket), timeout)),
        Arc::new(KeyServiceClient::new(&service_config(key_socket), timeout)),
    )
}

#[tokio::test]
async fn test_end_to_end_over_local_sockets() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = FakeDaemon::start(dir.path().join("identityd.sock"), |_| {
        (StatusCode::OK, identity_envelope(None))
    });
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "signature": "abc123" }))
    });

    let service = credential_service(identityd.path(), keyd.path());
    let derived = service
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        derived.credential.as_str(),
        "HostName=hub.example.net;DeviceId=sensor-1;SharedAccessSignature=SharedAccessSignature sr=hub.example.net%2Fdevices%2Fsensor-1&se=1700000000&sig=abc123"
    );

    let identity_requests = identityd.requests();
    assert_eq!(identity_requests.len(), 1);
    assert_eq!(identity_requests[0].method, hyper::Method::GET);
    assert_eq!(
        identity_requests[0].uri.to_string(),
        "/identities/identity?api-version=2020-09-01"
    );

    let sign_requests = keyd.requests();
    assert_eq!(sign_requests.len(), 1);
    assert_eq!(sign_requests[0].method, hyper::Method::POST);
    assert_eq!(sign_requests[0].uri.to_string(), "/sign?api-version=2020-09-01");
}

#[tokio::test]
async fn test_sign_request_carries_only_the_key_handle() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = FakeDaemon::start(dir.path().join("identityd.sock"), |_| {
        (StatusCode::OK, identity_envelope(None))
    });
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "signature": "abc123" }))
    });

    credential_service(identityd.path(), keyd.path())
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &CancellationToken::new())
        .await
        .unwrap();

    let body = keyd.requests()[0].json();
    let object = body.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["algorithm", "keyHandle", "parameters"]);
    assert_eq!(body["keyHandle"], "k1");
    assert_eq!(body["algorithm"], "HMAC-SHA256");
    assert_eq!(body["parameters"].as_object().unwrap().len(), 1);

    // "hub.example.net%2Fdevices%2Fsensor-1\n1700000000"
    assert_eq!(
        body["parameters"]["message"],
        "aHViLmV4YW1wbGUubmV0JTJGZGV2aWNlcyUyRnNlbnNvci0xCjE3MDAwMDAwMDA="
    );
}

#[tokio::test]
async fn test_gateway_host_included_when_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = FakeDaemon::start(dir.path().join("identityd.sock"), |_| {
        (StatusCode::OK, identity_envelope(Some("edge.local")))
    });
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "signature": "c2lnbmF0dXJl+/=" }))
    });

    let derived = credential_service(identityd.path(), keyd.path())
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &CancellationToken::new())
        .await
        .unwrap();

    let parsed = ConnectionString::parse(derived.credential.as_str()).unwrap();
    assert_eq!(parsed.gateway_host.as_deref(), Some("edge.local"));
    let token = parsed.sas_token().unwrap();
    assert_eq!(token.signature, "c2lnbmF0dXJl%2B%2F%3D");
    assert_eq!(token.expiry.as_unix_seconds(), EXPIRY);
}

#[tokio::test]
async fn test_empty_signature_is_signing_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = FakeDaemon::start(dir.path().join("identityd.sock"), |_| {
        (StatusCode::OK, identity_envelope(None))
    });
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "signature": "" }))
    });

    let err = credential_service(identityd.path(), keyd.path())
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::SigningUnavailable(_)));
}

#[tokio::test]
async fn test_key_service_error_is_signing_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = FakeDaemon::start(dir.path().join("identityd.sock"), |_| {
        (StatusCode::OK, identity_envelope(None))
    });
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::NOT_FOUND, serde_json::json!({ "message": "key not found" }))
    });

    let err = credential_service(identityd.path(), keyd.path())
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::SigningUnavailable(ref m) if m.contains("404")));
}

#[tokio::test]
async fn test_unreachable_identity_service_skips_signing() {
    let dir = tempfile::tempdir().unwrap();
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "signature": "abc123" }))
    });

    let err = credential_service(&dir.path().join("missing.sock"), keyd.path())
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeviceError::IdentityUnavailable(_)));
    assert!(keyd.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_identity_response() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = FakeDaemon::start(dir.path().join("identityd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "unexpected": true }))
    });
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "signature": "abc123" }))
    });

    let err = credential_service(identityd.path(), keyd.path())
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeviceError::IdentityUnavailable(_)));
    assert!(keyd.requests().is_empty());
}

#[tokio::test]
async fn test_cancel_while_signing_stalls() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = FakeDaemon::start(dir.path().join("identityd.sock"), |_| {
        (StatusCode::OK, identity_envelope(None))
    });
    let keyd = StallingDaemon::start(dir.path().join("keyd.sock"));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = credential_service(identityd.path(), &dir.path().join("keyd.sock"))
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, DeviceError::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(identityd.requests().len(), 1);
    assert_eq!(keyd.accepted(), 1);
}

#[tokio::test]
async fn test_cancel_while_identity_stalls() {
    let dir = tempfile::tempdir().unwrap();
    let identityd = StallingDaemon::start(dir.path().join("identityd.sock"));
    let keyd = FakeDaemon::start(dir.path().join("keyd.sock"), |_| {
        (StatusCode::OK, serde_json::json!({ "signature": "abc123" }))
    });

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = credential_service(&dir.path().join("identityd.sock"), keyd.path())
        .derive_credential(TokenExpiry::from_unix_seconds(EXPIRY), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, DeviceError::Cancelled);
    assert_eq!(identityd.accepted(), 1);
    assert!(keyd.requests().is_empty());
}
