// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Fake local daemons
//
// Serves HTTP/1.1 on a Unix socket inside a temp directory and captures every
// request for assertions.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub uri: Uri,
    pub body: Bytes,
}

impl CapturedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

type Responder = Arc<dyn Fn(&CapturedRequest) -> (StatusCode, Value) + Send + Sync>;

pub struct FakeDaemon {
    path: PathBuf,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl FakeDaemon {
    pub fn start<F>(path: impl AsRef<Path>, responder: F) -> Self
    where
        F: Fn(&CapturedRequest) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let listener = UnixListener::bind(&path).expect("bind fake daemon socket");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);
        let requests_task = Arc::clone(&requests);

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { continue };
                let requests = Arc::clone(&requests_task);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let requests = Arc::clone(&requests);
                        let responder = Arc::clone(&responder);
                        async move {
                            let (parts, body) = req.into_parts();
                            let body = body.collect().await?.to_bytes();
                            let captured = CapturedRequest {
                                method: parts.method,
                                uri: parts.uri,
                                body,
                            };
                            let (status, json) = responder(&captured);
                            requests.lock().unwrap().push(captured);

                            let mut response = Response::new(Full::new(Bytes::from(json.to_string())));
                            *response.status_mut() = status;
                            Ok::<_, hyper::Error>(response)
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { path, requests, handle }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Accepts connections and never answers.
pub struct StallingDaemon {
    accepted: Arc<Mutex<usize>>,
    handle: JoinHandle<()>,
}

impl StallingDaemon {
    pub fn start(path: impl AsRef<Path>) -> Self {
        let listener = UnixListener::bind(path.as_ref()).expect("bind stalling socket");
        let accepted = Arc::new(Mutex::new(0));
        let accepted_task = Arc::clone(&accepted);
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                *accepted_task.lock().unwrap() += 1;
                held.push(stream);
            }
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        Self { accepted, handle }
    }

    pub fn accepted(&self) -> usize {
        *self.accepted.lock().unwrap()
    }
}

impl Drop for StallingDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn identity_envelope(gateway_host: Option<&str>) -> Value {
    let mut spec = serde_json::json!({
        "hubName": "hub.example.net",
        "deviceId": "sensor-1",
        "moduleId": "telemetry",
        "auth": { "type": "sas", "keyHandle": "k1" }
    });
    if let Some(gateway) = gateway_host {
        spec["gatewayHost"] = Value::String(gateway.to_string());
    }
    serde_json::json!({ "type": "aziot", "spec": spec })
}
