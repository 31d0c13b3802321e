// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Local socket HTTP client
//!
//! Single-shot HTTP/1.1 over a Unix domain socket. Every call opens a fresh
//! connection, performs exactly one exchange and drops it. Each call races
//! the cancellation token and a per-call timeout.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Transport shared by the identity and key daemon clients

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONNECTION, CONTENT_TYPE, HOST};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LocalSocketError {
    #[error("Failed to connect to {path:?}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,
}

/// Status and fully-buffered body of a local daemon response.
#[derive(Debug, Clone)]
pub struct LocalResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl LocalResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct LocalSocketClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl LocalSocketClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn get(
        &self,
        path_and_query: &str,
        cancel: &CancellationToken,
    ) -> Result<LocalResponse, LocalSocketError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path_and_query)
            .header(HOST, "localhost")
            .header(CONNECTION, "close")
            .body(Full::new(Bytes::new()))?;

        self.send(request, cancel).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path_and_query: &str,
        body: &T,
        cancel: &CancellationToken,
    ) -> Result<LocalResponse, LocalSocketError> {
        let payload = serde_json::to_vec(body)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(path_and_query)
            .header(HOST, "localhost")
            .header(CONNECTION, "close")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))?;

        self.send(request, cancel).await
    }

    async fn send(
        &self,
        request: Request<Full<Bytes>>,
        cancel: &CancellationToken,
    ) -> Result<LocalResponse, LocalSocketError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LocalSocketError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.exchange(request)) => {
                result.unwrap_or(Err(LocalSocketError::Timeout(self.timeout)))
            }
        }
    }

    async fn exchange(&self, request: Request<Full<Bytes>>) -> Result<LocalResponse, LocalSocketError> {
        debug!(socket = ?self.socket_path, method = %request.method(), uri = %request.uri(), "Local socket request");

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| LocalSocketError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("Local socket connection ended with error: {}", e);
            }
        });

        let result = async {
            let response = sender.send_request(request).await?;
            let status = response.status();
            let body = response.into_body().collect().await?.to_bytes();
            Ok::<_, LocalSocketError>(LocalResponse { status, body })
        }
        .await;

        drop(sender);
        connection.abort();

        result
    }
}
