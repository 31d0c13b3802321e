// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Key Service Client
//
// Asks the local key custody daemon to sign a payload under a key handle.
// The request carries the handle, the algorithm and the message; there is no
// field that could carry key bytes, and the response is only read for its
// `signature`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::credential::{SignablePayload, Signature};
use crate::domain::device_config::LocalServiceConfig;
use crate::domain::error::DeviceError;
use crate::domain::identity::DeviceIdentity;
use crate::domain::signing::{KeySigner, SIGNING_ALGORITHM};
use crate::infrastructure::local_socket::{LocalSocketClient, LocalSocketError};

pub struct KeyServiceClient {
    client: LocalSocketClient,
    api_version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    key_handle: &'a str,
    algorithm: &'static str,
    parameters: SignParameters<'a>,
}

#[derive(Debug, Serialize)]
struct SignParameters<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(default)]
    signature: Option<String>,
}

impl KeyServiceClient {
    pub fn new(config: &LocalServiceConfig, timeout: Duration) -> Self {
        Self {
            client: LocalSocketClient::new(&config.socket_path, timeout),
            api_version: config.api_version.clone(),
        }
    }

    fn request_path(&self) -> String {
        format!("/sign?api-version={}", self.api_version)
    }
}

fn sign_request<'a>(identity: &'a DeviceIdentity, payload: &'a SignablePayload) -> SignRequest<'a> {
    SignRequest {
        key_handle: &identity.key_handle,
        algorithm: SIGNING_ALGORITHM,
        parameters: SignParameters {
            message: &payload.encoded_message,
        },
    }
}

fn map_socket_error(err: LocalSocketError) -> DeviceError {
    match err {
        LocalSocketError::Cancelled => DeviceError::Cancelled,
        other => DeviceError::SigningUnavailable(other.to_string()),
    }
}

#[async_trait]
impl KeySigner for KeyServiceClient {
    async fn sign(
        &self,
        identity: &DeviceIdentity,
        payload: &SignablePayload,
        cancel: &CancellationToken,
    ) -> Result<Signature, DeviceError> {
        debug!(socket = ?self.client.socket_path(), key_handle = %identity.key_handle, "Requesting signature");

        let response = self
            .client
            .post_json(&self.request_path(), &sign_request(identity, payload), cancel)
            .await
            .map_err(map_socket_error)?;

        if !response.is_success() {
            return Err(DeviceError::SigningUnavailable(format!(
                "HTTP {}: {}",
                response.status,
                response.text()
            )));
        }

        let sign_response: SignResponse = response
            .json()
            .map_err(|e| DeviceError::SigningUnavailable(format!("Failed to parse sign response: {}", e)))?;

        let raw = sign_response.signature.unwrap_or_default();
        let signature = Signature::from_raw(&raw)?;

        info!(key_handle = %identity.key_handle, "Payload signed by key service");
        Ok(signature)
    }
}
