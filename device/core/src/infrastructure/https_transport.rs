// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// HTTPS Telemetry Transport
//
// Device-to-cloud messages over the endpoint's HTTPS surface. HTTPS is
// connectionless, so opening a session validates the credential and fixes the
// target URL; the first send is the first network contact.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::domain::credential::{encode_uri_component, ConnectionCredential, ConnectionString};
use crate::domain::error::DeviceError;
use crate::domain::session::{DeviceTransport, TelemetryMessage, TelemetrySession};

pub struct HttpsTelemetryTransport {
    client: reqwest::Client,
    api_version: String,
    base_url: Option<String>,
}

impl HttpsTelemetryTransport {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_version: api_version.into(),
            base_url: None,
        }
    }

    /// Send to `base_url` instead of `https://<target host>`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn events_url(&self, connection: &ConnectionString) -> String {
        let base = match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}", connection.target_host()),
        };
        format!(
            "{}/devices/{}/messages/events?api-version={}",
            base,
            encode_uri_component(&connection.device_id),
            self.api_version
        )
    }
}

#[async_trait]
impl DeviceTransport for HttpsTelemetryTransport {
    async fn open(&self, credential: ConnectionCredential) -> Result<Box<dyn TelemetrySession>, DeviceError> {
        let connection = ConnectionString::parse(credential.as_str())
            .map_err(|e| DeviceError::SessionOpenFailed(e.to_string()))?;
        let token = connection
            .sas_token()
            .map_err(|e| DeviceError::SessionOpenFailed(e.to_string()))?;

        if token.expiry.is_expired_at(Utc::now()) {
            return Err(DeviceError::SessionOpenFailed(format!(
                "credential expired at {}",
                token.expiry
            )));
        }

        let events_url = self.events_url(&connection);
        info!(
            host = %connection.target_host(),
            device_id = %connection.device_id,
            "HTTPS telemetry session ready"
        );

        Ok(Box::new(HttpsTelemetrySession {
            client: self.client.clone(),
            events_url,
            authorization: connection.shared_access_signature,
            closed: false,
        }))
    }
}

struct HttpsTelemetrySession {
    client: reqwest::Client,
    events_url: String,
    authorization: String,
    closed: bool,
}

#[async_trait]
impl TelemetrySession for HttpsTelemetrySession {
    async fn send(&mut self, message: TelemetryMessage) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::SessionRunFailed("session is closed".to_string()));
        }

        let response = self
            .client
            .post(&self.events_url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::CONTENT_TYPE, &message.content_type)
            .header("iothub-messageid", &message.message_id)
            .body(message.body.clone())
            .send()
            .await
            .map_err(|e| DeviceError::SessionRunFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DeviceError::SessionRunFailed(format!("HTTP {}: {}", status, error_text)));
        }

        debug!(message_id = %message.message_id, "Telemetry message accepted");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.closed = true;
        Ok(())
    }
}
