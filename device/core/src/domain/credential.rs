// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared access credential
//!
//! Builds the string-to-sign for a device and assembles the connection
//! credential once the key custody daemon has signed it.
//!
//! # Wire format
//!
//! ```text
//! HostName=<hub>;DeviceId=<id>;SharedAccessSignature=SharedAccessSignature sr=<uri>&se=<exp>&sig=<sig>[;GatewayHost=<gw>]
//! ```
//!
//! Field order inside the signature value (`sr`, `se`, `sig`) is fixed.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Signable payload builder, credential assembler and parser

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::domain::error::DeviceError;
use crate::domain::identity::DeviceIdentity;

/// Escapes everything except the URI unreserved set.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const SAS_SCHEME: &str = "SharedAccessSignature";

/// Default credential lifetime: one day.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Percent-encode a value for use in a URL path segment or query value.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Expiry instant of a credential, in seconds since the Unix epoch.
///
/// Computed once per process and threaded explicitly into both the payload
/// builder and the assembler so the signed `se` and the emitted `se` agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenExpiry(i64);

impl TokenExpiry {
    pub fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// `now + ttl`, read from the system clock.
    pub fn after(ttl: Duration) -> Self {
        Self::at(Utc::now(), ttl)
    }

    pub fn at(now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self(now.timestamp().saturating_add(ttl))
    }

    pub fn as_unix_seconds(&self) -> i64 {
        self.0
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.0
    }
}

impl fmt::Display for TokenExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical string-to-sign for one identity and expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignablePayload {
    /// Percent-encoded, lowercase `<hub>/devices/<deviceId>`.
    pub resource_uri: String,
    pub expiry: TokenExpiry,
    /// Base64 of `resource_uri + "\n" + expiry`.
    pub encoded_message: String,
}

/// Resource URI addressed by a device credential.
pub fn resource_uri(identity: &DeviceIdentity) -> String {
    let raw = format!("{}/devices/{}", identity.hub_endpoint, identity.device_id).to_lowercase();
    encode_uri_component(&raw)
}

/// Build the payload the key custody daemon signs. Pure and deterministic.
pub fn build_signable_payload(identity: &DeviceIdentity, expiry: TokenExpiry) -> SignablePayload {
    let resource_uri = resource_uri(identity);
    let string_to_sign = format!("{}\n{}", resource_uri, expiry);
    let encoded_message = STANDARD.encode(string_to_sign.as_bytes());

    SignablePayload {
        resource_uri,
        expiry,
        encoded_message,
    }
}

/// Signature returned by the key custody daemon, already escaped for use as
/// a URL query value.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    /// Wrap the raw signature returned by the key service.
    pub fn from_raw(raw: &str) -> Result<Self, DeviceError> {
        if raw.trim().is_empty() {
            return Err(DeviceError::SigningUnavailable(
                "key service returned an empty signature".to_string(),
            ));
        }
        Ok(Self(encode_uri_component(raw)))
    }

    pub fn as_query_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signature(<redacted>)")
    }
}

/// Complete connection credential, consumed once to open a session.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionCredential {
    value: String,
    expiry: TokenExpiry,
}

impl ConnectionCredential {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn expiry(&self) -> TokenExpiry {
        self.expiry
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Debug for ConnectionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCredential")
            .field("expiry", &self.expiry)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Combine a signature with the identity and payload it was produced for.
///
/// Missing fields are precondition violations reported as
/// [`DeviceError::CredentialMalformed`].
pub fn assemble_credential(
    identity: &DeviceIdentity,
    signature: &Signature,
    payload: &SignablePayload,
) -> Result<ConnectionCredential, DeviceError> {
    if identity.device_id.is_empty() {
        return Err(DeviceError::CredentialMalformed("device id is empty".to_string()));
    }
    if identity.hub_endpoint.is_empty() {
        return Err(DeviceError::CredentialMalformed("hub endpoint is empty".to_string()));
    }
    if signature.as_query_value().is_empty() {
        return Err(DeviceError::CredentialMalformed("signature is empty".to_string()));
    }
    if payload.resource_uri != resource_uri(identity) {
        return Err(DeviceError::CredentialMalformed(format!(
            "payload resource '{}' does not belong to device '{}'",
            payload.resource_uri, identity.device_id
        )));
    }

    let token = format!(
        "sr={}&se={}&sig={}",
        payload.resource_uri,
        payload.expiry,
        signature.as_query_value()
    );

    let mut value = format!(
        "HostName={};DeviceId={};SharedAccessSignature={} {}",
        identity.hub_endpoint, identity.device_id, SAS_SCHEME, token
    );
    if identity.uses_gateway() {
        value.push_str(";GatewayHost=");
        value.push_str(&identity.gateway_endpoint);
    }

    Ok(ConnectionCredential {
        value,
        expiry: payload.expiry,
    })
}

/// Fields of a `SharedAccessSignature sr=..&se=..&sig=..` value.
#[derive(Clone, PartialEq, Eq)]
pub struct SasToken {
    pub resource_uri: String,
    pub expiry: TokenExpiry,
    pub signature: String,
}

impl fmt::Debug for SasToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasToken")
            .field("resource_uri", &self.resource_uri)
            .field("expiry", &self.expiry)
            .field("signature", &"<redacted>")
            .finish()
    }
}

impl SasToken {
    pub fn parse(value: &str) -> Result<Self, DeviceError> {
        let query = value
            .strip_prefix(SAS_SCHEME)
            .map(str::trim_start)
            .ok_or_else(|| malformed("shared access signature is missing its scheme"))?;

        let mut resource_uri = None;
        let mut expiry = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("sr", v)) => resource_uri = Some(v.to_string()),
                Some(("se", v)) => {
                    let seconds = v
                        .parse::<i64>()
                        .map_err(|_| malformed(&format!("invalid expiry '{}'", v)))?;
                    expiry = Some(TokenExpiry::from_unix_seconds(seconds));
                }
                Some(("sig", v)) => signature = Some(v.to_string()),
                _ => {}
            }
        }

        Ok(Self {
            resource_uri: resource_uri.ok_or_else(|| malformed("missing 'sr'"))?,
            expiry: expiry.ok_or_else(|| malformed("missing 'se'"))?,
            signature: signature.ok_or_else(|| malformed("missing 'sig'"))?,
        })
    }

    /// Decoded `<hub>/devices/<deviceId>` path.
    pub fn decoded_resource(&self) -> String {
        percent_decode_str(&self.resource_uri)
            .decode_utf8_lossy()
            .into_owned()
    }
}

/// Parsed form of a [`ConnectionCredential`], used by transports.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub host_name: String,
    pub device_id: String,
    /// Full `SharedAccessSignature sr=..` value, as sent in `Authorization`.
    pub shared_access_signature: String,
    pub gateway_host: Option<String>,
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("device_id", &self.device_id)
            .field("gateway_host", &self.gateway_host)
            .finish_non_exhaustive()
    }
}

impl ConnectionString {
    pub fn parse(value: &str) -> Result<Self, DeviceError> {
        let mut host_name = None;
        let mut device_id = None;
        let mut shared_access_signature = None;
        let mut gateway_host = None;

        for segment in value.split(';').filter(|s| !s.is_empty()) {
            let (key, val) = segment
                .split_once('=')
                .ok_or_else(|| malformed(&format!("segment without '=': {}", segment)))?;
            match key {
                "HostName" => host_name = Some(val.to_string()),
                "DeviceId" => device_id = Some(val.to_string()),
                "SharedAccessSignature" => shared_access_signature = Some(val.to_string()),
                "GatewayHost" => gateway_host = Some(val.to_string()),
                _ => {}
            }
        }

        let parsed = Self {
            host_name: host_name.filter(|v| !v.is_empty()).ok_or_else(|| malformed("missing HostName"))?,
            device_id: device_id.filter(|v| !v.is_empty()).ok_or_else(|| malformed("missing DeviceId"))?,
            shared_access_signature: shared_access_signature
                .filter(|v| !v.is_empty())
                .ok_or_else(|| malformed("missing SharedAccessSignature"))?,
            gateway_host,
        };
        Ok(parsed)
    }

    pub fn sas_token(&self) -> Result<SasToken, DeviceError> {
        SasToken::parse(&self.shared_access_signature)
    }

    /// Host the session connects to: the gateway when present, else the hub.
    pub fn target_host(&self) -> &str {
        self.gateway_host.as_deref().unwrap_or(&self.host_name)
    }
}

fn malformed(reason: &str) -> DeviceError {
    DeviceError::CredentialMalformed(reason.to_string())
}
