// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Device Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) for the device
// agent. Every default equals the fixed value the agent uses when no file is
// present, so an empty configuration behaves exactly like no configuration.
// The signing algorithm is deliberately not configurable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "edge-telemetry/v1";
pub const KIND: &str = "DeviceConfig";

pub const CONFIG_PATH_ENV: &str = "EDGE_TELEMETRY_CONFIG_PATH";
pub const IDENTITY_SOCKET_ENV: &str = "EDGE_TELEMETRY_IDENTITY_SOCKET";
pub const KEY_SOCKET_ENV: &str = "EDGE_TELEMETRY_KEY_SOCKET";

/// Top-level device configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfigManifest {
    /// API version (must be "edge-telemetry/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "DeviceConfig")
    pub kind: String,

    #[serde(default)]
    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: DeviceConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

impl Default for ManifestMetadata {
    fn default() -> Self {
        Self {
            name: "edge-device".to_string(),
            labels: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfigSpec {
    /// Identity custody daemon
    #[serde(default = "default_identity_service")]
    pub identity_service: LocalServiceConfig,

    /// Key custody daemon
    #[serde(default = "default_key_service")]
    pub key_service: LocalServiceConfig,

    #[serde(default)]
    pub credential: CredentialConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Upper bound on each local daemon request
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for DeviceConfigSpec {
    fn default() -> Self {
        Self {
            identity_service: default_identity_service(),
            key_service: default_key_service(),
            credential: CredentialConfig::default(),
            telemetry: TelemetryConfig::default(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Location of a local daemon reachable over a Unix domain socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalServiceConfig {
    pub socket_path: PathBuf,

    #[serde(default = "default_local_api_version")]
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Lifetime of the derived credential
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Delay between telemetry messages
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// How long to wait for the session to close
    #[serde(default = "default_close_timeout_seconds")]
    pub close_timeout_seconds: u64,

    /// api-version query parameter sent to the remote endpoint
    #[serde(default = "default_transport_api_version")]
    pub transport_api_version: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            close_timeout_seconds: default_close_timeout_seconds(),
            transport_api_version: default_transport_api_version(),
        }
    }
}

impl Default for DeviceConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata::default(),
            spec: DeviceConfigSpec::default(),
        }
    }
}

impl DeviceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Standard discovery locations, in precedence order (after `--config`).
    pub fn discovery_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./edge-telemetry.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".edge-telemetry").join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/edge-telemetry/config.yaml"));
        paths
    }

    /// First existing file among [`Self::discovery_paths`]
    pub fn discover_config() -> Option<PathBuf> {
        Self::discovery_paths().into_iter().find(|p| p.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(&config_path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", config_path, e))?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(IDENTITY_SOCKET_ENV).filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: {}={}", IDENTITY_SOCKET_ENV, path);
            self.spec.identity_service.socket_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(KEY_SOCKET_ENV).filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: {}={}", KEY_SOCKET_ENV, path);
            self.spec.key_service.socket_path = PathBuf::from(path);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        for (name, service) in [
            ("identity_service", &self.spec.identity_service),
            ("key_service", &self.spec.key_service),
        ] {
            if service.socket_path.as_os_str().is_empty() {
                anyhow::bail!("spec.{}.socket_path cannot be empty", name);
            }
            if service.api_version.is_empty() {
                anyhow::bail!("spec.{}.api_version cannot be empty", name);
            }
        }

        if self.spec.identity_service.socket_path == self.spec.key_service.socket_path {
            anyhow::bail!("identity and key services must use distinct sockets");
        }

        if self.spec.credential.ttl_seconds == 0 {
            anyhow::bail!("spec.credential.ttl_seconds must be greater than zero");
        }
        if self.spec.telemetry.interval_seconds == 0 {
            anyhow::bail!("spec.telemetry.interval_seconds must be greater than zero");
        }
        if self.spec.request_timeout_seconds == 0 {
            anyhow::bail!("spec.request_timeout_seconds must be greater than zero");
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.spec.request_timeout_seconds)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.spec.credential.ttl_seconds)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.spec.telemetry.interval_seconds)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.spec.telemetry.close_timeout_seconds)
    }
}

fn default_identity_service() -> LocalServiceConfig {
    LocalServiceConfig {
        socket_path: PathBuf::from("/run/aziot/identityd.sock"),
        api_version: default_local_api_version(),
    }
}

fn default_key_service() -> LocalServiceConfig {
    LocalServiceConfig {
        socket_path: PathBuf::from("/run/aziot/keyd.sock"),
        api_version: default_local_api_version(),
    }
}

fn default_local_api_version() -> String {
    "2020-09-01".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_ttl_seconds() -> u64 {
    24 * 60 * 60
}

fn default_interval_seconds() -> u64 {
    1
}

fn default_close_timeout_seconds() -> u64 {
    5
}

fn default_transport_api_version() -> String {
    "2020-03-13".to_string()
}
