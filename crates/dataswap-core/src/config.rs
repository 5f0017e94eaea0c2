//! Sync layer configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::client::is_hex_address;
use crate::error::ConfigError;
use crate::telemetry::LogConfig;

/// Chain RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP JSON-RPC endpoint, e.g. "https://api.calibration.node.glif.io/rpc/v1"
    pub url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 { 30_000 }

/// Deployed addresses of the four protocol contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub escrow: String,
    pub dataset_requirement: String,
    pub dataset_proof: String,
    pub matching_target: String,
}

impl ContractAddresses {
    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("escrow", self.escrow.as_str()),
            ("dataset_requirement", self.dataset_requirement.as_str()),
            ("dataset_proof", self.dataset_proof.as_str()),
            ("matching_target", self.matching_target.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Database URL or file path (sqlite only), e.g. "sqlite://dataswap.db"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub rpc: RpcConfig,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Number of proof leaves fetched per `getDatasetProof` page
    #[serde(default = "default_proof_page_size")]
    pub proof_page_size: u64,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_proof_page_size() -> u64 { 100 }

impl SyncConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file and validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("cannot read {}: {e}", path.display())))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(ConfigError::Invalid(format!(
                "unsupported config format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc.url is empty".into()));
        }
        if self.rpc.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("rpc.request_timeout_ms must be > 0".into()));
        }
        for (name, address) in self.contracts.entries() {
            if !is_hex_address(address) {
                return Err(ConfigError::Invalid(format!(
                    "contracts.{name}: '{address}' is not a 20-byte hex address"
                )));
            }
        }
        if self.proof_page_size == 0 {
            return Err(ConfigError::Invalid("proof_page_size must be > 0".into()));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.storage.path.is_none() {
            return Err(ConfigError::Invalid("storage.path is required for the sqlite backend".into()));
        }
        Ok(())
    }
}
