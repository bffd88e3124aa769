//! Board configuration: contract addresses, storage endpoints, API, logging
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::data_model::Address;
use crate::error::{BountyError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub contracts: ContractsConfig,
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Escrow contract holding bounties
    pub bounty_contract: Address,
    /// Fungible reward token; amounts use `REWARD_DECIMALS`
    pub reward_token: Address,
    /// Label stored in uploaded documents
    pub network: String,
    pub platform: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            bounty_contract: Address::new("0xCbcBF569D75B9C00B2469857c66767bA833FC641"),
            reward_token: Address::new("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
            network: "Base".to_string(),
            platform: "Bountyboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the content-addressed storage node
    pub endpoint: String,
    /// Ask the network to persist uploads; failures only log a warning
    pub request_persistence: bool,
    pub persistence: PersistenceOptions,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/api/codex/v1".to_string(),
            request_persistence: true,
            persistence: PersistenceOptions::default(),
            timeout_secs: 30,
        }
    }
}

/// Durability hint sent after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceOptions {
    /// Seconds
    pub duration: u64,
    pub price_per_byte_per_second: String,
    pub proof_probability: String,
    #[serde(rename = "nodes")]
    pub node_count: u32,
    pub tolerance: u32,
    pub collateral_per_byte: String,
    /// Seconds
    pub expiry: u64,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            duration: 2_592_000,
            price_per_byte_per_second: "1000000000000000".to_string(),
            proof_probability: "0.1".to_string(),
            node_count: 3,
            tolerance: 1,
            collateral_per_byte: "2000000000000000000".to_string(),
            expiry: 86_400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Base URL of the metadata-resolution service (`GET {base}/metadata?cid=`)
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8787".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl BoardConfig {
    /// Load from a YAML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BountyError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&content)?;
        config.with_env_overrides().validated()
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| BountyError::Config(e.to_string()))
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides().validated()
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `BOUNTY_*` overrides through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup("BOUNTY_ADDR") {
            self.api.addr = addr;
        }
        if let Some(url) = lookup("BOUNTY_STORAGE_URL") {
            self.storage.endpoint = url;
        }
        if let Some(url) = lookup("BOUNTY_METADATA_URL") {
            self.metadata.endpoint = url;
        }
        if let Some(contract) = lookup("BOUNTY_CONTRACT") {
            self.contracts.bounty_contract = Address::new(contract);
        }
        if let Some(token) = lookup("BOUNTY_TOKEN") {
            self.contracts.reward_token = Address::new(token);
        }
        self
    }

    pub fn validated(self) -> Result<Self> {
        if self.storage.endpoint.trim().is_empty() {
            return Err(BountyError::Config("storage.endpoint is empty".to_string()));
        }
        if self.metadata.endpoint.trim().is_empty() {
            return Err(BountyError::Config("metadata.endpoint is empty".to_string()));
        }
        if self.metadata.timeout_secs == 0 {
            return Err(BountyError::Config("metadata.timeout_secs must be positive".to_string()));
        }
        Ok(self)
    }
}
