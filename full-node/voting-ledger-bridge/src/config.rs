use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::address::AddressError;
use crate::{LedgerAddress, SigningCredential};

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 60;
/// Upper bound on positional reads when the bulk getter is unavailable.
pub const DEFAULT_SCAN_BOUND: u64 = 10;

const CONTRACT_ADDRESS_KEY: &str = "CONTRACT_ADDRESS";
const FORWARDER_ADDRESS_KEY: &str = "FORWARDER_ADDRESS";
const PRIVATE_KEY_KEY: &str = "PRIVATE_KEY";

/// Reasons the bridge refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `node.endpoint` is blank.
    #[error("node endpoint must not be empty")]
    EmptyEndpoint,
    /// `node.endpoint` is not a URL.
    #[error("invalid node endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        /// The rejected value.
        endpoint: String,
        /// Parser error.
        source: url::ParseError,
    },
    /// `node.confirmation_timeout_secs` is zero.
    #[error("confirmation timeout must be positive")]
    ZeroConfirmationTimeout,
    /// `node.poll_interval_ms` is zero.
    #[error("receipt poll interval must be positive")]
    ZeroPollInterval,
    /// `retrieval.scan_bound` is zero.
    #[error("candidate scan bound must be positive")]
    ZeroScanBound,
    /// The deployment record could not be read.
    #[error("cannot read deployment record {path:?}: {source}")]
    DeploymentRecordUnreadable {
        /// Where the record was expected.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The deployment record has no contract address.
    #[error("deployment record has no CONTRACT_ADDRESS; deploy the contract first")]
    MissingContractAddress,
    /// An address in the deployment record is malformed.
    #[error("{key} in deployment record is invalid: {source}")]
    InvalidAddress {
        /// Record key holding the bad value.
        key: &'static str,
        /// Validation failure.
        source: AddressError,
    },
}

/// Ledger node settings, as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeConfigFile {
    /// JSON-RPC endpoint of the node.
    pub endpoint: String,
    /// Chain id to sign for. Queried from the node when absent.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// How often to poll for a receipt.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long to wait for a receipt before giving up.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

/// Candidate retrieval settings, as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrievalConfigFile {
    /// Maximum number of positional reads in the fallback scan.
    #[serde(default = "default_scan_bound")]
    pub scan_bound: u64,
}

impl Default for RetrievalConfigFile {
    fn default() -> Self {
        Self {
            scan_bound: DEFAULT_SCAN_BOUND,
        }
    }
}

/// Bridge configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BridgeConfigFile {
    /// `.env`-style file written by the deployment script.
    pub deployment_file: PathBuf,
    /// Node settings.
    pub node: NodeConfigFile,
    /// Retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfigFile,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_scan_bound() -> u64 {
    DEFAULT_SCAN_BOUND
}

/// Validated ledger node settings.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// JSON-RPC endpoint of the node.
    pub endpoint: Url,
    /// Chain id to sign for, if pinned.
    pub chain_id: Option<u64>,
    /// Receipt polling interval.
    pub poll_interval: Duration,
    /// Upper bound on the confirmation wait.
    pub confirmation_timeout: Duration,
}

/// Addresses and key published by the deployment script.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    /// Address of the voting contract.
    pub contract_address: LedgerAddress,
    /// Address of the meta-transaction forwarder, if recorded.
    pub forwarder_address: Option<LedgerAddress>,
    /// Operator key, unless the placeholder was written.
    pub default_credential: Option<SigningCredential>,
}

impl DeploymentRecord {
    /// Reads and parses a deployment record file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::DeploymentRecordUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&contents)
    }

    /// Parses `KEY=VALUE` lines. Blank lines and `#` comments are skipped;
    /// values may be quoted.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut contract_address = None;
        let mut forwarder_address = None;
        let mut default_credential = None;

        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                CONTRACT_ADDRESS_KEY if !value.is_empty() => {
                    contract_address = Some(parse_address(CONTRACT_ADDRESS_KEY, value)?);
                }
                FORWARDER_ADDRESS_KEY if !value.is_empty() => {
                    forwarder_address = Some(parse_address(FORWARDER_ADDRESS_KEY, value)?);
                }
                PRIVATE_KEY_KEY => default_credential = SigningCredential::from_optional(value),
                _ => {}
            }
        }

        Ok(Self {
            contract_address: contract_address.ok_or(ConfigError::MissingContractAddress)?,
            forwarder_address,
            default_credential,
        })
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

fn parse_address(key: &'static str, value: &str) -> Result<LedgerAddress, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::InvalidAddress { key, source })
}

/// Everything the bridge needs, validated once at startup and passed to each
/// component at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Published contract addresses.
    pub deployment: DeploymentRecord,
    /// Node settings.
    pub node: NodeConfig,
    /// Fallback scan bound.
    pub scan_bound: u64,
}

impl BridgeConfig {
    /// The voting contract address.
    pub fn ledger_address(&self) -> LedgerAddress {
        self.deployment.contract_address
    }
}

impl BridgeConfigFile {
    /// Validates the settings and loads the deployment record.
    /// A relative `deployment_file` is resolved against `base_dir`.
    pub fn validate(self, base_dir: &Path) -> Result<BridgeConfig, ConfigError> {
        let node = self.node.validate()?;
        if self.retrieval.scan_bound == 0 {
            return Err(ConfigError::ZeroScanBound);
        }
        let deployment = DeploymentRecord::from_path(base_dir.join(&self.deployment_file))?;

        Ok(BridgeConfig {
            deployment,
            node,
            scan_bound: self.retrieval.scan_bound,
        })
    }
}

impl NodeConfigFile {
    fn validate(self) -> Result<NodeConfig, ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        let endpoint = Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::ZeroConfirmationTimeout);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        Ok(NodeConfig {
            endpoint,
            chain_id: self.chain_id,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
        })
    }
}

/// Reads a TOML file into any deserializable config type.
pub fn from_toml_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let mut contents = String::new();
    {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    }

    let result: R = toml::from_str(&contents)?;

    Ok(result)
}
