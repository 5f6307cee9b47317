#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod address;
mod bridge;
mod client;
mod config;
pub mod contract;
mod credential;
mod error;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
mod presence;
pub mod retrieval;
mod types;
mod vote;

pub use address::{AddressError, LedgerAddress};
pub use bridge::LedgerBridge;
pub use client::{EthersLedgerClient, LedgerClient};
pub use config::{
    from_toml_path, BridgeConfig, BridgeConfigFile, ConfigError, DeploymentRecord, NodeConfig,
    NodeConfigFile, RetrievalConfigFile, DEFAULT_SCAN_BOUND,
};
pub use credential::{SigningCredential, SigningIdentity};
pub use error::{BridgeError, BridgeResult, REDEPLOY_HINT};
pub use presence::ensure_deployed;
pub use types::{
    CandidateRecord, RawCandidate, TransactionReceipt, TransactionState, TransactionStatus,
};
pub use vote::{submit_vote, VoteRequest};
