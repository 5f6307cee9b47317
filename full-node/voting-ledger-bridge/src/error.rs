use std::time::Duration;

use ethers_core::types::H256;
use thiserror::Error;

use crate::LedgerAddress;

/// Hint returned alongside [`BridgeError::NotDeployed`].
pub const REDEPLOY_HINT: &str =
    "Run the deployment script first: npx hardhat run scripts/deploy.js --network localhost";

/// Every failure the bridge can surface to its callers.
///
/// Each variant maps to one stable [`BridgeError::category`] so the HTTP layer
/// can distinguish them without string matching.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The node could not be reached, or the transport failed mid-request.
    #[error("ledger node unreachable: {0}")]
    Connection(String),
    /// No program is deployed at the configured address.
    #[error("no contract deployed at {address}")]
    NotDeployed {
        /// The configured address that holds no code.
        address: LedgerAddress,
        /// What the operator should do about it.
        remediation: &'static str,
    },
    /// A read-only call was rejected, reverted, or returned undecodable data.
    #[error("contract call `{method}` failed: {reason}")]
    Call {
        /// Contract method that was called.
        method: String,
        /// Reason reported by the node or the decoder.
        reason: String,
    },
    /// The contract rejected a state-changing call.
    #[error("transaction reverted: {0}")]
    Revert(String),
    /// The signing credential is malformed or signing failed.
    #[error("invalid signing credential: {0}")]
    Signing(String),
    /// The node refused or dropped the transaction before inclusion.
    #[error("transaction submission failed: {0}")]
    Submission(String),
    /// The transaction was sent but no receipt arrived in time.
    /// It may still be mined later.
    #[error("transaction {tx_hash:?} not confirmed after {waited:?}")]
    Timeout {
        /// Hash to poll later.
        tx_hash: H256,
        /// How long the bridge waited.
        waited: Duration,
    },
    /// The request itself is invalid and was never sent to the ledger.
    #[error("{0}")]
    Validation(String),
}

impl BridgeError {
    /// Stable category name exposed in error payloads.
    pub fn category(&self) -> &'static str {
        match self {
            BridgeError::Connection(_) => "connection",
            BridgeError::NotDeployed { .. } => "notDeployed",
            BridgeError::Call { .. } => "call",
            BridgeError::Revert(_) => "revert",
            BridgeError::Signing(_) => "signing",
            BridgeError::Submission(_) => "submission",
            BridgeError::Timeout { .. } => "timeout",
            BridgeError::Validation(_) => "validation",
        }
    }

    /// Returns true for failures reported by the contract for a read call.
    /// These are the only failures the candidate retrieval strategy absorbs.
    pub fn is_call_failure(&self) -> bool {
        matches!(self, BridgeError::Call { .. })
    }

    pub(crate) fn call(method: impl Into<String>, reason: impl ToString) -> Self {
        BridgeError::Call {
            method: method.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type used throughout the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;
