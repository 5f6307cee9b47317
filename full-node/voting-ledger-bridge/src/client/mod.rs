//! Access to the ledger node.

mod json_rpc;

use async_trait::async_trait;
use ethers_core::abi::Token;
use ethers_core::types::{Bytes, H256};
pub use self::json_rpc::EthersLedgerClient;

use crate::{BridgeResult, LedgerAddress, SigningIdentity, TransactionReceipt, TransactionStatus};

/// The only way the bridge talks to a ledger node.
///
/// Implementations own the node connection and must be usable from many
/// requests at once without extra locking; the node itself orders writes.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    /// Returns the code deployed at `address`. Empty bytes mean nothing is
    /// deployed, which is not an error.
    async fn get_code(&self, address: LedgerAddress) -> BridgeResult<Bytes>;

    /// Calls a view method without changing ledger state and returns its
    /// decoded outputs.
    ///
    /// Fails with [`crate::BridgeError::Call`] when the method does not exist,
    /// reverts, or returns undecodable data.
    async fn call_read(
        &self,
        address: LedgerAddress,
        method: &str,
        args: &[Token],
    ) -> BridgeResult<Vec<Token>>;

    /// Signs a call to `method` as `signer`, sends it, and waits until the
    /// node reports it mined or the confirmation wait runs out.
    ///
    /// Once sent, the transaction cannot be recalled, even if the caller stops
    /// waiting for this future.
    async fn submit_transaction(
        &self,
        address: LedgerAddress,
        method: &str,
        args: &[Token],
        signer: &SigningIdentity,
    ) -> BridgeResult<TransactionReceipt>;

    /// Looks up the receipt of a previously submitted transaction.
    async fn transaction_status(&self, tx_hash: H256) -> BridgeResult<TransactionStatus>;
}
