use ethers_core::types::H256;
use tracing::instrument;

use crate::presence::ensure_deployed;
use crate::retrieval::{CandidateListing, CandidateRetrieval, ContractCandidates};
use crate::vote::submit_vote;
use crate::{
    BridgeConfig, BridgeResult, DeploymentRecord, LedgerClient, TransactionReceipt,
    TransactionStatus, VoteRequest,
};

/// Entry point used by the HTTP layer.
///
/// Owns one [`LedgerClient`] and the immutable [`BridgeConfig`].
/// [`LedgerBridge::list_candidates`] and [`LedgerBridge::submit_vote`] check
/// that the contract is deployed before calling it;
/// [`LedgerBridge::transaction_status`] only asks the node for a receipt.
#[derive(Debug)]
pub struct LedgerBridge<L> {
    client: L,
    config: BridgeConfig,
    retrieval: CandidateRetrieval,
}

impl<L: LedgerClient> LedgerBridge<L> {
    /// Creates a bridge talking to `client`.
    pub fn new(client: L, config: BridgeConfig) -> Self {
        let retrieval = CandidateRetrieval::new(config.scan_bound);
        Self {
            client,
            config,
            retrieval,
        }
    }

    /// Addresses published by the deployment script.
    pub fn deployment(&self) -> &DeploymentRecord {
        &self.config.deployment
    }

    /// Lists every candidate with its current tally.
    #[instrument(skip(self))]
    pub async fn list_candidates(&self) -> BridgeResult<CandidateListing> {
        let address = self.config.ledger_address();
        ensure_deployed(&self.client, address).await?;
        self.retrieval
            .retrieve(&ContractCandidates::new(&self.client, address))
            .await
    }

    /// Casts a vote and waits for it to be confirmed.
    #[instrument(skip(self, request), fields(candidate_index = request.candidate_index))]
    pub async fn submit_vote(&self, request: &VoteRequest) -> BridgeResult<TransactionReceipt> {
        submit_vote(&self.client, self.config.ledger_address(), request).await
    }

    /// Current state of a previously submitted transaction.
    pub async fn transaction_status(&self, tx_hash: H256) -> BridgeResult<TransactionStatus> {
        self.client.transaction_status(tx_hash).await
    }
}
