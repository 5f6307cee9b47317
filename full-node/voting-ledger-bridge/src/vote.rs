use tracing::{info, warn};

use crate::contract::{index_args, VOTE};
use crate::presence::ensure_deployed;
use crate::{
    BridgeError, BridgeResult, LedgerAddress, LedgerClient, SigningCredential, SigningIdentity,
    TransactionReceipt,
};

/// A request to cast one vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRequest {
    /// Zero-based position of the chosen candidate.
    pub candidate_index: u64,
    /// Key the vote is signed with.
    pub credential: Option<SigningCredential>,
}

impl VoteRequest {
    /// A vote for `candidate_index` signed with `credential`.
    pub fn new(candidate_index: u64, credential: SigningCredential) -> Self {
        Self {
            candidate_index,
            credential: Some(credential),
        }
    }
}

/// Validates, signs and submits a vote, then waits for its receipt.
///
/// Nothing reaches the ledger before the credential is present and parses.
/// Range checks on `candidate_index` are left to the contract.
pub async fn submit_vote<L: LedgerClient + ?Sized>(
    client: &L,
    address: LedgerAddress,
    request: &VoteRequest,
) -> BridgeResult<TransactionReceipt> {
    let credential = request
        .credential
        .as_ref()
        .ok_or_else(|| BridgeError::Validation("signing credential is required".to_string()))?;
    let signer = SigningIdentity::derive(credential)?;

    ensure_deployed(client, address).await?;

    let receipt = client
        .submit_transaction(address, VOTE, &index_args(request.candidate_index), &signer)
        .await
        .map_err(|err| {
            warn!(
                candidate_index = request.candidate_index,
                voter = ?signer.address(),
                category = err.category(),
                error = %err,
                "Vote failed"
            );
            err
        })?;

    info!(
        candidate_index = request.candidate_index,
        voter = ?signer.address(),
        tx_hash = ?receipt.transaction_hash,
        block = ?receipt.block_number,
        "Vote confirmed"
    );
    Ok(receipt)
}
