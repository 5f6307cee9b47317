use ethers_core::types::H256;
use serde::{Deserialize, Serialize};
use voting_ledger_bridge::{
    BridgeError, LedgerAddress, SigningCredential, TransactionState, TransactionStatus, VoteRequest,
};

/// Body of `POST /api/votar`. The Spanish field names of the first release
/// are still accepted.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    #[serde(alias = "indice")]
    pub candidate_index: Option<i64>,
    #[serde(alias = "privateKey")]
    pub signing_credential: Option<String>,
}

impl VoteBody {
    /// `fallback` is used when the body carries no credential.
    pub fn into_request(
        self,
        fallback: Option<SigningCredential>,
    ) -> Result<VoteRequest, BridgeError> {
        let candidate_index = match self.candidate_index {
            None => {
                return Err(BridgeError::Validation(
                    "candidateIndex is required".to_string(),
                ))
            }
            Some(index) => u64::try_from(index).map_err(|_| {
                BridgeError::Validation(format!("candidateIndex must not be negative, got {index}"))
            })?,
        };
        let credential = self
            .signing_credential
            .filter(|secret| !secret.trim().is_empty())
            .map(SigningCredential::new)
            .or(fallback);

        Ok(VoteRequest {
            candidate_index,
            credential,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub message: &'static str,
    pub transaction_hash: H256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusResponse {
    pub transaction_hash: H256,
    pub status: TransactionState,
    pub block_number: Option<u64>,
}

impl From<TransactionStatus> for TransactionStatusResponse {
    fn from(status: TransactionStatus) -> Self {
        Self {
            transaction_hash: status.transaction_hash,
            status: status.state,
            block_number: status.block_number,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    pub contract_address: LedgerAddress,
    pub forwarder_address: Option<LedgerAddress>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<&'static str>,
}

impl From<&BridgeError> for ErrorResponse {
    fn from(err: &BridgeError) -> Self {
        let remediation = match err {
            BridgeError::NotDeployed { remediation, .. } => Some(*remediation),
            _ => None,
        };
        Self {
            error: err.to_string(),
            category: err.category(),
            remediation,
        }
    }
}

/// A transaction hash in a URL path: 32 bytes of hex, `0x` optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHashParam(pub H256);

impl<'a> Deserialize<'a> for TxHashParam {
    fn deserialize<D>(deserializer: D) -> Result<TxHashParam, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let string = String::deserialize(deserializer)?;
        // We ignore the 0x prefix if it exists.
        let s = string.strip_prefix("0x").unwrap_or(&string);

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| serde::de::Error::custom(format!("invalid transaction hash: {e}")))?;
        Ok(TxHashParam(H256(bytes)))
    }
}
