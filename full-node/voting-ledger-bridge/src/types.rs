use ethers_core::types::{H256, U256};
use serde::Serialize;

/// A candidate as stored by the contract, before it is given a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    /// Display name.
    pub name: String,
    /// Votes received so far.
    pub vote_count: U256,
}

/// A candidate together with its 0-based position in the retrieval order.
///
/// Built fresh on every listing and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    /// Position in the listing; also the index `votar` expects.
    pub index: u64,
    /// Display name.
    pub name: String,
    /// Votes received so far, serialized as decimal text.
    #[serde(serialize_with = "serialize_decimal")]
    pub vote_count: U256,
}

impl CandidateRecord {
    pub(crate) fn at(index: u64, raw: RawCandidate) -> Self {
        Self {
            index,
            name: raw.name,
            vote_count: raw.vote_count,
        }
    }
}

fn serialize_decimal<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

/// Proof that a vote transaction was mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Hash of the mined transaction.
    pub transaction_hash: H256,
    /// Always true for receipts handed out by the bridge.
    pub confirmed: bool,
    /// Block the transaction was included in, if the node reported it.
    pub block_number: Option<u64>,
}

/// Where a previously submitted transaction currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionState {
    /// No receipt yet; the transaction may still be mined, or may be lost.
    Pending,
    /// Mined successfully.
    Confirmed,
    /// Mined, but the contract rejected it.
    Reverted,
}

/// Result of polling a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatus {
    /// The polled hash.
    pub transaction_hash: H256,
    /// Current state.
    pub state: TransactionState,
    /// Inclusion block, once mined.
    pub block_number: Option<u64>,
}
