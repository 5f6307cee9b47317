//! Candidate listing with a bulk read and a bounded positional fallback.
//!
//! Older deployments of the voting contract only expose the public
//! `candidatos(i)` array getter, newer ones add `obtenerCandidatos()`. The
//! caller never needs to know which one is deployed:
//!
//! 1. [`CandidateRetrieval::bulk`] issues one bulk read. A call-level failure
//!    yields [`RetrievalOutcome::Exhausted`] instead of an error.
//! 2. [`CandidateRetrieval::scan`] then reads positions `0, 1, ..` until the
//!    first rejected read or until `scan_bound` reads were made.
//!
//! Transport failures are never absorbed by either step.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::{
    candidate_from_single, candidates_from_bulk, index_args, GET_ALL_CANDIDATES, GET_CANDIDATE,
};
use crate::{BridgeResult, CandidateRecord, LedgerAddress, LedgerClient, RawCandidate};

/// Where candidates are read from.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Reads every candidate in one call.
    async fn read_all(&self) -> BridgeResult<Vec<RawCandidate>>;

    /// Reads the candidate at `index`. A call-level failure means there is
    /// no candidate at that position.
    async fn read_at(&self, index: u64) -> BridgeResult<RawCandidate>;
}

/// [`CandidateSource`] backed by the deployed contract.
pub struct ContractCandidates<'a, L: ?Sized> {
    client: &'a L,
    address: LedgerAddress,
}

impl<'a, L: LedgerClient + ?Sized> ContractCandidates<'a, L> {
    /// Reads candidates from the contract at `address`.
    pub fn new(client: &'a L, address: LedgerAddress) -> Self {
        Self { client, address }
    }
}

#[async_trait]
impl<'a, L> CandidateSource for ContractCandidates<'a, L>
where
    L: LedgerClient + ?Sized,
{
    async fn read_all(&self) -> BridgeResult<Vec<RawCandidate>> {
        let tokens = self
            .client
            .call_read(self.address, GET_ALL_CANDIDATES, &[])
            .await?;
        candidates_from_bulk(tokens)
    }

    async fn read_at(&self, index: u64) -> BridgeResult<RawCandidate> {
        let tokens = self
            .client
            .call_read(self.address, GET_CANDIDATE, &index_args(index))
            .await?;
        candidate_from_single(tokens)
    }
}

/// Typed result of the bulk step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// The bulk read worked; this is the final answer.
    Succeeded(Vec<CandidateRecord>),
    /// The bulk interface is unavailable; fall back to scanning.
    Exhausted,
}

/// Which step produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RetrievalStrategy {
    /// Single bulk read.
    Bulk,
    /// Positional scan.
    Scan,
}

impl RetrievalStrategy {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStrategy::Bulk => "bulk",
            RetrievalStrategy::Scan => "scan",
        }
    }
}

/// Candidates in retrieval order, plus how they were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateListing {
    /// Candidates; `index` runs from 0 without gaps.
    pub candidates: Vec<CandidateRecord>,
    /// Step that produced them.
    pub strategy: RetrievalStrategy,
}

/// The bulk-then-scan retrieval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRetrieval {
    scan_bound: u64,
}

impl CandidateRetrieval {
    /// A policy whose fallback scan reads at most `scan_bound` positions.
    pub fn new(scan_bound: u64) -> Self {
        Self { scan_bound }
    }

    /// Runs the bulk step, then the scan step if needed.
    pub async fn retrieve<S: CandidateSource + ?Sized>(
        &self,
        source: &S,
    ) -> BridgeResult<CandidateListing> {
        let listing = match self.bulk(source).await? {
            RetrievalOutcome::Succeeded(candidates) => CandidateListing {
                candidates,
                strategy: RetrievalStrategy::Bulk,
            },
            RetrievalOutcome::Exhausted => CandidateListing {
                candidates: self.scan(source).await?,
                strategy: RetrievalStrategy::Scan,
            },
        };

        info!(
            count = listing.candidates.len(),
            strategy = listing.strategy.as_str(),
            "Candidates retrieved"
        );
        Ok(listing)
    }

    /// One bulk read, indexed by position.
    pub async fn bulk<S: CandidateSource + ?Sized>(
        &self,
        source: &S,
    ) -> BridgeResult<RetrievalOutcome> {
        match source.read_all().await {
            Ok(raw) => Ok(RetrievalOutcome::Succeeded(
                (0u64..).zip(raw).map(|(i, c)| CandidateRecord::at(i, c)).collect(),
            )),
            Err(err) if err.is_call_failure() => {
                warn!(error = %err, "Bulk candidate read unavailable, scanning by index");
                Ok(RetrievalOutcome::Exhausted)
            }
            Err(err) => Err(err),
        }
    }

    /// Reads positions from 0 until the first rejected read or the bound.
    pub async fn scan<S: CandidateSource + ?Sized>(
        &self,
        source: &S,
    ) -> BridgeResult<Vec<CandidateRecord>> {
        let mut candidates = Vec::new();
        for index in 0..self.scan_bound {
            match source.read_at(index).await {
                Ok(raw) => candidates.push(CandidateRecord::at(index, raw)),
                Err(err) if err.is_call_failure() => {
                    debug!(index, error = %err, "No candidate at index, scan complete");
                    return Ok(candidates);
                }
                Err(err) => return Err(err),
            }
        }

        warn!(
            bound = self.scan_bound,
            "Candidate scan hit its bound, later candidates are not listed"
        );
        Ok(candidates)
    }
}
