//! In-memory [`LedgerClient`] used in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, H256, U256};

use crate::contract::{GET_ALL_CANDIDATES, GET_CANDIDATE, VOTE};
use crate::{
    BridgeError, BridgeResult, LedgerAddress, LedgerClient, RawCandidate, SigningIdentity,
    TransactionReceipt, TransactionState, TransactionStatus,
};

/// Address the mock contract lives at.
pub const MOCK_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Hardhat account #0, accepted by [`MockLedger`] like any other key.
pub const MOCK_SIGNING_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// A request received by [`MockLedger`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// `get_code`.
    GetCode,
    /// `call_read` of the named method.
    CallRead(String),
    /// `submit_transaction` of the named method.
    Submit(String),
    /// `transaction_status`.
    TransactionStatus,
}

#[derive(Debug)]
struct MockState {
    deployed: bool,
    reachable: bool,
    bulk_getter: bool,
    stalled: bool,
    candidates: Vec<RawCandidate>,
    calls: Vec<LedgerCall>,
    mined: HashMap<H256, u64>,
    pending: Vec<(H256, usize, Address)>,
    nonce: u64,
    block_number: u64,
    voters: Vec<Address>,
}

impl MockState {
    fn record_vote(&mut self, tx_hash: H256, index: usize, voter: Address) -> u64 {
        self.candidates[index].vote_count += U256::one();
        self.voters.push(voter);
        self.block_number += 1;
        self.mined.insert(tx_hash, self.block_number);
        self.block_number
    }
}

/// A `Votacion` contract simulated in memory.
///
/// Clones share state, so a test can keep a handle while the bridge owns
/// another.
#[derive(Debug, Clone)]
pub struct MockLedger {
    address: LedgerAddress,
    state: Arc<Mutex<MockState>>,
}

impl MockLedger {
    /// A deployed contract with the given candidates, all at zero votes, that
    /// supports both getters.
    pub fn with_candidates(names: &[&str]) -> Self {
        let candidates = names
            .iter()
            .map(|name| RawCandidate {
                name: name.to_string(),
                vote_count: U256::zero(),
            })
            .collect();
        Self::from_state(MockState {
            deployed: true,
            reachable: true,
            bulk_getter: true,
            stalled: false,
            candidates,
            calls: vec![],
            mined: HashMap::new(),
            pending: vec![],
            nonce: 0,
            block_number: 0,
            voters: vec![],
        })
    }

    /// An address with no code behind it.
    pub fn not_deployed() -> Self {
        let ledger = Self::with_candidates(&[]);
        ledger.state().deployed = false;
        ledger
    }

    /// Same as [`MockLedger::with_candidates`] but for an older contract that
    /// only has the per-index getter.
    pub fn without_bulk_getter(names: &[&str]) -> Self {
        let ledger = Self::with_candidates(names);
        ledger.set_bulk_getter(false);
        ledger
    }

    fn from_state(state: MockState) -> Self {
        Self {
            address: MOCK_CONTRACT_ADDRESS
                .parse()
                .expect("mock contract address is valid"),
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock ledger lock poisoned")
    }

    /// Address of the simulated contract.
    pub fn address(&self) -> LedgerAddress {
        self.address
    }

    /// Simulates the node going up or down.
    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Enables or disables `obtenerCandidatos`.
    pub fn set_bulk_getter(&self, available: bool) {
        self.state().bulk_getter = available;
    }

    /// When stalled, submitted transactions are accepted but never mined.
    pub fn set_stalled(&self, stalled: bool) {
        self.state().stalled = stalled;
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state().calls.clone()
    }

    /// Current tally of the candidate at `index`.
    pub fn vote_count(&self, index: usize) -> Option<U256> {
        self.state().candidates.get(index).map(|c| c.vote_count)
    }

    /// Senders of mined votes, in order.
    pub fn voters(&self) -> Vec<Address> {
        self.state().voters.clone()
    }

    /// Marks every stalled transaction as mined.
    pub fn mine_pending(&self) {
        let mut state = self.state();
        let pending = std::mem::take(&mut state.pending);
        for (tx_hash, index, voter) in pending {
            state.record_vote(tx_hash, index, voter);
        }
    }
}

fn index_arg(method: &str, args: &[Token]) -> BridgeResult<usize> {
    match args {
        [Token::Uint(index)] if *index < U256::from(usize::MAX) => Ok(index.as_usize()),
        _ => Err(BridgeError::Call {
            method: method.to_string(),
            reason: format!("invalid arguments {:?}", args),
        }),
    }
}

fn candidate_tokens(candidate: &RawCandidate) -> Vec<Token> {
    vec![
        Token::String(candidate.name.clone()),
        Token::Uint(candidate.vote_count),
    ]
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_code(&self, address: LedgerAddress) -> BridgeResult<Bytes> {
        let mut state = self.state();
        state.calls.push(LedgerCall::GetCode);
        if !state.reachable {
            return Err(BridgeError::Connection("connection refused".to_string()));
        }
        if state.deployed && address == self.address {
            Ok(Bytes::from(vec![0x60, 0x80, 0x60, 0x40]))
        } else {
            Ok(Bytes::new())
        }
    }

    async fn call_read(
        &self,
        address: LedgerAddress,
        method: &str,
        args: &[Token],
    ) -> BridgeResult<Vec<Token>> {
        let mut state = self.state();
        state.calls.push(LedgerCall::CallRead(method.to_string()));
        if !state.reachable {
            return Err(BridgeError::Connection("connection refused".to_string()));
        }
        if !state.deployed || address != self.address {
            return Err(BridgeError::call(method, "call to non-contract address"));
        }

        match method {
            GET_ALL_CANDIDATES if state.bulk_getter => Ok(vec![Token::Array(
                state
                    .candidates
                    .iter()
                    .map(|c| Token::Tuple(candidate_tokens(c)))
                    .collect(),
            )]),
            GET_CANDIDATE => {
                let index = index_arg(method, args)?;
                state
                    .candidates
                    .get(index)
                    .map(candidate_tokens)
                    .ok_or_else(|| BridgeError::call(method, "execution reverted"))
            }
            _ => Err(BridgeError::call(method, "execution reverted")),
        }
    }

    async fn submit_transaction(
        &self,
        address: LedgerAddress,
        method: &str,
        args: &[Token],
        signer: &SigningIdentity,
    ) -> BridgeResult<TransactionReceipt> {
        let mut state = self.state();
        state.calls.push(LedgerCall::Submit(method.to_string()));
        if !state.reachable {
            return Err(BridgeError::Connection("connection refused".to_string()));
        }
        if !state.deployed || address != self.address || method != VOTE {
            return Err(BridgeError::Revert("execution reverted".to_string()));
        }

        let index = index_arg(method, args)?;
        if index >= state.candidates.len() {
            return Err(BridgeError::Revert(
                "execution reverted: Indice de candidato invalido".to_string(),
            ));
        }

        state.nonce += 1;
        let tx_hash = H256::from_low_u64_be(state.nonce);
        if state.stalled {
            state.pending.push((tx_hash, index, signer.address()));
            return Err(BridgeError::Timeout {
                tx_hash,
                waited: Duration::from_secs(60),
            });
        }

        let block = state.record_vote(tx_hash, index, signer.address());

        Ok(TransactionReceipt {
            transaction_hash: tx_hash,
            confirmed: true,
            block_number: Some(block),
        })
    }

    async fn transaction_status(&self, tx_hash: H256) -> BridgeResult<TransactionStatus> {
        let mut state = self.state();
        state.calls.push(LedgerCall::TransactionStatus);
        if !state.reachable {
            return Err(BridgeError::Connection("connection refused".to_string()));
        }

        let block_number = state.mined.get(&tx_hash).copied();
        let tx_state = if block_number.is_some() {
            TransactionState::Confirmed
        } else {
            TransactionState::Pending
        };
        Ok(TransactionStatus {
            transaction_hash: tx_hash,
            state: tx_state,
            block_number,
        })
    }
}
