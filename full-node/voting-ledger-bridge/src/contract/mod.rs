//! Call encoding for the `Votacion` contract.

use ethers_core::abi::{Abi, Token};
use ethers_core::types::{Bytes, U256};

use crate::{BridgeError, BridgeResult, RawCandidate};

/// Bulk getter returning every candidate at once. Missing on older deployments.
pub const GET_ALL_CANDIDATES: &str = "obtenerCandidatos";
/// Public array getter, one candidate per index.
pub const GET_CANDIDATE: &str = "candidatos";
/// Casts a vote for the candidate at the given index.
pub const VOTE: &str = "votar";

const VOTACION_ABI: &str = include_str!("Votacion.abi");

/// ABI wrapper for the `Votacion` contract.
#[derive(Debug, Clone)]
pub struct VotingContract {
    abi: Abi,
}

impl VotingContract {
    /// Loads the ABI bundled with this crate.
    pub fn bundled() -> anyhow::Result<Self> {
        Self::from_abi_json(VOTACION_ABI)
    }

    /// Loads an ABI from its JSON form, e.g. a Hardhat artifact's `abi` field.
    pub fn from_abi_json(json: &str) -> anyhow::Result<Self> {
        let abi: Abi = serde_json::from_str(json)?;
        Ok(Self { abi })
    }

    /// Encodes calldata for `method`.
    pub fn encode_call(&self, method: &str, args: &[Token]) -> BridgeResult<Bytes> {
        let function = self
            .abi
            .function(method)
            .map_err(|e| BridgeError::call(method, e))?;
        let data = function
            .encode_input(args)
            .map_err(|e| BridgeError::call(method, e))?;
        Ok(data.into())
    }

    /// Decodes the return data of `method`.
    pub fn decode_output(&self, method: &str, output: &[u8]) -> BridgeResult<Vec<Token>> {
        let function = self
            .abi
            .function(method)
            .map_err(|e| BridgeError::call(method, e))?;
        function
            .decode_output(output)
            .map_err(|e| BridgeError::call(method, e))
    }
}

/// Arguments for [`GET_CANDIDATE`] and [`VOTE`].
pub fn index_args(index: u64) -> Vec<Token> {
    vec![Token::Uint(U256::from(index))]
}

/// Interprets the output of [`GET_ALL_CANDIDATES`]: one array of
/// `(string, uint256)` tuples.
pub fn candidates_from_bulk(tokens: Vec<Token>) -> BridgeResult<Vec<RawCandidate>> {
    match <[Token; 1]>::try_from(tokens) {
        Ok([Token::Array(items)]) => items
            .into_iter()
            .map(|item| match item {
                Token::Tuple(fields) => candidate_from_fields(GET_ALL_CANDIDATES, fields),
                other => Err(unexpected(GET_ALL_CANDIDATES, &other)),
            })
            .collect(),
        Ok([other]) => Err(unexpected(GET_ALL_CANDIDATES, &other)),
        Err(tokens) => Err(BridgeError::call(
            GET_ALL_CANDIDATES,
            format!("expected a single return value, got {}", tokens.len()),
        )),
    }
}

/// Interprets the output of [`GET_CANDIDATE`]: the struct fields returned
/// flat, `(string, uint256)`.
pub fn candidate_from_single(tokens: Vec<Token>) -> BridgeResult<RawCandidate> {
    candidate_from_fields(GET_CANDIDATE, tokens)
}

fn candidate_from_fields(method: &str, fields: Vec<Token>) -> BridgeResult<RawCandidate> {
    match <[Token; 2]>::try_from(fields) {
        Ok([Token::String(name), Token::Uint(vote_count)]) => Ok(RawCandidate { name, vote_count }),
        Ok(fields) => Err(BridgeError::call(
            method,
            format!("unexpected candidate fields {:?}", fields),
        )),
        Err(fields) => Err(BridgeError::call(
            method,
            format!("expected 2 candidate fields, got {}", fields.len()),
        )),
    }
}

fn unexpected(method: &str, token: &Token) -> BridgeError {
    BridgeError::call(method, format!("unexpected return value {:?}", token))
}
