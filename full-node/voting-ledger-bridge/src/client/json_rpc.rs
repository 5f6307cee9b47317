use std::time::Duration;

use async_trait::async_trait;
use ethers_core::abi::Token;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{
    BlockNumber, Bytes, Eip1559TransactionRequest, TransactionRequest, H256, U256, U64,
};
use ethers_providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers_signers::Signer;
use tracing::{debug, info, warn};

use crate::contract::VotingContract;
use crate::{
    BridgeError, BridgeResult, LedgerAddress, LedgerClient, NodeConfig, SigningIdentity,
    TransactionReceipt, TransactionState, TransactionStatus,
};

/// JSON-RPC error code geth and Hardhat use for `execution reverted`.
const REVERT_ERROR_CODE: i64 = 3;

/// [`LedgerClient`] backed by an EVM node reached over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct EthersLedgerClient {
    provider: Provider<Http>,
    contract: VotingContract,
    chain_id: Option<u64>,
    confirmation_timeout: Duration,
}

impl EthersLedgerClient {
    /// Creates a client for the node described by `config`. No request is
    /// made until the first call.
    pub fn new(config: &NodeConfig, contract: VotingContract) -> Self {
        let provider = Provider::new(Http::new(config.endpoint.clone())).interval(config.poll_interval);
        Self {
            provider,
            contract,
            chain_id: config.chain_id,
            confirmation_timeout: config.confirmation_timeout,
        }
    }

    async fn chain_id(&self) -> BridgeResult<u64> {
        match self.chain_id {
            Some(chain_id) => Ok(chain_id),
            None => {
                let chain_id = self.provider.get_chainid().await.map_err(transport_failure)?;
                chain_id_from_node(chain_id)
            }
        }
    }
}

#[async_trait]
impl LedgerClient for EthersLedgerClient {
    async fn get_code(&self, address: LedgerAddress) -> BridgeResult<Bytes> {
        self.provider
            .get_code(address.as_address(), None)
            .await
            .map_err(transport_failure)
    }

    async fn call_read(
        &self,
        address: LedgerAddress,
        method: &str,
        args: &[Token],
    ) -> BridgeResult<Vec<Token>> {
        let data = self.contract.encode_call(method, args)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(address.as_address())
            .data(data)
            .into();

        let output = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| read_failure(method, e))?;
        self.contract.decode_output(method, &output)
    }

    async fn submit_transaction(
        &self,
        address: LedgerAddress,
        method: &str,
        args: &[Token],
        signer: &SigningIdentity,
    ) -> BridgeResult<TransactionReceipt> {
        let data = self.contract.encode_call(method, args)?;
        let chain_id = self.chain_id().await?;
        let wallet = signer.wallet_for_chain(chain_id);
        // Counting pending transactions keeps back-to-back votes from one key apart.
        let nonce = self
            .provider
            .get_transaction_count(signer.address(), Some(BlockNumber::Pending.into()))
            .await
            .map_err(transport_failure)?;

        let mut tx: TypedTransaction = Eip1559TransactionRequest::new()
            .from(signer.address())
            .to(address.as_address())
            .data(data)
            .chain_id(chain_id)
            .nonce(nonce)
            .into();

        // Gas estimation executes the call, so contract rejections surface here.
        self.provider
            .fill_transaction(&mut tx, None)
            .await
            .map_err(submission_failure)?;

        debug!(%method, from = ?signer.address(), chain_id, %nonce, "Signing transaction");
        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| BridgeError::Signing(e.to_string()))?;

        let pending = self
            .provider
            .send_raw_transaction(tx.rlp_signed(&signature))
            .await
            .map_err(submission_failure)?;
        let tx_hash = pending.tx_hash();
        info!(?tx_hash, %method, "Transaction submitted, awaiting confirmation");

        let receipt = match tokio::time::timeout(self.confirmation_timeout, pending).await {
            Ok(result) => result.map_err(submission_failure)?,
            Err(_) => {
                warn!(?tx_hash, waited = ?self.confirmation_timeout, "Confirmation wait timed out");
                return Err(BridgeError::Timeout {
                    tx_hash,
                    waited: self.confirmation_timeout,
                });
            }
        };
        let receipt = receipt.ok_or_else(|| {
            BridgeError::Submission(format!("transaction {:?} dropped before inclusion", tx_hash))
        })?;

        if receipt.status == Some(U64::zero()) {
            return Err(BridgeError::Revert(format!(
                "transaction {:?} reverted in block {:?}",
                tx_hash, receipt.block_number
            )));
        }

        Ok(TransactionReceipt {
            transaction_hash: receipt.transaction_hash,
            confirmed: true,
            block_number: receipt.block_number.map(|n| n.as_u64()),
        })
    }

    async fn transaction_status(&self, tx_hash: H256) -> BridgeResult<TransactionStatus> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(transport_failure)?;

        let (state, block_number) = match receipt {
            None => (TransactionState::Pending, None),
            Some(receipt) => {
                let state = if receipt.status == Some(U64::zero()) {
                    TransactionState::Reverted
                } else {
                    TransactionState::Confirmed
                };
                (state, receipt.block_number.map(|n| n.as_u64()))
            }
        };

        Ok(TransactionStatus {
            transaction_hash: tx_hash,
            state,
            block_number,
        })
    }
}

fn chain_id_from_node(chain_id: U256) -> BridgeResult<u64> {
    u64::try_from(chain_id)
        .map_err(|_| BridgeError::Connection(format!("node reported invalid chain id {chain_id}")))
}

fn transport_failure(err: ProviderError) -> BridgeError {
    BridgeError::Connection(err.to_string())
}

/// Node answered, but rejected or garbled the call: the contract does not
/// support it. Anything else is a transport problem.
fn read_failure(method: &str, err: ProviderError) -> BridgeError {
    if let Some(response) = err.as_error_response() {
        BridgeError::call(method, &response.message)
    } else if err.is_serde_error() {
        BridgeError::call(method, err)
    } else {
        transport_failure(err)
    }
}

fn submission_failure(err: ProviderError) -> BridgeError {
    match err.as_error_response() {
        Some(response)
            if response.code == REVERT_ERROR_CODE
                || response.message.to_lowercase().contains("revert") =>
        {
            BridgeError::Revert(response.message.clone())
        }
        Some(response) => BridgeError::Submission(response.message.clone()),
        None if err.is_serde_error() => BridgeError::Submission(err.to_string()),
        None => transport_failure(err),
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use ethers_core::utils::rlp::Rlp;
    use ethers_providers::{HttpClientError, JsonRpcError};
    use serde_json::{json, Value};

    use super::*;
    use crate::contract::{index_args, VOTE};
    use crate::SigningCredential;

    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Answers just enough JSON-RPC to get a transaction signed and sent,
    /// then reports it as dropped.
    #[derive(Clone, Default)]
    struct FakeNode {
        account_nonce: u64,
        chain_id: Option<U256>,
        requests: Arc<Mutex<Vec<(String, Value)>>>,
        raw_transactions: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl FakeNode {
        fn methods(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(method, _)| method.clone())
                .collect()
        }

        fn params_of(&self, method: &str) -> Option<Value> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .find(|(m, _)| m == method)
                .map(|(_, params)| params.clone())
        }

        fn result_for(&self, method: &str, params: &Value) -> Value {
            match method {
                "eth_chainId" => json!(format!("{:#x}", self.chain_id.unwrap_or(U256::from(31337)))),
                "eth_getTransactionCount" => json!(format!("{:#x}", self.account_nonce)),
                "eth_getBlockByNumber" => latest_block(),
                "eth_feeHistory" => json!({
                    "oldestBlock": "0x1",
                    "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
                    "gasUsedRatio": [0.5],
                    "reward": [["0x3b9aca00"]],
                }),
                "eth_estimateGas" => json!("0x186a0"),
                "eth_sendRawTransaction" => {
                    let raw = params[0].as_str().unwrap().trim_start_matches("0x");
                    self.raw_transactions
                        .lock()
                        .unwrap()
                        .push(hex::decode(raw).unwrap());
                    json!(format!("0x{}", "ab".repeat(32)))
                }
                // Unknown transaction: the pending wait treats it as dropped.
                _ => Value::Null,
            }
        }

        fn start(&self) -> NodeConfig {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let app = Router::new()
                .route("/", post(rpc_handler))
                .with_state(self.clone());
            let server = axum::Server::from_tcp(listener)
                .unwrap()
                .serve(app.into_make_service());
            tokio::spawn(server);

            NodeConfig {
                endpoint: format!("http://{addr}").parse().unwrap(),
                chain_id: if self.chain_id.is_some() { None } else { Some(31337) },
                poll_interval: Duration::from_millis(10),
                confirmation_timeout: Duration::from_secs(5),
            }
        }
    }

    async fn rpc_handler(State(node): State<FakeNode>, Json(request): Json<Value>) -> Json<Value> {
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let params = request["params"].clone();
        let result = node.result_for(&method, &params);
        node.requests.lock().unwrap().push((method, params));
        Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
    }

    fn latest_block() -> Value {
        let zero_hash = format!("0x{}", "00".repeat(32));
        json!({
            "hash": format!("0x{}", "11".repeat(32)),
            "parentHash": zero_hash,
            "sha3Uncles": zero_hash,
            "miner": format!("0x{}", "00".repeat(20)),
            "stateRoot": zero_hash,
            "transactionsRoot": zero_hash,
            "receiptsRoot": zero_hash,
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "number": "0x1",
            "gasUsed": "0x0",
            "gasLimit": "0x1c9c380",
            "extraData": "0x",
            "timestamp": "0x6553f100",
            "difficulty": "0x0",
            "totalDifficulty": "0x0",
            "sealFields": [],
            "uncles": [],
            "transactions": [],
            "size": "0x200",
            "mixHash": zero_hash,
            "nonce": "0x0000000000000000",
            "baseFeePerGas": "0x3b9aca00",
        })
    }

    async fn send_vote(node: &FakeNode) -> BridgeResult<TransactionReceipt> {
        let client = EthersLedgerClient::new(&node.start(), VotingContract::bundled().unwrap());
        let signer = SigningIdentity::derive(&SigningCredential::new(HARDHAT_KEY)).unwrap();
        client
            .submit_transaction(CONTRACT.parse().unwrap(), VOTE, &index_args(0), &signer)
            .await
    }

    fn rpc_error(code: i64, message: &str) -> ProviderError {
        ProviderError::from(HttpClientError::JsonRpcError(JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        }))
    }

    #[test]
    fn reverts_are_told_apart_from_rejections() {
        let hardhat = rpc_error(
            -32603,
            "Error: VM Exception while processing transaction: reverted with reason string 'Indice invalido'",
        );
        assert_eq!(submission_failure(hardhat).category(), "revert");
        assert_eq!(
            submission_failure(rpc_error(3, "execution reverted")).category(),
            "revert"
        );
        assert_eq!(
            submission_failure(rpc_error(-32000, "nonce too low")).category(),
            "submission"
        );
    }

    #[test]
    fn read_rejections_are_call_errors() {
        let err = read_failure("obtenerCandidatos", rpc_error(-32000, "execution reverted"));
        assert!(err.is_call_failure());
        assert!(err.to_string().contains("obtenerCandidatos"));
    }

    #[tokio::test]
    async fn unreachable_node_is_a_connection_error() {
        let config = NodeConfig {
            endpoint: "http://127.0.0.1:1".parse().unwrap(),
            chain_id: Some(31337),
            poll_interval: Duration::from_millis(10),
            confirmation_timeout: Duration::from_secs(1),
        };
        let client = EthersLedgerClient::new(&config, VotingContract::bundled().unwrap());
        let address: LedgerAddress = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            .parse()
            .unwrap();

        let err = client.get_code(address).await.unwrap_err();
        assert_eq!(err.category(), "connection");

        let err = client
            .call_read(address, crate::contract::GET_ALL_CANDIDATES, &[])
            .await
            .unwrap_err();
        assert_eq!(err.category(), "connection");
    }

    #[tokio::test]
    async fn vote_is_signed_with_the_pending_account_nonce() {
        let node = FakeNode {
            account_nonce: 7,
            ..FakeNode::default()
        };

        let err = send_vote(&node).await.unwrap_err();
        assert_eq!(err.category(), "submission");

        let params = node.params_of("eth_getTransactionCount").unwrap();
        assert_eq!(params[1], "pending");
        let methods = node.methods();
        let count_at = methods.iter().position(|m| m == "eth_getTransactionCount");
        let send_at = methods.iter().position(|m| m == "eth_sendRawTransaction");
        assert!(count_at < send_at, "{methods:?}");

        let raw = node.raw_transactions.lock().unwrap()[0].clone();
        assert_eq!(raw[0], 0x02, "expected an EIP-1559 envelope");
        // [chain_id, nonce, max_priority_fee, max_fee, gas, to, value, data, ..]
        let fields = Rlp::new(&raw[1..]);
        assert_eq!(fields.val_at::<U256>(0).unwrap(), U256::from(31337));
        assert_eq!(fields.val_at::<U256>(1).unwrap(), U256::from(7));
    }

    #[tokio::test]
    async fn oversized_chain_id_is_rejected_without_sending() {
        let node = FakeNode {
            chain_id: Some(U256::from(u64::MAX) + 1),
            ..FakeNode::default()
        };

        let err = send_vote(&node).await.unwrap_err();

        assert_eq!(err.category(), "connection");
        assert!(node.raw_transactions.lock().unwrap().is_empty());
    }

    #[test]
    fn chain_id_must_fit_in_u64() {
        assert_eq!(chain_id_from_node(U256::from(31337)).unwrap(), 31337);
        assert!(chain_id_from_node(U256::MAX).is_err());
    }
}
