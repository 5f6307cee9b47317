use std::io::Write;

use voting_ledger_bridge::mocks::{MockLedger, MOCK_CONTRACT_ADDRESS, MOCK_SIGNING_KEY};
use voting_ledger_bridge::retrieval::RetrievalStrategy;
use voting_ledger_bridge::{
    from_toml_path, BridgeConfigFile, LedgerBridge, SigningCredential, VoteRequest,
};

fn bridge_from_files(ledger: &MockLedger, scan_bound: u64) -> LedgerBridge<MockLedger> {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        format!("CONTRACT_ADDRESS={MOCK_CONTRACT_ADDRESS}\nPRIVATE_KEY=your_private_key_here\n"),
    )
    .unwrap();

    let config_path = dir.path().join("bridge_config.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"
        deployment_file = ".env"
        [node]
        endpoint = "http://localhost:8545"
        chain_id = 31337
        [retrieval]
        scan_bound = {scan_bound}
        "#
    )
    .unwrap();

    let config: BridgeConfigFile = from_toml_path(&config_path).unwrap();
    let config = config.validate(dir.path()).unwrap();
    assert_eq!(config.ledger_address(), ledger.address());
    LedgerBridge::new(ledger.clone(), config)
}

#[tokio::test]
async fn votes_from_two_voters_are_both_counted() {
    let ledger = MockLedger::without_bulk_getter(&["Candidato 1", "Candidato 2"]);
    let bridge = bridge_from_files(&ledger, 10);

    let hardhat_key_1 = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    for key in [MOCK_SIGNING_KEY, hardhat_key_1] {
        bridge
            .submit_vote(&VoteRequest::new(0, SigningCredential::new(key)))
            .await
            .unwrap();
    }

    let listing = bridge.list_candidates().await.unwrap();
    assert_eq!(listing.strategy, RetrievalStrategy::Scan);
    assert_eq!(listing.candidates[0].vote_count.as_u64(), 2);
    assert_eq!(listing.candidates[1].vote_count.as_u64(), 0);

    let voters = ledger.voters();
    assert_eq!(voters.len(), 2);
    assert_ne!(voters[0], voters[1]);
}

#[tokio::test]
async fn node_outage_surfaces_as_connection_error() {
    let ledger = MockLedger::with_candidates(&["Candidato 1"]);
    let bridge = bridge_from_files(&ledger, 10);
    ledger.set_reachable(false);

    let err = bridge.list_candidates().await.unwrap_err();
    assert_eq!(err.category(), "connection");

    ledger.set_reachable(true);
    let listing = bridge.list_candidates().await.unwrap();
    assert_eq!(listing.candidates.len(), 1);
}
