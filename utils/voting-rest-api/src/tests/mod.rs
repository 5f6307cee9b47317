use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use voting_ledger_bridge::mocks::{LedgerCall, MockLedger, MOCK_SIGNING_KEY};
use voting_ledger_bridge::{
    BridgeConfig, DeploymentRecord, LedgerBridge, NodeConfig, SigningCredential, REDEPLOY_HINT,
};

use crate::{app, AppStateInner, HttpConfig, Metrics};

const FORWARDER: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";

fn create_test_server_with(
    ledger: &MockLedger,
    default_credential: Option<SigningCredential>,
    use_default_credential: bool,
) -> TestServer {
    let config = BridgeConfig {
        deployment: DeploymentRecord {
            contract_address: ledger.address(),
            forwarder_address: Some(FORWARDER.parse().unwrap()),
            default_credential,
        },
        node: NodeConfig {
            endpoint: "http://localhost:8545".parse().unwrap(),
            chain_id: Some(31337),
            poll_interval: Duration::from_millis(10),
            confirmation_timeout: Duration::from_secs(1),
        },
        scan_bound: 10,
    };
    let app_state = Arc::new(AppStateInner {
        bridge: LedgerBridge::new(ledger.clone(), config),
        http: HttpConfig {
            use_default_credential,
            ..HttpConfig::default()
        },
        metrics: Metrics::new().unwrap(),
    });
    TestServer::new(app(app_state).into_make_service()).unwrap()
}

fn create_test_server(ledger: &MockLedger) -> TestServer {
    create_test_server_with(ledger, None, false)
}

fn three_candidates() -> MockLedger {
    MockLedger::with_candidates(&["Candidato 1", "Candidato 2", "Candidato 3"])
}

#[tokio::test]
async fn candidates_are_listed_in_contract_order() {
    let ledger = three_candidates();
    let server = create_test_server(&ledger);

    let response = server.get("/api/candidatos").await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!([
            { "index": 0, "name": "Candidato 1", "voteCount": "0" },
            { "index": 1, "name": "Candidato 2", "voteCount": "0" },
            { "index": 2, "name": "Candidato 3", "voteCount": "0" },
        ])
    );
}

#[tokio::test]
async fn vote_is_reflected_in_the_next_listing() {
    let ledger = three_candidates();
    let server = create_test_server(&ledger);

    let response = server
        .post("/api/votar")
        .json(&json!({ "candidateIndex": 0, "signingCredential": MOCK_SIGNING_KEY }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["message"], "Voto registrado exitosamente");
    assert!(json["transactionHash"].as_str().unwrap().starts_with("0x"));

    let listing = server.get("/api/candidatos").await.json::<Value>();
    assert_eq!(listing[0]["voteCount"], "1");
    assert_eq!(listing[1]["voteCount"], "0");
}

#[tokio::test]
async fn legacy_vote_body_is_accepted() {
    let ledger = three_candidates();
    let server = create_test_server(&ledger);

    server
        .post("/api/votar")
        .json(&json!({ "indice": 2, "privateKey": MOCK_SIGNING_KEY }))
        .await
        .assert_status_ok();

    assert_eq!(ledger.vote_count(2).unwrap().as_u64(), 1);
}

#[tokio::test]
async fn malformed_vote_bodies_are_bad_requests() {
    let ledger = three_candidates();
    let server = create_test_server(&ledger);

    let bodies = [
        json!({ "signingCredential": MOCK_SIGNING_KEY }),
        json!({ "candidateIndex": -1, "signingCredential": MOCK_SIGNING_KEY }),
        json!({ "candidateIndex": "uno", "signingCredential": MOCK_SIGNING_KEY }),
        json!({ "candidateIndex": 0 }),
    ];
    for body in bodies {
        let response = server.post("/api/votar").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response.json::<Value>()["category"], "validation");
    }

    let response = server.post("/api/votar").text("indice=0").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn ledger_failures_map_to_status_codes() {
    let ledger = three_candidates();
    let server = create_test_server(&ledger);

    let response = server
        .post("/api/votar")
        .json(&json!({ "candidateIndex": 0, "signingCredential": "0x1234" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["category"], "signing");

    let response = server
        .post("/api/votar")
        .json(&json!({ "candidateIndex": 9, "signingCredential": MOCK_SIGNING_KEY }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["category"], "revert");

    ledger.set_stalled(true);
    let response = server
        .post("/api/votar")
        .json(&json!({ "candidateIndex": 0, "signingCredential": MOCK_SIGNING_KEY }))
        .await;
    assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.json::<Value>()["category"], "timeout");

    ledger.set_reachable(false);
    let response = server.get("/api/candidatos").await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>()["category"], "connection");
}

#[tokio::test]
async fn missing_contract_is_service_unavailable() {
    let ledger = MockLedger::not_deployed();
    let server = create_test_server(&ledger);

    let response = server.get("/api/candidatos").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let json = response.json::<Value>();
    assert_eq!(json["category"], "notDeployed");
    assert_eq!(json["remediation"], REDEPLOY_HINT);

    let response = server
        .post("/api/votar")
        .json(&json!({ "candidateIndex": 0, "signingCredential": MOCK_SIGNING_KEY }))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(ledger.calls(), vec![LedgerCall::GetCode, LedgerCall::GetCode]);
}

#[tokio::test]
async fn default_credential_is_used_only_when_enabled() {
    let ledger = three_candidates();
    let operator = Some(SigningCredential::new(MOCK_SIGNING_KEY));
    let body = json!({ "candidateIndex": 1 });

    let disabled = create_test_server_with(&ledger, operator.clone(), false);
    disabled
        .post("/api/votar")
        .json(&body)
        .await
        .assert_status_bad_request();

    let enabled = create_test_server_with(&ledger, operator, true);
    enabled.post("/api/votar").json(&body).await.assert_status_ok();
    assert_eq!(ledger.vote_count(1).unwrap().as_u64(), 1);
}

#[tokio::test]
async fn timed_out_vote_can_be_polled() {
    let ledger = three_candidates();
    let server = create_test_server(&ledger);
    ledger.set_stalled(true);

    server
        .post("/api/votar")
        .json(&json!({ "candidateIndex": 0, "signingCredential": MOCK_SIGNING_KEY }))
        .await;
    let tx_hash = format!("0x{}", "00".repeat(31) + "01");

    let pending = server
        .get(&format!("/api/transacciones/{tx_hash}"))
        .await
        .json::<Value>();
    assert_eq!(pending["status"], "pending");
    assert_eq!(pending["blockNumber"], Value::Null);

    ledger.mine_pending();
    let confirmed = server
        .get(&format!("/api/transacciones/{tx_hash}"))
        .await
        .json::<Value>();
    assert_eq!(confirmed["status"], "confirmed");
    assert_eq!(confirmed["transactionHash"], tx_hash);
    assert_eq!(confirmed["blockNumber"], 1);

    server
        .get("/api/transacciones/0x1234")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn deployment_addresses_are_published() {
    let ledger = three_candidates();
    let server = create_test_server(&ledger);

    let json = server.get("/api/despliegue").await.json::<Value>();

    assert_eq!(json["contractAddress"], ledger.address().to_string());
    assert_eq!(json["forwarderAddress"], FORWARDER);
}

#[tokio::test]
async fn metrics_count_votes_and_listings() {
    let ledger = MockLedger::without_bulk_getter(&["Candidato 1"]);
    let server = create_test_server(&ledger);

    server.get("/api/candidatos").await.assert_status_ok();
    server
        .post("/api/votar")
        .json(&json!({ "candidateIndex": 0 }))
        .await;

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains(r#"voting_bridge_candidate_listings_total{strategy="scan"} 1"#));
    assert!(text.contains(r#"voting_bridge_votes_total{outcome="validation"} 1"#));
}
