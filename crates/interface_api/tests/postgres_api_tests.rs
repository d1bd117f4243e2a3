//! The router on top of the PostgreSQL stores
//!
//! Needs Docker; run with `cargo test -p interface_api -- --ignored`.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use core_kernel::ClaimId;
use domain_claims::{
    AgentKind, ClaimStore, LogLevel, MockAnalyzer, MockSettlement, MockTransferMode,
};
use domain_identity::UserStore;
use interface_api::config::AppConfig;
use interface_api::{create_router, Adapters, AppState};
use test_utils::{
    assert_awaiting_settlement, assert_chronological, assert_logged, assert_settled,
    create_isolated_test_database, AddressFixtures, AmountFixtures, ClaimBuilder,
    FindingsFixtures, TestDatabase, UserBuilder, UserFixtures, TEST_PASSWORD,
};

struct Harness {
    db: TestDatabase,
    server: TestServer,
    chain: Arc<MockSettlement>,
}

async fn harness() -> Harness {
    let db = create_isolated_test_database().await.unwrap();
    let chain = Arc::new(MockSettlement::new(MockTransferMode::Confirm));
    let adapters = Adapters {
        users: db.user_store(),
        claims: db.claim_store(),
        analyzer: Arc::new(MockAnalyzer::new(FindingsFixtures::strong())),
        chain: Some(chain.clone()),
        wallet_provider: None,
    };
    let state = AppState::new(AppConfig::default(), adapters).unwrap();
    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        db,
        chain,
    }
}

async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/auth/login")
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_claim_flows_from_submission_to_settlement() {
    let h = harness().await;
    let claimant = UserFixtures::claimant_with_wallet();
    let insurer = UserFixtures::insurer();
    h.db.user_store().insert_user(&claimant).await.unwrap();
    h.db.user_store().insert_user(&insurer).await.unwrap();

    let claimant_token = login(&h.server, &claimant.email).await;
    let insurer_token = login(&h.server, &insurer.email).await;

    let response = h
        .server
        .post("/claims")
        .authorization_bearer(&claimant_token)
        .json(&json!({
            "description": "Rear bumper cracked by a reversing delivery van",
            "amount": "1250.00",
            "evidence": [{
                "kind": "document",
                "file_name": "repair-invoice.pdf",
                "mime_type": "application/pdf",
                "uri": "gs://claimledger-evidence/repair-invoice.pdf"
            }]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();
    let claim_id: ClaimId = id.parse().unwrap();

    let response = h
        .server
        .post(&format!("/agent/evaluate/{}", id))
        .authorization_bearer(&claimant_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let stored = h.db.claim_store().get_claim(claim_id).await.unwrap();
    assert_awaiting_settlement(&stored, AmountFixtures::usdc_1250());
    assert_eq!(h.db.count("evaluations").await.unwrap(), 1);

    let response = h
        .server
        .post(&format!("/blockchain/settle/{}", id))
        .authorization_bearer(&insurer_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>()["recipient"],
        AddressFixtures::payout().as_str()
    );

    let stored = h.db.claim_store().get_claim(claim_id).await.unwrap();
    assert_settled(&stored);
    assert_eq!(h.chain.transfers().await.len(), 1);

    let logs = h.db.claim_store().list_logs(claim_id).await.unwrap();
    assert_logged(&logs, AgentKind::Settlement, LogLevel::Info);
    assert_chronological(&logs);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_insurer_sees_seeded_claims() {
    let h = harness().await;
    let claimant = UserBuilder::new().with_email("seeded@claimledger.io").build();
    let insurer = UserFixtures::insurer();
    h.db.user_store().insert_user(&claimant).await.unwrap();
    h.db.user_store().insert_user(&insurer).await.unwrap();

    let (claim, evidence) = ClaimBuilder::new()
        .with_claimant(claimant.id)
        .build_with_evidence();
    h.db.claim_store().insert_claim(&claim, &evidence).await.unwrap();

    let token = login(&h.server, &insurer.email).await;
    let response = h.server.get("/claims").authorization_bearer(&token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let claims = response.json::<Value>();
    assert_eq!(claims.as_array().unwrap().len(), 1);
    assert_eq!(claims[0]["claim_number"], claim.claim_number.as_str());

    // Tokens are stateless, so the insurer can still list after the wipe
    h.db.clear_data().await.unwrap();
    let response = h.server.get("/claims").authorization_bearer(&token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<Value>().as_array().unwrap().is_empty());
}
