//! End-to-end: dashboard -> HttpTransport (reqwest) -> JSON-RPC over HTTP (axum) -> MockChain.

use axum::{extract::State, routing::post, Json, Router};
use healthchain_core::testing::MockChain;
use healthchain_core::{
    Action, ActionState, Address, ConnectionState, CoreConfig, Dashboard, FormField,
    HttpTransport, ReceiptPolicy, Transport, WalletConnector, U256,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn rpc(State(chain): State<Arc<MockChain>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let method = req["method"].as_str().unwrap_or_default().to_string();
    match chain.handle(&method, req["params"].clone()) {
        Ok(result) => Json(json!({"jsonrpc": "2.0", "id": id, "result": result})),
        Err(error) => Json(json!({"jsonrpc": "2.0", "id": id, "error": error})),
    }
}

async fn serve(chain: Arc<MockChain>) -> String {
    let app = Router::new().route("/", post(rpc)).with_state(chain);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn account(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

async fn dashboard_over_http(chain: Arc<MockChain>) -> Dashboard {
    let url = serve(chain).await;
    let policy = ReceiptPolicy {
        interval: Duration::from_millis(5),
        max_attempts: 20,
    };
    let cfg = Arc::new(CoreConfig::new(Some(url), MockChain::CONTRACT, policy).unwrap());
    let connector = WalletConnector::from_config(&cfg);
    assert!(connector.has_provider());
    Dashboard::initialise(cfg, connector).await
}

#[tokio::test]
async fn test_owner_flow_over_http() {
    let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
    chain.set_receipt_delay(2);
    let mut dashboard = dashboard_over_http(chain.clone()).await;

    assert!(matches!(
        dashboard.connection(),
        ConnectionState::Connected(s) if s.is_owner()
    ));

    dashboard.set_field(FormField::ProviderAddress, account(2).to_string());
    dashboard.authorize_provider().await.unwrap();
    assert!(chain.is_authorized(account(2)));

    dashboard.set_field(FormField::PatientId, "100");
    dashboard.set_field(FormField::PatientName, "Bob");
    dashboard.set_field(FormField::Diagnosis, "Sprain");
    dashboard.set_field(FormField::Treatment, "Ice");
    dashboard.add_record().await.unwrap();

    assert_eq!(dashboard.action_state(Action::Add), ActionState::Succeeded);
    let records = dashboard.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].patient_name, "Bob");
    assert_eq!(chain.records_for(U256::from(100u64)), records.to_vec());
}

#[tokio::test]
async fn test_rejected_wallet_over_http() {
    let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
    chain.reject_account_requests();
    let dashboard = dashboard_over_http(chain).await;

    assert!(matches!(dashboard.connection(), ConnectionState::Failed(_)));
    assert!(dashboard.session().is_none());
}

#[tokio::test]
async fn test_revert_reason_survives_http() {
    let chain = Arc::new(MockChain::new(account(1), vec![account(2)]));
    let url = serve(chain).await;
    let transport = HttpTransport::new(url);

    let data = {
        let chain = MockChain::new(account(1), vec![]);
        chain.authorize_provider_call_data(account(3))
    };
    let err = transport
        .request(
            "eth_sendTransaction",
            json!([{
                "from": account(2).to_lower_hex(),
                "to": MockChain::CONTRACT.to_lower_hex(),
                "data": format!("0x{}", hex::encode(data)),
            }]),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Only owner"));
}
