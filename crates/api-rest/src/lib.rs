//! # API REST
//!
//! REST API for the HealthChain client.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - the OpenAPI document (served as JSON)
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Handlers share one wallet connection, made at start-up, and call the contract binding in
//! `healthchain-core`. No per-user form state is kept here.

#![warn(rust_2018_idioms)]

mod error;

pub use error::{ApiError, ErrorRes};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use healthchain_core::{
    parse_patient_id, Address, Connection, DappError, HealthcareContract, NewRecord, Record,
    TransactionReceipt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    contract_address: Address,
    connection: Option<Connection>,
    connect_error: Option<String>,
}

impl AppState {
    /// State for a server whose start-up connection succeeded.
    pub fn connected(connection: Connection) -> Self {
        Self {
            contract_address: connection.contract.address(),
            connection: Some(connection),
            connect_error: None,
        }
    }

    /// State for a server that could not connect to a wallet. Contract routes answer 503.
    pub fn disconnected(contract_address: Address, reason: impl Into<String>) -> Self {
        Self {
            contract_address,
            connection: None,
            connect_error: Some(reason.into()),
        }
    }

    fn connection(&self) -> Result<&Connection, ApiError> {
        self.connection
            .as_ref()
            .ok_or(ApiError(DappError::NotConnected))
    }

    fn contract(&self) -> Result<Arc<HealthcareContract>, ApiError> {
        Ok(self.connection()?.contract.clone())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRes {
    pub connected: bool,
    pub account: Option<String>,
    /// Advisory only; the contract enforces ownership itself.
    pub is_owner: bool,
    pub contract_address: String,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordRes {
    #[serde(rename = "recordID")]
    pub record_id: String,
    pub patient_name: String,
    pub diagnosis: String,
    pub treatment: String,
    /// Unix seconds, as stored on chain.
    pub timestamp: u64,
    /// RFC 3339 rendering of `timestamp`, if representable.
    pub recorded_at: Option<String>,
}

impl From<Record> for RecordRes {
    fn from(record: Record) -> Self {
        Self {
            recorded_at: record.recorded_at().map(|t| t.to_rfc3339()),
            record_id: record.record_id.to_string(),
            patient_name: record.patient_name,
            diagnosis: record.diagnosis,
            treatment: record.treatment,
            timestamp: record.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecordsRes {
    pub patient_id: String,
    pub records: Vec<RecordRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddRecordReq {
    pub patient_id: String,
    pub patient_name: String,
    pub diagnosis: String,
    pub treatment: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeProviderReq {
    pub provider: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRes {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    pub message: String,
}

impl TransactionRes {
    fn new(receipt: TransactionReceipt, message: String) -> Self {
        Self {
            block_number: receipt.block_number().map(|n| n.to_string()),
            transaction_hash: receipt.transaction_hash,
            message,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        session,
        patient_records,
        add_record,
        authorize_provider,
    ),
    components(schemas(
        HealthRes,
        SessionRes,
        RecordRes,
        PatientRecordsRes,
        AddRecordReq,
        AuthorizeProviderReq,
        TransactionRes,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(session))
        .route("/patients/:patient_id/records", get(patient_records))
        .route("/records", post(add_record))
        .route("/providers", post(authorize_provider))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Answers even when no wallet is connected.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "HealthChain REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Connected account and owner flag", body = SessionRes)
    )
)]
/// Reports the wallet session established at start-up
#[axum::debug_handler]
async fn session(State(state): State<AppState>) -> Json<SessionRes> {
    let session = state.connection.as_ref().map(|c| c.session);
    Json(SessionRes {
        connected: session.is_some(),
        account: session.map(|s| s.account().to_string()),
        is_owner: session.map(|s| s.is_owner()).unwrap_or(false),
        contract_address: state.contract_address.to_string(),
        error: state.connect_error.clone(),
    })
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}/records",
    params(
        ("patient_id" = String, Path, description = "Decimal patient ID")
    ),
    responses(
        (status = 200, description = "Records in contract order", body = PatientRecordsRes),
        (status = 400, description = "Invalid patient ID", body = ErrorRes),
        (status = 502, description = "Wallet or node error", body = ErrorRes),
        (status = 503, description = "No wallet connected", body = ErrorRes)
    )
)]
/// Fetches a patient's records with `getPatientRecords`
///
/// Unknown patient IDs return an empty list.
#[axum::debug_handler]
async fn patient_records(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientRecordsRes>, ApiError> {
    let contract = state.contract()?;
    let id = parse_patient_id(&patient_id)?;

    let records = contract.get_patient_records(id).await.map_err(|e| {
        tracing::error!("Fetch patient records error: {:?}", e);
        e
    })?;
    tracing::debug!(patient_id = %id, count = records.len(), "fetched patient records");

    Ok(Json(PatientRecordsRes {
        patient_id: id.to_string(),
        records: records.into_iter().map(RecordRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/records",
    request_body = AddRecordReq,
    responses(
        (status = 201, description = "Record added", body = TransactionRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 422, description = "Rejected by the contract", body = ErrorRes),
        (status = 502, description = "Wallet or node error", body = ErrorRes),
        (status = 503, description = "No wallet connected", body = ErrorRes)
    )
)]
/// Adds a record with `addRecord`, signed by the connected account
///
/// The contract only accepts records from authorized providers.
#[axum::debug_handler]
async fn add_record(
    State(state): State<AppState>,
    Json(req): Json<AddRecordReq>,
) -> Result<(StatusCode, Json<TransactionRes>), ApiError> {
    let contract = state.contract()?;
    let record = NewRecord::from_form(
        &req.patient_id,
        &req.patient_name,
        &req.diagnosis,
        &req.treatment,
    )?;

    tracing::info!("adding record for patient {}", record.patient_id);
    let receipt = contract.add_record(&record).await.map_err(|e| {
        tracing::error!("Add record error: {:?}", e);
        e
    })?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionRes::new(
            receipt,
            "Record added successfully".into(),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/providers",
    request_body = AuthorizeProviderReq,
    responses(
        (status = 200, description = "Provider authorized", body = TransactionRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 403, description = "Connected account is not the owner", body = ErrorRes),
        (status = 422, description = "Rejected by the contract", body = ErrorRes),
        (status = 502, description = "Wallet or node error", body = ErrorRes),
        (status = 503, description = "No wallet connected", body = ErrorRes)
    )
)]
/// Authorizes a provider with `authorizeProvider`
///
/// Non-owner sessions are refused before submission. The contract checks ownership regardless.
#[axum::debug_handler]
async fn authorize_provider(
    State(state): State<AppState>,
    Json(req): Json<AuthorizeProviderReq>,
) -> Result<Json<TransactionRes>, ApiError> {
    let connection = state.connection()?;
    if !connection.session.is_owner() {
        tracing::warn!("authorize provider refused: connected account is not the owner");
        return Err(ApiError(DappError::NotOwner));
    }
    let provider = Address::parse(&req.provider).map_err(DappError::from)?;

    tracing::info!("authorizing provider {}", provider);
    let receipt = connection
        .contract
        .authorize_provider(provider)
        .await
        .map_err(|e| {
            tracing::error!("Authorize provider error: {:?}", e);
            e
        })?;

    Ok(Json(TransactionRes::new(
        receipt,
        format!("Provider {provider} authorized successfully"),
    )))
}

/// Serves the OpenAPI document.
async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use healthchain_core::testing::MockChain;
    use healthchain_core::{session, CoreConfig, ReceiptPolicy, U256};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn account(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    async fn connected(chain: &Arc<MockChain>) -> Router {
        let cfg = CoreConfig::new(None, MockChain::CONTRACT, ReceiptPolicy::default()).unwrap();
        let connection = session::connect(&cfg, &chain.connector()).await.unwrap();
        router(AppState::connected(connection))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(AppState::disconnected(MockChain::CONTRACT, "no wallet"));
        let (status, body) = send(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_session_reports_owner() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        let (status, body) = send(connected(&chain).await, get("/session")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connected"], true);
        assert_eq!(body["isOwner"], true);
        assert_eq!(body["account"], account(1).to_string());
    }

    #[tokio::test]
    async fn test_disconnected_server_answers_503() {
        let app = router(AppState::disconnected(MockChain::CONTRACT, "rejected"));

        let (status, body) = send(app.clone(), get("/session")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connected"], false);
        assert_eq!(body["error"], "rejected");

        let (status, body) = send(app, get("/patients/1/records")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Not connected to a wallet");
    }

    #[tokio::test]
    async fn test_add_then_fetch_records() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        let app = connected(&chain).await;

        let (status, body) = send(
            app.clone(),
            post_json(
                "/records",
                json!({
                    "patientId": "7",
                    "patientName": "Alice",
                    "diagnosis": "Flu",
                    "treatment": "Rest"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Record added successfully");

        let (status, body) = send(app, get("/patients/7/records")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patientId"], "7");
        let records = body["records"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["diagnosis"], "Flu");
        assert_eq!(records[0]["recordID"], "1");
    }

    #[tokio::test]
    async fn test_invalid_patient_id_is_400() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        let (status, _) = send(connected(&chain).await, get("/patients/abc/records")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unauthorized_add_is_422() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(2)]));
        let (status, body) = send(
            connected(&chain).await,
            post_json(
                "/records",
                json!({
                    "patientId": "1",
                    "patientName": "Alice",
                    "diagnosis": "Flu",
                    "treatment": "Rest"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("Not authorized"));
        assert!(chain.records_for(U256::from(1u64)).is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_cannot_authorize() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(2)]));
        let (status, _) = send(
            connected(&chain).await,
            post_json("/providers", json!({ "provider": account(3).to_string() })),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!chain.is_authorized(account(3)));
    }

    #[tokio::test]
    async fn test_owner_authorizes_provider() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        let provider = account(3);
        let (status, body) = send(
            connected(&chain).await,
            post_json("/providers", json!({ "provider": provider.to_lower_hex() })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            format!("Provider {provider} authorized successfully")
        );
        assert!(chain.is_authorized(provider));
    }

    #[tokio::test]
    async fn test_openapi_document_lists_routes() {
        let app = router(AppState::disconnected(MockChain::CONTRACT, "none"));
        let (status, body) = send(app, get("/api-docs/openapi.json")).await;

        assert_eq!(status, StatusCode::OK);
        let paths = body["paths"].as_object().unwrap();
        assert!(paths.contains_key("/patients/{patient_id}/records"));
        assert!(paths.contains_key("/providers"));
    }
}
