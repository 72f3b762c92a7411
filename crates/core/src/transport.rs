//! JSON-RPC transport to the wallet provider.
//!
//! The wallet provider is any Ethereum JSON-RPC 2.0 endpoint that manages accounts and signs
//! transactions for them. [`Transport`] is the seam the rest of the crate talks to; production
//! code uses [`HttpTransport`] and tests plug in an in-memory chain.

use crate::constants::{EXECUTION_REVERTED_CODE, USER_REJECTED_CODE};
use crate::error::{DappError, DappResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sends a single JSON-RPC request and returns its `result`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> DappResult<Value>;
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Classifies the provider error.
    ///
    /// User rejection and contract reverts get their own variants so callers can report them
    /// without parsing messages; everything else stays a generic RPC error.
    pub fn into_error(self) -> DappError {
        if self.code == USER_REJECTED_CODE {
            return DappError::UserRejected;
        }
        if self.code == EXECUTION_REVERTED_CODE || self.message.to_lowercase().contains("revert") {
            return DappError::Reverted(self.message);
        }
        DappError::Rpc {
            code: self.code,
            message: self.message,
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC over HTTP POST.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> DappResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id, method, "json-rpc request");

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.error {
            Some(error) => {
                tracing::debug!(id, method, code = error.code, "json-rpc error");
                Err(error.into_error())
            }
            None => Ok(response.result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use axum::{extract::State, routing::post, Json, Router};
    use healthchain_types::Address;
    use serde_json::json;
    use std::sync::Arc;

    async fn rpc_endpoint(
        State(chain): State<Arc<MockChain>>,
        Json(req): Json<Value>,
    ) -> Json<Value> {
        let id = req["id"].clone();
        let method = req["method"].as_str().unwrap_or_default().to_string();
        let params = req["params"].clone();

        match chain.handle(&method, params) {
            Ok(result) => Json(json!({"jsonrpc": "2.0", "id": id, "result": result})),
            Err(error) => Json(json!({"jsonrpc": "2.0", "id": id, "error": error})),
        }
    }

    async fn serve(chain: Arc<MockChain>) -> String {
        let app = Router::new()
            .route("/", post(rpc_endpoint))
            .with_state(chain);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn owner() -> Address {
        Address::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    #[test]
    fn test_into_error_classifies_provider_errors() {
        assert!(matches!(
            RpcErrorObject::new(4001, "User rejected the request.").into_error(),
            DappError::UserRejected
        ));
        assert!(matches!(
            RpcErrorObject::new(3, "execution reverted: Not owner").into_error(),
            DappError::Reverted(m) if m.contains("Not owner")
        ));
        assert!(matches!(
            RpcErrorObject::new(-32000, "VM Exception while processing transaction: revert")
                .into_error(),
            DappError::Reverted(_)
        ));
        assert!(matches!(
            RpcErrorObject::new(-32602, "invalid params").into_error(),
            DappError::Rpc { code: -32602, .. }
        ));
    }

    #[tokio::test]
    async fn test_http_transport_returns_result() {
        let chain = Arc::new(MockChain::new(owner(), vec![owner()]));
        let url = serve(chain).await;
        let transport = HttpTransport::new(url);

        let accounts = transport.request("eth_accounts", json!([])).await.unwrap();
        assert_eq!(accounts, json!([owner().to_lower_hex()]));
    }

    #[tokio::test]
    async fn test_http_transport_maps_error_objects() {
        let chain = Arc::new(MockChain::new(owner(), vec![owner()]));
        chain.reject_account_requests();
        let url = serve(chain).await;
        let transport = HttpTransport::new(url);

        let err = transport
            .request("eth_requestAccounts", json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, DappError::UserRejected));

        let err = transport.request("eth_mine", json!([])).await.unwrap_err();
        assert!(matches!(err, DappError::Rpc { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_http_transport_null_result_is_ok() {
        let chain = Arc::new(MockChain::new(owner(), vec![owner()]));
        let url = serve(chain).await;
        let transport = HttpTransport::new(url);

        let receipt = transport
            .request(
                "eth_getTransactionReceipt",
                json!([format!("0x{}", "ab".repeat(32))]),
            )
            .await
            .unwrap();
        assert_eq!(receipt, Value::Null);
    }

    #[tokio::test]
    async fn test_http_transport_unreachable_endpoint() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let transport = HttpTransport::new("http://127.0.0.1:9");
        let err = transport
            .request("eth_accounts", json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, DappError::Transport(_)));
    }
}
