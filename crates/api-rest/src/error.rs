use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use healthchain_core::DappError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// A core error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DappError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_input_error() => StatusCode::BAD_REQUEST,
            DappError::NotConnected
            | DappError::NoWalletProvider
            | DappError::UserRejected
            | DappError::NoAccounts => StatusCode::SERVICE_UNAVAILABLE,
            DappError::NotOwner => StatusCode::FORBIDDEN,
            DappError::Reverted(_) | DappError::TransactionFailed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DappError::ReceiptTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl<E: Into<DappError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self.0 {
            DappError::NotConnected => "Not connected to a wallet".to_string(),
            DappError::NotOwner => "Only contract owner can call this function".to_string(),
            e => e.to_string(),
        };
        (status, Json(ErrorRes { error })).into_response()
    }
}
