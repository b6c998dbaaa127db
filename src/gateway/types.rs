//! Wire types and the API error
//!
//! Every failure leaves the services as `{"message": <string>}` with a
//! status code. Server-side detail is logged here and never returned.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::account::{AccountError, OpStatus};
use crate::core_types::Amount;
use crate::order::OrderError;
use crate::upstream::UpstreamError;

// ============================================================================
// Request / response bodies
// ============================================================================

/// `POST /users`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[schema(example = "alice")]
    pub username: String,
    #[serde(default)]
    #[schema(example = "acc1")]
    pub account: String,
}

/// `PUT /users/{userID}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdjustBalanceRequest {
    /// Signed delta in minor units; negative for a debit
    #[schema(example = 500)]
    pub amount: Amount,
    /// Apply only if the balance still equals this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_balance: Option<Amount>,
    /// Idempotency key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<String>,
}

/// Recorded outcome of a keyed balance operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OperationStatusResponse {
    pub op_id: String,
    pub status: OpStatus,
}

/// `PUT /payments/transfer/id/{userID}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentRequest {
    #[schema(example = 500)]
    pub amount: Amount,
}

/// `POST /orders`, echoed back with `id` set on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderRequest {
    /// Ignored on input; the server assigns it
    #[serde(default)]
    pub id: String,
    #[serde(rename = "userid", default)]
    pub user_id: String,
    #[serde(default)]
    #[schema(example = "book")]
    pub product_name: String,
    #[serde(default)]
    #[schema(example = 300)]
    pub price: Amount,
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "insufficient balance. add 100 more amount to account")]
    pub message: String,
}

// ============================================================================
// ApiError
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }

    fn from_code(status: u16, message: String) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, message)
    }

    /// A failed call to the Users service, as seen by the Payment service
    pub fn from_upstream(e: UpstreamError) -> Self {
        let message = format!("payment failed. got response: {}", e.public_detail());
        let status = match &e {
            UpstreamError::NotFound(_) => StatusCode::NOT_FOUND,
            UpstreamError::Conflict(_) => StatusCode::CONFLICT,
            UpstreamError::InsufficientFunds(_) => StatusCode::UNPROCESSABLE_ENTITY,
            UpstreamError::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            UpstreamError::Timeout | UpstreamError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            UpstreamError::Voided(_) | UpstreamError::Status { .. } | UpstreamError::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        if status.is_server_error() {
            tracing::warn!(error = ?e, "Users service call failed");
        }
        Self::new(status, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Store(detail) => {
                tracing::error!(error = %detail, "Account store failure");
                ApiError::internal("internal error")
            }
            other => ApiError::from_code(other.http_status(), other.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        if !e.is_client_error() {
            tracing::error!(code = e.code(), error = ?e, "Order request failed");
        }
        ApiError::from_code(e.http_status(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{OrderId, UserId};

    #[test]
    fn test_store_detail_hidden() {
        let err = ApiError::from(AccountError::Store("password=hunter2".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal error");
    }

    #[test]
    fn test_account_error_mapping() {
        let err = ApiError::from(AccountError::NotFound(UserId::from("u1")));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = ApiError::from(AccountError::InsufficientFunds { shortfall: 7 });
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.message,
            "insufficient balance. add 7 more amount to account"
        );
    }

    #[test]
    fn test_order_error_mapping() {
        let err = ApiError::from(OrderError::ConsistencyGap {
            order_id: OrderId::new(),
            detail: "store down".into(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("store down"));
    }

    #[test]
    fn test_upstream_mapping() {
        let err = ApiError::from_upstream(UpstreamError::NotFound("user not found: x".into()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "payment failed. got response: user not found: x");

        let err = ApiError::from_upstream(UpstreamError::Timeout);
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from_upstream(UpstreamError::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_adjust_request_optional_fields() {
        let req: AdjustBalanceRequest = serde_json::from_str(r#"{"amount":5}"#).unwrap();
        assert_eq!(req.expected_balance, None);
        assert_eq!(req.op_id, None);
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"amount":5}"#);
    }
}
