//! Order error types
//!
//! Display strings are what callers see. Store and transport detail stays in
//! the variant payload and goes to the log only.

use thiserror::Error;

use crate::core_types::{Amount, OrderId, UserId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    // === Client errors ===
    #[error("{0}")]
    Validation(String),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("insufficient balance. add {shortfall} more amount to account")]
    InsufficientFunds { shortfall: Amount },

    #[error("balance kept changing, order not placed; retry later")]
    Conflict(String),

    #[error("order not found: {0}")]
    NotFound(OrderId),

    // === Server errors ===
    #[error("payment failed. got response: {0}")]
    UpstreamUnavailable(String),

    #[error("failed to persist order")]
    Persistence(String),

    #[error("order id already exists: {0}")]
    DuplicateId(OrderId),

    /// Order written, debit outcome not settled; the reconciler owns it now
    #[error("order {order_id} could not be confirmed and will be reconciled")]
    ConsistencyGap { order_id: OrderId, detail: String },
}

impl OrderError {
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "VALIDATION_ERROR",
            OrderError::UserNotFound(_) => "USER_NOT_FOUND",
            OrderError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            OrderError::Conflict(_) => "CONFLICT",
            OrderError::NotFound(_) => "ORDER_NOT_FOUND",
            OrderError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            OrderError::Persistence(_) => "PERSISTENCE_ERROR",
            OrderError::DuplicateId(_) => "DUPLICATE_ID",
            OrderError::ConsistencyGap { .. } => "CONSISTENCY_GAP",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            OrderError::Validation(_) => 400,
            OrderError::UserNotFound(_) | OrderError::NotFound(_) => 404,
            OrderError::Conflict(_) => 409,
            OrderError::InsufficientFunds { .. } => 422,
            OrderError::UpstreamUnavailable(_) => 503,
            OrderError::Persistence(_)
            | OrderError::DuplicateId(_)
            | OrderError::ConsistencyGap { .. } => 500,
        }
    }

    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        OrderError::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(OrderError::Validation("x".into()).http_status(), 400);
        assert_eq!(OrderError::UserNotFound(UserId::from("u")).http_status(), 404);
        assert_eq!(
            OrderError::InsufficientFunds { shortfall: 1 }.http_status(),
            422
        );
        assert_eq!(OrderError::Conflict("x".into()).http_status(), 409);
        assert_eq!(OrderError::UpstreamUnavailable("x".into()).http_status(), 503);
        assert_eq!(
            OrderError::ConsistencyGap {
                order_id: OrderId::new(),
                detail: "x".into()
            }
            .http_status(),
            500
        );
    }

    #[test]
    fn test_store_detail_not_in_message() {
        let err = OrderError::Persistence("connection refused to 10.0.0.5".into());
        assert_eq!(err.to_string(), "failed to persist order");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_shortfall_message() {
        let err = OrderError::InsufficientFunds { shortfall: 100 };
        assert_eq!(
            err.to_string(),
            "insufficient balance. add 100 more amount to account"
        );
    }
}
