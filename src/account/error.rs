//! Account error types

use thiserror::Error;

use crate::core_types::{Amount, OpId, UserId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("user not found: {0}")]
    NotFound(UserId),

    #[error("balance changed concurrently (expected {expected}, found {actual})")]
    Conflict { expected: Amount, actual: Amount },

    #[error("insufficient balance. add {shortfall} more amount to account")]
    InsufficientFunds { shortfall: Amount },

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("balance arithmetic overflow")]
    Overflow,

    #[error("user already exists: {0}")]
    Duplicate(UserId),

    #[error("operation {0} was voided")]
    OperationVoided(OpId),

    #[error("store error: {0}")]
    Store(String),
}

impl AccountError {
    /// Stable error code for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::NotFound(_) => "USER_NOT_FOUND",
            AccountError::Conflict { .. } => "CONFLICT",
            AccountError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AccountError::InvalidAmount => "INVALID_AMOUNT",
            AccountError::Validation(_) => "VALIDATION_ERROR",
            AccountError::Overflow => "OVERFLOW",
            AccountError::Duplicate(_) => "DUPLICATE",
            AccountError::OperationVoided(_) => "OPERATION_VOIDED",
            AccountError::Store(_) => "STORE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            AccountError::InvalidAmount
            | AccountError::Validation(_)
            | AccountError::Overflow => 400,
            AccountError::NotFound(_) => 404,
            AccountError::Conflict { .. } | AccountError::Duplicate(_) => 409,
            AccountError::OperationVoided(_) => 410,
            AccountError::InsufficientFunds { .. } => 422,
            AccountError::Store(_) => 500,
        }
    }
}

impl From<sqlx::Error> for AccountError {
    fn from(e: sqlx::Error) -> Self {
        AccountError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(AccountError::NotFound(UserId::from("x")).http_status(), 404);
        assert_eq!(
            AccountError::Conflict {
                expected: 1,
                actual: 2
            }
            .http_status(),
            409
        );
        assert_eq!(
            AccountError::OperationVoided(OpId::from("op")).http_status(),
            410
        );
        assert_eq!(
            AccountError::InsufficientFunds { shortfall: 5 }.http_status(),
            422
        );
        assert_eq!(AccountError::Store("down".into()).http_status(), 500);
    }

    #[test]
    fn test_shortfall_message() {
        let err = AccountError::InsufficientFunds { shortfall: 100 };
        assert_eq!(
            err.to_string(),
            "insufficient balance. add 100 more amount to account"
        );
    }
}
