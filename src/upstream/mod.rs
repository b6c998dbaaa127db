//! Upstream clients
//!
//! How the Order and Payment services reach the Users service. The Users
//! service stays the single writer of balances; everything here is a
//! request to it.
//!
//! # Outcome classes
//!
//! - **Explicit**: the service answered and refused (`NotFound`, `Conflict`,
//!   `Voided`, `InsufficientFunds`). Nothing was written.
//! - **Unknown**: timeout, transport failure, 5xx. The write may have
//!   landed. Only keyed (op id) writes may be retried.

pub mod error;
pub mod http;
pub mod local;
pub mod retry;

pub use error::UpstreamError;
pub use http::HttpBalanceClient;
pub use local::LocalBalanceClient;
pub use retry::{Backoff, retry_idempotent};

use async_trait::async_trait;

use crate::account::{Account, OpStatus};
use crate::core_types::{Amount, OpId, UserId};

/// Client side of the Balance Service contract
#[async_trait]
pub trait BalanceClient: Send + Sync {
    /// Get client name for logging
    fn name(&self) -> &'static str;

    async fn get_balance(&self, user_id: &UserId) -> Result<Account, UpstreamError>;

    /// `balance += delta`, optionally guarded by `expected_balance` and
    /// keyed by `op_id`.
    async fn adjust_balance(
        &self,
        user_id: &UserId,
        delta: Amount,
        expected_balance: Option<Amount>,
        op_id: Option<&OpId>,
    ) -> Result<(), UpstreamError>;

    /// Fence an op id; returns whether the adjustment got there first
    async fn void_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<OpStatus, UpstreamError>;
}
