//! Account Store boundary
//!
//! The only component allowed to call these methods is [`BalanceService`].
//! Balance writes are compare-and-swap on the previously observed value;
//! there is no blind overwrite.
//!
//! [`BalanceService`]: super::service::BalanceService

use async_trait::async_trait;

use super::error::AccountError;
use super::models::{Account, CasOutcome, OpStatus};
use crate::core_types::{Amount, OpId, UserId};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Insert a freshly registered account
    ///
    /// Fails with `Duplicate` if the user id is taken.
    async fn insert(&self, account: &Account) -> Result<(), AccountError>;

    /// Point lookup by user id
    async fn find(&self, user_id: &UserId) -> Result<Option<Account>, AccountError>;

    /// Replace the balance only if it still equals `expected_balance`.
    ///
    /// With an `op_id` the write and the op record are atomic: a replayed op
    /// returns `AlreadyApplied` and a fenced one returns `Voided`, both
    /// without touching the balance. The op check happens before the
    /// balance comparison.
    async fn conditional_update(
        &self,
        user_id: &UserId,
        expected_balance: Amount,
        new_balance: Amount,
        op_id: Option<&OpId>,
    ) -> Result<CasOutcome, AccountError>;

    /// Recorded outcome for an op id, if any
    async fn find_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<Option<OpStatus>, AccountError>;

    /// Fence an op id. Returns the final status: `Voided` if this call (or an
    /// earlier void) won, `Applied` if the adjustment got there first.
    async fn void_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<OpStatus, AccountError>;

    async fn health_check(&self) -> Result<(), AccountError>;
}
