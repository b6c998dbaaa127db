//! Balance Service
//!
//! Single writer authority for account balances. Every mutation goes
//! through [`BalanceService::adjust_balance`], which is a read-modify-write
//! guarded by the balance last observed.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::AccountError;
use super::models::{Account, CasOutcome, OpStatus};
use super::store::AccountStore;
use crate::core_types::{Amount, OpId, UserId};

/// Default bound on the internal read/CAS loop for unguarded adjustments
pub const DEFAULT_MAX_CAS_ATTEMPTS: u32 = 16;

pub struct BalanceService {
    store: Arc<dyn AccountStore>,
    max_cas_attempts: u32,
}

impl BalanceService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_CAS_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Arc<dyn AccountStore>, max_cas_attempts: u32) -> Self {
        Self {
            store,
            max_cas_attempts: max_cas_attempts.max(1),
        }
    }

    /// Register a new account with a zero balance
    pub async fn create_account(
        &self,
        display_name: &str,
        account_tag: &str,
    ) -> Result<Account, AccountError> {
        if display_name.trim().is_empty() {
            return Err(AccountError::Validation("username is required".into()));
        }
        if account_tag.trim().is_empty() {
            return Err(AccountError::Validation("account is required".into()));
        }

        let account = Account::register(display_name, account_tag);
        self.store.insert(&account).await?;
        info!(user_id = %account.user_id, store = self.store.name(), "Account created");
        Ok(account)
    }

    pub async fn get_balance(&self, user_id: &UserId) -> Result<Account, AccountError> {
        self.store
            .find(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(user_id.clone()))
    }

    /// Apply `balance += delta`.
    ///
    /// With `expected_balance` the write is a single CAS against the
    /// caller's observation and fails with `Conflict` if the balance moved;
    /// the caller must re-read and redo its decision. Without it the service
    /// re-reads and retries its own CAS up to the configured bound.
    ///
    /// A resulting negative balance is refused with `InsufficientFunds`
    /// before anything is written.
    pub async fn adjust_balance(
        &self,
        user_id: &UserId,
        delta: Amount,
        expected_balance: Option<Amount>,
        op_id: Option<&OpId>,
    ) -> Result<Account, AccountError> {
        if delta == 0 {
            return Err(AccountError::InvalidAmount);
        }

        if let Some(expected) = expected_balance {
            return self.try_adjust(user_id, expected, delta, op_id).await;
        }

        let mut last_error = None;
        for attempt in 1..=self.max_cas_attempts {
            let observed = self.get_balance(user_id).await?.balance;
            match self.try_adjust(user_id, observed, delta, op_id).await {
                Err(AccountError::Conflict { expected, actual }) => {
                    debug!(
                        user_id = %user_id,
                        attempt,
                        expected,
                        actual,
                        "Balance moved under adjustment, retrying"
                    );
                    last_error = Some(AccountError::Conflict { expected, actual });
                }
                other => return other,
            }
        }

        warn!(
            user_id = %user_id,
            attempts = self.max_cas_attempts,
            "Balance adjustment gave up after repeated conflicts"
        );
        Err(last_error.unwrap_or(AccountError::Conflict {
            expected: 0,
            actual: 0,
        }))
    }

    async fn try_adjust(
        &self,
        user_id: &UserId,
        expected: Amount,
        delta: Amount,
        op_id: Option<&OpId>,
    ) -> Result<Account, AccountError> {
        let new_balance = expected.checked_add(delta).ok_or(AccountError::Overflow)?;
        if new_balance < 0 {
            return Err(AccountError::InsufficientFunds {
                shortfall: -new_balance,
            });
        }

        match self
            .store
            .conditional_update(user_id, expected, new_balance, op_id)
            .await?
        {
            CasOutcome::Updated(account) => {
                info!(
                    user_id = %user_id,
                    delta,
                    balance = account.balance,
                    op_id = op_id.map(|o| o.as_str()).unwrap_or("-"),
                    "Balance adjusted"
                );
                Ok(account)
            }
            CasOutcome::AlreadyApplied(account) => {
                debug!(user_id = %user_id, op_id = ?op_id, "Replayed op ignored");
                Ok(account)
            }
            CasOutcome::Conflict { current } => Err(AccountError::Conflict {
                expected,
                actual: current,
            }),
            CasOutcome::NotFound => Err(AccountError::NotFound(user_id.clone())),
            CasOutcome::Voided => {
                let op_id = op_id.cloned().unwrap_or_else(|| OpId::from("-"));
                warn!(user_id = %user_id, op_id = %op_id, "Adjustment refused, op was voided");
                Err(AccountError::OperationVoided(op_id))
            }
        }
    }

    /// Recorded outcome of an op id; `None` if it was never seen
    pub async fn operation_status(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<Option<OpStatus>, AccountError> {
        self.store.find_operation(user_id, op_id).await
    }

    /// Fence an op id so a late adjustment carrying it is refused
    pub async fn void_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<OpStatus, AccountError> {
        let status = self.store.void_operation(user_id, op_id).await?;
        info!(user_id = %user_id, op_id = %op_id, status = %status, "Op void requested");
        Ok(status)
    }

    pub async fn health_check(&self) -> Result<(), AccountError> {
        self.store.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::memory::InMemoryAccountStore;

    async fn setup(balance: Amount) -> (BalanceService, UserId) {
        let store = Arc::new(InMemoryAccountStore::new());
        let service = BalanceService::new(store.clone());
        let account = service.create_account("alice", "acc1").await.unwrap();
        if balance > 0 {
            service
                .adjust_balance(&account.user_id, balance, None, None)
                .await
                .unwrap();
        }
        (service, account.user_id)
    }

    #[tokio::test]
    async fn test_create_account_requires_fields() {
        let service = BalanceService::new(Arc::new(InMemoryAccountStore::new()));
        assert!(matches!(
            service.create_account("", "acc").await,
            Err(AccountError::Validation(_))
        ));
        assert!(matches!(
            service.create_account("bob", " ").await,
            Err(AccountError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_balance_not_found() {
        let service = BalanceService::new(Arc::new(InMemoryAccountStore::new()));
        let result = service.get_balance(&UserId::from("nobody")).await;
        assert!(matches!(result, Err(AccountError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_debit_then_credit_restores_balance() {
        let (service, user) = setup(500).await;

        service.adjust_balance(&user, -300, None, None).await.unwrap();
        assert_eq!(service.get_balance(&user).await.unwrap().balance, 200);

        service.adjust_balance(&user, 300, None, None).await.unwrap();
        assert_eq!(service.get_balance(&user).await.unwrap().balance, 500);
    }

    #[tokio::test]
    async fn test_overdraft_refused_without_write() {
        let (service, user) = setup(100).await;

        let result = service.adjust_balance(&user, -150, None, None).await;
        assert_eq!(
            result,
            Err(AccountError::InsufficientFunds { shortfall: 50 })
        );
        assert_eq!(service.get_balance(&user).await.unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_zero_delta_rejected() {
        let (service, user) = setup(100).await;
        assert_eq!(
            service.adjust_balance(&user, 0, None, None).await,
            Err(AccountError::InvalidAmount)
        );
    }

    #[tokio::test]
    async fn test_guarded_write_conflicts_on_stale_observation() {
        let (service, user) = setup(100).await;

        // Someone else spends in between
        service.adjust_balance(&user, -30, None, None).await.unwrap();

        let result = service.adjust_balance(&user, -50, Some(100), None).await;
        assert_eq!(
            result,
            Err(AccountError::Conflict {
                expected: 100,
                actual: 70
            })
        );
        assert_eq!(service.get_balance(&user).await.unwrap().balance, 70);
    }

    #[tokio::test]
    async fn test_keyed_debit_applies_once() {
        let (service, user) = setup(100).await;
        let op = OpId::from("order-a");

        let first = service
            .adjust_balance(&user, -40, Some(100), Some(&op))
            .await
            .unwrap();
        assert_eq!(first.balance, 60);

        let replay = service
            .adjust_balance(&user, -40, Some(100), Some(&op))
            .await
            .unwrap();
        assert_eq!(replay.balance, 60);
        assert_eq!(
            service.operation_status(&user, &op).await.unwrap(),
            Some(OpStatus::Applied)
        );
    }

    #[tokio::test]
    async fn test_voided_op_is_refused() {
        let (service, user) = setup(100).await;
        let op = OpId::from("order-b");

        assert_eq!(
            service.void_operation(&user, &op).await.unwrap(),
            OpStatus::Voided
        );
        let result = service.adjust_balance(&user, -40, Some(100), Some(&op)).await;
        assert!(matches!(result, Err(AccountError::OperationVoided(_))));
        assert_eq!(service.get_balance(&user).await.unwrap().balance, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unguarded_credits_lose_nothing() {
        let (service, user) = setup(0).await;
        let service = Arc::new(service);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                let user = user.clone();
                tokio::spawn(async move { service.adjust_balance(&user, 5, None, None).await })
            })
            .collect();

        let mut ok = 0;
        for result in futures::future::join_all(handles).await {
            if result.unwrap().is_ok() {
                ok += 1;
            }
        }

        let balance = service.get_balance(&user).await.unwrap().balance;
        assert_eq!(balance, 5 * ok);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_guarded_debits_never_overdraw() {
        let (service, user) = setup(100).await;
        let service = Arc::new(service);

        // Everyone observed 100 and tries to take 30
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = service.clone();
                let user = user.clone();
                tokio::spawn(async move { service.adjust_balance(&user, -30, Some(100), None).await })
            })
            .collect();

        let successes = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(service.get_balance(&user).await.unwrap().balance, 70);
    }
}
