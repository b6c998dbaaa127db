//! In-process client
//!
//! Used when all services run in one process: the order workflow talks to
//! the [`BalanceService`] directly instead of over HTTP, with the same
//! error classes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::BalanceClient;
use super::error::UpstreamError;
use super::http::DEFAULT_TIMEOUT;
use crate::account::{Account, AccountError, BalanceService, OpStatus};
use crate::core_types::{Amount, OpId, UserId};

pub struct LocalBalanceClient {
    service: Arc<BalanceService>,
    timeout: Duration,
}

impl LocalBalanceClient {
    pub fn new(service: Arc<BalanceService>) -> Self {
        Self::with_timeout(service, DEFAULT_TIMEOUT)
    }

    /// Each call gives up with `Timeout` after `timeout`, as the HTTP client does
    pub fn with_timeout(service: Arc<BalanceService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, AccountError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(UpstreamError::Timeout),
        }
    }
}

impl From<AccountError> for UpstreamError {
    fn from(e: AccountError) -> Self {
        let body = e.to_string();
        match e {
            AccountError::NotFound(_) => UpstreamError::NotFound(body),
            AccountError::Conflict { .. } => UpstreamError::Conflict(body),
            AccountError::OperationVoided(_) => UpstreamError::Voided(body),
            AccountError::InsufficientFunds { .. } => UpstreamError::InsufficientFunds(body),
            AccountError::Store(detail) => {
                tracing::error!(error = %detail, "Account store failure");
                UpstreamError::Status {
                    status: 500,
                    body: "internal error".to_string(),
                }
            }
            other => UpstreamError::Rejected {
                status: other.http_status(),
                body,
            },
        }
    }
}

#[async_trait]
impl BalanceClient for LocalBalanceClient {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<Account, UpstreamError> {
        self.bounded(self.service.get_balance(user_id)).await
    }

    async fn adjust_balance(
        &self,
        user_id: &UserId,
        delta: Amount,
        expected_balance: Option<Amount>,
        op_id: Option<&OpId>,
    ) -> Result<(), UpstreamError> {
        self.bounded(
            self.service
                .adjust_balance(user_id, delta, expected_balance, op_id),
        )
        .await?;
        Ok(())
    }

    async fn void_operation(
        &self,
        user_id: &UserId,
        op_id: &OpId,
    ) -> Result<OpStatus, UpstreamError> {
        self.bounded(self.service.void_operation(user_id, op_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountStore, CasOutcome, InMemoryAccountStore};

    /// Account store that answers every call after a fixed delay
    struct SlowStore {
        inner: InMemoryAccountStore,
        delay: Duration,
    }

    #[async_trait]
    impl AccountStore for SlowStore {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn insert(&self, account: &Account) -> Result<(), AccountError> {
            self.inner.insert(account).await
        }

        async fn find(&self, user_id: &UserId) -> Result<Option<Account>, AccountError> {
            tokio::time::sleep(self.delay).await;
            self.inner.find(user_id).await
        }

        async fn conditional_update(
            &self,
            user_id: &UserId,
            expected_balance: Amount,
            new_balance: Amount,
            op_id: Option<&OpId>,
        ) -> Result<CasOutcome, AccountError> {
            tokio::time::sleep(self.delay).await;
            self.inner
                .conditional_update(user_id, expected_balance, new_balance, op_id)
                .await
        }

        async fn find_operation(
            &self,
            user_id: &UserId,
            op_id: &OpId,
        ) -> Result<Option<OpStatus>, AccountError> {
            self.inner.find_operation(user_id, op_id).await
        }

        async fn void_operation(
            &self,
            user_id: &UserId,
            op_id: &OpId,
        ) -> Result<OpStatus, AccountError> {
            tokio::time::sleep(self.delay).await;
            self.inner.void_operation(user_id, op_id).await
        }

        async fn health_check(&self) -> Result<(), AccountError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(SlowStore {
            inner: InMemoryAccountStore::new(),
            delay: Duration::from_millis(300),
        });
        let service = Arc::new(BalanceService::new(store));
        let user = service.create_account("alice", "acc").await.unwrap().user_id;
        let client = LocalBalanceClient::with_timeout(service, Duration::from_millis(20));

        let read = client.get_balance(&user).await;
        assert_eq!(read, Err(UpstreamError::Timeout));
        assert!(read.unwrap_err().is_transient());

        let op = OpId::from("order-1");
        assert_eq!(
            client.adjust_balance(&user, 10, Some(0), Some(&op)).await,
            Err(UpstreamError::Timeout)
        );
        assert_eq!(
            client.void_operation(&user, &op).await,
            Err(UpstreamError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_errors_keep_their_class() {
        let service = Arc::new(BalanceService::new(Arc::new(InMemoryAccountStore::new())));
        let user = service.create_account("alice", "acc").await.unwrap().user_id;
        let client = LocalBalanceClient::new(service);

        assert!(matches!(
            client.get_balance(&UserId::from("nobody")).await,
            Err(UpstreamError::NotFound(_))
        ));
        assert!(matches!(
            client.adjust_balance(&user, -10, None, None).await,
            Err(UpstreamError::InsufficientFunds(_))
        ));
        assert!(matches!(
            client.adjust_balance(&user, 10, Some(5), None).await,
            Err(UpstreamError::Conflict(_))
        ));
        assert!(matches!(
            client.adjust_balance(&user, 0, None, None).await,
            Err(UpstreamError::Rejected { status: 400, .. })
        ));
        assert_eq!(
            UpstreamError::from(AccountError::Store("connection to db-1:5432 refused".into()))
                .public_detail(),
            "internal error"
        );
    }
}
