//! Reconciler
//!
//! Background worker that settles PENDING orders a request left behind
//! (crash between steps, void unreachable, SUCCESS flip lost).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::error::OrderError;
use super::store::OrderStore;
use super::workflow::OrderWorkflow;

/// Retries after which a stuck order is logged as critical
const ALERT_RETRY_THRESHOLD: i32 = 10;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How often to scan for stale orders
    pub scan_interval: Duration,
    /// How long an order must sit in PENDING to be considered stale
    pub stale_threshold: Duration,
    /// Maximum orders to settle per scan
    pub batch_size: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(60),
            batch_size: 100,
        }
    }
}

pub struct Reconciler {
    workflow: Arc<OrderWorkflow>,
    orders: Arc<dyn OrderStore>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        workflow: Arc<OrderWorkflow>,
        orders: Arc<dyn OrderStore>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            workflow,
            orders,
            config,
        }
    }

    /// Run the reconciler loop forever
    pub async fn run(&self) -> ! {
        info!(
            scan_interval_secs = self.config.scan_interval.as_secs(),
            stale_threshold_secs = self.config.stale_threshold.as_secs(),
            batch_size = self.config.batch_size,
            "Starting order reconciler"
        );

        loop {
            if let Err(e) = self.scan_and_settle().await {
                error!(error = ?e, "Reconciler scan failed");
            }

            tokio::time::sleep(self.config.scan_interval).await;
        }
    }

    /// Run a single scan. Returns how many orders reached a terminal status.
    pub async fn scan_and_settle(&self) -> Result<usize, OrderError> {
        let stale = self
            .orders
            .find_stale_pending(self.config.stale_threshold, self.config.batch_size)
            .await?;

        if stale.is_empty() {
            debug!("No stale pending orders");
            return Ok(0);
        }

        info!(count = stale.len(), "Found stale pending orders");

        let mut settled = 0;
        for order in &stale {
            if order.retry_count > ALERT_RETRY_THRESHOLD {
                warn!(
                    order_id = %order.order_id,
                    user_id = %order.user_id,
                    retry_count = order.retry_count,
                    "CRITICAL: order stuck in PENDING with many retries!"
                );
            }

            match self.workflow.settle_pending(order).await {
                Ok(status) if status.is_terminal() => {
                    info!(order_id = %order.order_id, status = %status, "Order reconciled");
                    settled += 1;
                }
                Ok(status) => {
                    debug!(order_id = %order.order_id, status = %status, "Order still pending");
                }
                Err(e) => {
                    warn!(
                        order_id = %order.order_id,
                        retry_count = order.retry_count + 1,
                        error = ?e,
                        "Failed to reconcile order"
                    );
                    if let Err(e) = self.orders.increment_retry(order.order_id).await {
                        error!(order_id = %order.order_id, error = ?e, "Failed to record retry");
                    }
                }
            }
        }

        if settled > 0 {
            info!(count = settled, "Reconciled orders this scan");
        }
        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{BalanceService, InMemoryAccountStore};
    use crate::core_types::{Amount, UserId};
    use crate::order::memory::InMemoryOrderStore;
    use crate::order::models::{Order, OrderStatus};
    use crate::order::workflow::WorkflowConfig;
    use crate::upstream::mock::ScriptedBalanceClient;
    use crate::upstream::{Backoff, BalanceClient, LocalBalanceClient, UpstreamError};

    struct Fixture {
        service: Arc<BalanceService>,
        client: Arc<ScriptedBalanceClient>,
        orders: Arc<InMemoryOrderStore>,
        reconciler: Reconciler,
    }

    fn fixture() -> Fixture {
        let service = Arc::new(BalanceService::new(Arc::new(InMemoryAccountStore::new())));
        let local: Arc<dyn BalanceClient> = Arc::new(LocalBalanceClient::new(service.clone()));
        let client = Arc::new(ScriptedBalanceClient::new(local));
        let orders = Arc::new(InMemoryOrderStore::new());
        let workflow = Arc::new(OrderWorkflow::new(
            client.clone(),
            orders.clone(),
            WorkflowConfig {
                backoff: Backoff::none(),
                ..WorkflowConfig::default()
            },
        ));
        let reconciler = Reconciler::new(workflow, orders.clone(), ReconcilerConfig::default());
        Fixture {
            service,
            client,
            orders,
            reconciler,
        }
    }

    /// A PENDING order as a crashed request would leave it
    async fn stranded(f: &Fixture, balance: Amount, price: Amount, debited: bool) -> (UserId, Order) {
        let user = f.service.create_account("bob", "acc2").await.unwrap().user_id;
        f.service.adjust_balance(&user, balance, None, None).await.unwrap();

        let order = Order::pending(user.clone(), "acc2", "lamp", price);
        f.orders.insert(&order).await.unwrap();
        if debited {
            f.service
                .adjust_balance(&user, -price, Some(balance), Some(&order.op_id()))
                .await
                .unwrap();
        }
        f.orders.backdate(order.order_id, Duration::from_secs(600));
        (user, order)
    }

    #[test]
    fn test_config_default() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.scan_interval, Duration::from_secs(30));
        assert_eq!(config.stale_threshold, Duration::from_secs(60));
        assert_eq!(config.batch_size, 100);
    }

    #[tokio::test]
    async fn test_debited_order_completes() {
        let f = fixture();
        let (user, order) = stranded(&f, 500, 300, true).await;

        assert_eq!(f.reconciler.scan_and_settle().await.unwrap(), 1);
        let stored = f.orders.get(order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Success);
        assert_eq!(f.service.get_balance(&user).await.unwrap().balance, 200);
    }

    #[tokio::test]
    async fn test_undebited_order_fails_and_is_fenced() {
        let f = fixture();
        let (user, order) = stranded(&f, 500, 300, false).await;

        assert_eq!(f.reconciler.scan_and_settle().await.unwrap(), 1);
        let stored = f.orders.get(order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);

        // A debit still in flight can no longer land
        assert!(
            f.service
                .adjust_balance(&user, -300, Some(500), Some(&order.op_id()))
                .await
                .is_err()
        );
        assert_eq!(f.service.get_balance(&user).await.unwrap().balance, 500);
    }

    #[tokio::test]
    async fn test_unreachable_users_service_bumps_retry() {
        let f = fixture();
        let (_, order) = stranded(&f, 500, 300, false).await;
        f.client
            .set_fail_void(Some(UpstreamError::Transport("refused".into())));

        assert_eq!(f.reconciler.scan_and_settle().await.unwrap(), 0);
        let stored = f.orders.get(order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(stored.retry_count, 1);
    }

    #[tokio::test]
    async fn test_fresh_pending_orders_left_alone() {
        let f = fixture();
        let order = Order::pending(UserId::from("u"), "acc", "pen", 5);
        f.orders.insert(&order).await.unwrap();

        assert_eq!(f.reconciler.scan_and_settle().await.unwrap(), 0);
        assert_eq!(f.client.void_count(), 0);
    }
}
