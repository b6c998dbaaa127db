//! Per-service shared state

use std::sync::Arc;

use async_trait::async_trait;

use crate::account::BalanceService;
use crate::order::{OrderStore, OrderWorkflow};
use crate::upstream::BalanceClient;

/// Users service: owner of the Account Store
#[derive(Clone)]
pub struct UsersState {
    pub balances: Arc<BalanceService>,
}

/// Payment service: credits through the Users service
#[derive(Clone)]
pub struct PaymentState {
    pub users: Arc<dyn BalanceClient>,
}

/// Order service: the saga and its store
#[derive(Clone)]
pub struct OrderState {
    pub workflow: Arc<OrderWorkflow>,
    pub orders: Arc<dyn OrderStore>,
}

/// What `/health` checks for a service: its own store and nothing else
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn healthy(&self) -> bool;
}

#[async_trait]
impl HealthProbe for UsersState {
    async fn healthy(&self) -> bool {
        match self.balances.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Account store health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl HealthProbe for PaymentState {
    async fn healthy(&self) -> bool {
        true
    }
}

#[async_trait]
impl HealthProbe for OrderState {
    async fn healthy(&self) -> bool {
        match self.orders.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = ?e, "Order store health check failed");
                false
            }
        }
    }
}
