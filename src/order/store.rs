//! Order Store boundary
//!
//! Orders are inserted once. The only later writes are status flips and the
//! reconciler's retry counter, and every status flip is compare-and-swap on
//! the previous status.

use std::time::Duration;

use async_trait::async_trait;

use super::error::OrderError;
use super::models::{Order, OrderStatus};
use crate::core_types::OrderId;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Insert a new order. Fails with `DuplicateId` if the id is taken.
    async fn insert(&self, order: &Order) -> Result<(), OrderError>;

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, OrderError>;

    /// Flip `from -> to` only if the order is still in `from`.
    ///
    /// Returns `false` (and writes nothing) when the order is missing or
    /// already left `from`.
    async fn update_status_if(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        error: Option<&str>,
    ) -> Result<bool, OrderError>;

    /// Bump the reconciler attempt counter and touch `updated_at`
    async fn increment_retry(&self, order_id: OrderId) -> Result<(), OrderError>;

    /// PENDING orders not updated for at least `older_than`, oldest first
    async fn find_stale_pending(
        &self,
        older_than: Duration,
        limit: usize,
    ) -> Result<Vec<Order>, OrderError>;

    async fn health_check(&self) -> Result<(), OrderError>;
}
