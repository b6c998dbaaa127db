//! In-memory Order Store

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::error::OrderError;
use super::models::{Order, OrderStatus};
use super::store::OrderStore;
use crate::core_types::OrderId;

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<OrderId, Order>,
    writes: AtomicU64,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Successful writes so far (inserts, flips, retry bumps)
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Orders currently in `status`
    pub fn count_status(&self, status: OrderStatus) -> usize {
        self.orders.iter().filter(|o| o.status == status).count()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<Order> {
        self.orders.iter().map(|o| o.clone()).collect()
    }

    /// Backdate an order so the reconciler treats it as stale
    #[cfg(test)]
    pub fn backdate(&self, order_id: OrderId, by: Duration) {
        if let Some(mut order) = self.orders.get_mut(&order_id) {
            let by = chrono::Duration::from_std(by).unwrap_or_default();
            order.updated_at -= by;
            order.created_at -= by;
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, order: &Order) -> Result<(), OrderError> {
        match self.orders.entry(order.order_id) {
            Entry::Occupied(_) => Err(OrderError::DuplicateId(order.order_id)),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                self.writes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.orders.get(&order_id).map(|o| o.clone()))
    }

    async fn update_status_if(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        error: Option<&str>,
    ) -> Result<bool, OrderError> {
        let Some(mut order) = self.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        order.error = error.map(str::to_string);
        order.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    async fn increment_retry(&self, order_id: OrderId) -> Result<(), OrderError> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::NotFound(order_id))?;
        order.retry_count += 1;
        order.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn find_stale_pending(
        &self,
        older_than: Duration,
        limit: usize,
    ) -> Result<Vec<Order>, OrderError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or_default();
        let mut stale: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending && o.updated_at <= cutoff)
            .map(|o| o.clone())
            .collect();
        stale.sort_by_key(|o| o.updated_at);
        stale.truncate(limit);
        Ok(stale)
    }

    async fn health_check(&self) -> Result<(), OrderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::UserId;

    fn order() -> Order {
        Order::pending(UserId::from("u1"), "acc1", "book", 300)
    }

    #[tokio::test]
    async fn test_insert_duplicate() {
        let store = InMemoryOrderStore::new();
        let o = order();
        store.insert(&o).await.unwrap();
        assert_eq!(
            store.insert(&o).await,
            Err(OrderError::DuplicateId(o.order_id))
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_status_flip_is_cas() {
        let store = InMemoryOrderStore::new();
        let o = order();
        store.insert(&o).await.unwrap();

        assert!(
            store
                .update_status_if(o.order_id, OrderStatus::Pending, OrderStatus::Success, None)
                .await
                .unwrap()
        );
        // Second flip from PENDING loses
        assert!(
            !store
                .update_status_if(
                    o.order_id,
                    OrderStatus::Pending,
                    OrderStatus::Failed,
                    Some("late")
                )
                .await
                .unwrap()
        );
        let stored = store.get(o.order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Success);
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn test_flip_unknown_order() {
        let store = InMemoryOrderStore::new();
        assert!(
            !store
                .update_status_if(
                    OrderId::new(),
                    OrderStatus::Pending,
                    OrderStatus::Failed,
                    None
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_find_stale_pending() {
        let store = InMemoryOrderStore::new();
        let old = order();
        let older = order();
        let fresh = order();
        let done = order();
        for o in [&old, &older, &fresh, &done] {
            store.insert(o).await.unwrap();
        }
        store
            .update_status_if(done.order_id, OrderStatus::Pending, OrderStatus::Success, None)
            .await
            .unwrap();
        store.backdate(old.order_id, Duration::from_secs(120));
        store.backdate(older.order_id, Duration::from_secs(300));
        store.backdate(done.order_id, Duration::from_secs(300));

        let stale = store
            .find_stale_pending(Duration::from_secs(60), 10)
            .await
            .unwrap();
        let ids: Vec<_> = stale.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![older.order_id, old.order_id]);

        let limited = store
            .find_stale_pending(Duration::from_secs(60), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_increment_retry() {
        let store = InMemoryOrderStore::new();
        let o = order();
        store.insert(&o).await.unwrap();
        store.increment_retry(o.order_id).await.unwrap();
        store.increment_retry(o.order_id).await.unwrap();
        assert_eq!(store.get(o.order_id).await.unwrap().unwrap().retry_count, 2);
        assert!(store.increment_retry(OrderId::new()).await.is_err());
    }
}
