//! Order records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{Amount, OpId, OrderId, UserId};

/// Persisted order status
///
/// IDs are stored as SMALLINT. `PENDING` is the only non-terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum OrderStatus {
    /// Recorded, debit not yet confirmed
    Pending = 0,
    /// Exactly one debit of `price` completed
    Success = 1,
    /// No debit was taken (or it was fenced)
    Failed = -1,
}

impl OrderStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::Success),
            -1 => Some(OrderStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Success => "SUCCESS",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchase, as stored in the Order Store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    #[serde(rename = "id")]
    #[schema(value_type = String, format = Uuid)]
    pub order_id: OrderId,
    #[serde(rename = "userid")]
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// Copy of the account tag at creation time
    #[serde(rename = "account")]
    pub account_tag: String,
    pub product_name: String,
    #[schema(example = 300)]
    pub price: Amount,
    #[serde(rename = "order_status")]
    pub status: OrderStatus,
    /// Why the order failed, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Reconciler attempts on a stuck PENDING order
    #[serde(default)]
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Fresh PENDING order with a new id
    pub fn pending(
        user_id: UserId,
        account_tag: impl Into<String>,
        product_name: impl Into<String>,
        price: Amount,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id: OrderId::new(),
            user_id,
            account_tag: account_tag.into(),
            product_name: product_name.into(),
            price,
            status: OrderStatus::Pending,
            error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Idempotency key for this order's debit
    #[inline]
    pub fn op_id(&self) -> OpId {
        OpId::from(self.order_id)
    }
}

/// Validated purchase request handed to the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub product_name: String,
    pub price: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ids() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Success,
            OrderStatus::Failed,
        ] {
            assert_eq!(OrderStatus::from_id(status.id()), Some(status));
        }
        assert!(OrderStatus::from_id(7).is_none());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Success.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }

    #[test]
    fn test_order_wire_names() {
        let order = Order::pending(UserId::from("u1"), "acc1", "book", 300);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["id"], order.order_id.to_string());
        assert_eq!(json["userid"], "u1");
        assert_eq!(json["account"], "acc1");
        assert_eq!(json["order_status"], "PENDING");
        assert_eq!(json["price"], 300);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_op_id_is_order_id() {
        let order = Order::pending(UserId::from("u1"), "acc1", "book", 300);
        assert_eq!(order.op_id().as_str(), order.order_id.to_string());
    }
}
