//! Core types used throughout the system
//!
//! Identifiers are newtypes so a user id can never be passed where an order
//! id is expected. Money is carried as integer minor units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Money amount in currency minor units.
///
/// Signed so that the same type carries both balances (never negative once
/// persisted) and adjustment deltas (negative for a debit).
pub type Amount = i64;

/// User ID - server-assigned, immutable after registration.
///
/// Kept as an opaque string: the Users service generates uuid v4 values, but
/// ids arrive in URL paths and JSON bodies and are only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a fresh user id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order ID - uuid v4, generated when the order record is first written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(uuid::Uuid);

impl OrderId {
    /// Generate a new unique OrderId
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn inner(&self) -> uuid::Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for OrderId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

/// Idempotency key for a balance adjustment.
///
/// The order workflow uses the order id, so a debit can be replayed after an
/// unknown outcome without being applied twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<OrderId> for OpId {
    fn from(id: OrderId) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OpId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OpId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_parse_display() {
        let id = OrderId::new();
        let parsed: OrderId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_op_id_from_order_id() {
        let id = OrderId::new();
        let op: OpId = id.into();
        assert_eq!(op.as_str(), id.to_string());
    }

    #[test]
    fn test_user_id_empty() {
        assert!(UserId::from("  ").is_empty());
        assert!(!UserId::generate().is_empty());
    }

    #[test]
    fn test_ids_serialize_transparent() {
        let user = UserId::from("u-1");
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"u-1\"");
    }
}
