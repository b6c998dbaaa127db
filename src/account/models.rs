//! Data models for user accounts and balance operations

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{Amount, UserId};

/// One user's purchasing capacity.
///
/// Serialized with the field names existing clients already consume:
/// `userid`, `username`, `account` and `Amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// Server-assigned identity
    #[serde(rename = "userid")]
    #[schema(value_type = String, example = "6f1c2a4e-8d7b-4f0e-9a51-3c2d1e0f9b7a")]
    pub user_id: UserId,
    #[serde(rename = "username")]
    #[schema(example = "alice")]
    pub display_name: String,
    /// Opaque account reference, copied onto every order
    #[serde(rename = "account")]
    #[schema(example = "acc1")]
    pub account_tag: String,
    /// Balance in minor units, never negative once persisted
    #[serde(rename = "Amount", alias = "amount", default)]
    #[schema(example = 500)]
    pub balance: Amount,
}

impl Account {
    /// New account with a fresh id and zero balance
    pub fn register(display_name: impl Into<String>, account_tag: impl Into<String>) -> Self {
        Self {
            user_id: UserId::generate(),
            display_name: display_name.into(),
            account_tag: account_tag.into(),
            balance: 0,
        }
    }
}

/// Outcome recorded for an idempotency-keyed balance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum OpStatus {
    /// The adjustment was written together with this record
    Applied = 1,
    /// The op id was fenced; any later adjustment carrying it is refused
    Voided = -1,
}

impl OpStatus {
    /// Numeric ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(OpStatus::Applied),
            -1 => Some(OpStatus::Voided),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpStatus::Applied => "APPLIED",
            OpStatus::Voided => "VOIDED",
        }
    }
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a guarded balance write at the store boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// Balance matched the expected value and was replaced
    Updated(Account),
    /// Balance changed since the caller read it
    Conflict { current: Amount },
    NotFound,
    /// The op id was applied earlier; nothing was written this time
    AlreadyApplied(Account),
    /// The op id was voided; nothing was written
    Voided,
}
