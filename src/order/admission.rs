//! Admission Controller
//!
//! Pure accept/reject decision on requested price against current balance.

use crate::core_types::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    /// `shortfall` is always positive
    Reject { shortfall: Amount },
}

impl Decision {
    #[inline]
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Accept iff `current_balance >= requested_price`.
///
/// `requested_price` must already be validated positive.
#[inline]
pub fn decide(requested_price: Amount, current_balance: Amount) -> Decision {
    if current_balance >= requested_price {
        Decision::Accept
    } else {
        Decision::Reject {
            shortfall: requested_price - current_balance,
        }
    }
}

/// Substitutable admission policy
pub trait AdmissionPolicy: Send + Sync {
    fn decide(&self, requested_price: Amount, current_balance: Amount) -> Decision;
}

/// Plain sufficient-funds check
#[derive(Debug, Clone, Copy, Default)]
pub struct SufficientFunds;

impl AdmissionPolicy for SufficientFunds {
    fn decide(&self, requested_price: Amount, current_balance: Amount) -> Decision {
        decide(requested_price, current_balance)
    }
}
