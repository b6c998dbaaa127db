//! Order Workflow FSM States
//!
//! In-flight states of one order request. Only the persisted
//! [`OrderStatus`](super::models::OrderStatus) survives the request; these
//! states drive logging and guard the order of steps.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// Request accepted for processing, not yet validated
    Received,
    /// Current balance fetched from the Users service
    BalanceChecked,
    /// Admission passed
    Admitted,
    /// Terminal: admission refused, nothing was written
    Rejected,
    /// PENDING order record written
    OrderPersisted,
    /// Debit confirmed by the Users service
    Debited,
    /// Terminal: order flipped to SUCCESS
    Complete,
    /// Terminal: workflow stopped with an error
    Failed,
}

impl WorkflowState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Rejected | WorkflowState::Complete | WorkflowState::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Received => "RECEIVED",
            WorkflowState::BalanceChecked => "BALANCE_CHECKED",
            WorkflowState::Admitted => "ADMITTED",
            WorkflowState::Rejected => "REJECTED",
            WorkflowState::OrderPersisted => "ORDER_PERSISTED",
            WorkflowState::Debited => "DEBITED",
            WorkflowState::Complete => "COMPLETE",
            WorkflowState::Failed => "FAILED",
        }
    }

    /// Whether `self -> next` is a legal step
    ///
    /// Any non-terminal state may fail. A conflicting debit sends the
    /// workflow from `OrderPersisted` back to `BalanceChecked`.
    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Received, BalanceChecked)
                | (BalanceChecked, Admitted)
                | (BalanceChecked, Rejected)
                | (Admitted, OrderPersisted)
                | (OrderPersisted, Debited)
                | (OrderPersisted, BalanceChecked)
                | (Debited, Complete)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(WorkflowState::Rejected.is_terminal());
        assert!(WorkflowState::Complete.is_terminal());
        assert!(WorkflowState::Failed.is_terminal());

        assert!(!WorkflowState::Received.is_terminal());
        assert!(!WorkflowState::OrderPersisted.is_terminal());
        assert!(!WorkflowState::Debited.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            WorkflowState::Received,
            WorkflowState::BalanceChecked,
            WorkflowState::Admitted,
            WorkflowState::OrderPersisted,
            WorkflowState::Debited,
            WorkflowState::Complete,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_illegal_transitions() {
        // Rejection must happen before anything is persisted
        assert!(!WorkflowState::OrderPersisted.can_transition_to(WorkflowState::Rejected));
        assert!(!WorkflowState::Received.can_transition_to(WorkflowState::OrderPersisted));
        assert!(!WorkflowState::Complete.can_transition_to(WorkflowState::Failed));
        assert!(!WorkflowState::Rejected.can_transition_to(WorkflowState::Admitted));
    }

    #[test]
    fn test_every_live_state_can_fail() {
        for state in [
            WorkflowState::Received,
            WorkflowState::BalanceChecked,
            WorkflowState::Admitted,
            WorkflowState::OrderPersisted,
            WorkflowState::Debited,
        ] {
            assert!(state.can_transition_to(WorkflowState::Failed));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkflowState::BalanceChecked.to_string(), "BALANCE_CHECKED");
        assert_eq!(WorkflowState::OrderPersisted.to_string(), "ORDER_PERSISTED");
    }
}
