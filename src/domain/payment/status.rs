//! Pending payment status state machine.
//!
//! A checkout attempt starts Pending and moves to exactly one terminal
//! state. Terminal states have no outgoing transitions, which is what
//! makes reconciliation idempotent and late confirmations rejectable.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting provider confirmation. The only mutable state.
    Pending,

    /// Confirmed by the provider; exactly one order exists.
    Completed,

    /// Reservation lapsed before confirmation arrived.
    Expired,

    /// Provider reported a definitive failure.
    Failed,
}

impl PaymentStatus {
    /// Storage/display form used by adapters and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Completed) | (Pending, Expired) | (Pending, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Completed, Expired, Failed],
            Completed => vec![],
            Expired => vec![],
            Failed => vec![],
        }
    }
}
