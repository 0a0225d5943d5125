//! Order materialization port.
//!
//! The pipeline's only contract with order management: given a matched
//! pending payment, create exactly one order with the same total and
//! stamp its id/number plus the Completed status back onto the pending
//! payment **in one atomic step**. If any part fails, the row must
//! remain Pending so a retried confirmation can safely re-attempt.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, OrderNumber};
use crate::domain::payment::PendingPayment;

/// Reference to the order created by a successful materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
}

/// Result of an attempted materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Order created and the pending payment stamped Completed.
    Materialized(OrderReceipt),

    /// The row was no longer Pending; nothing was created. Carries the
    /// current row so the caller can classify the race winner.
    StateConflict(PendingPayment),
}

/// Port for atomic order creation.
#[async_trait]
pub trait OrderMaterializer: Send + Sync {
    /// Creates the order and completes the pending payment, conditional
    /// on the stored row still being Pending.
    ///
    /// Implementations must make the order insert and the completion
    /// stamp a single atomic unit (one SQL transaction, one lock
    /// critical section) keyed on the row's `provider_intent_id`.
    async fn materialize(
        &self,
        payment: &PendingPayment,
    ) -> Result<MaterializeOutcome, DomainError>;
}
