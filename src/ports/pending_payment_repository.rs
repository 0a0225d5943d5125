//! Pending payment storage port.
//!
//! The pending payment row is the only mutable shared resource in the
//! pipeline, so every mutation after insert goes through a conditional
//! update predicated on `status = Pending`. Implementations must apply
//! the predicate and the write as one atomic step (an SQL conditional
//! UPDATE, or a write-lock critical section in memory); that single
//! primitive is what serializes "user adjusts amount" against "webhook
//! confirms" without keyed locks.

use async_trait::async_trait;

use crate::domain::foundation::{Amount, DomainError, PendingPaymentId, Timestamp};
use crate::domain::payment::PendingPayment;

/// Result of a conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalUpdate {
    /// The predicate held and the write was applied; carries the new row.
    Applied(PendingPayment),

    /// The row was no longer Pending; carries the current row so the
    /// caller can classify what won the race.
    Conflict(PendingPayment),
}

/// Port for pending payment persistence.
#[async_trait]
pub trait PendingPaymentRepository: Send + Sync {
    /// Inserts a freshly opened pending payment.
    ///
    /// `provider_intent_id` is unique across all rows; a duplicate is an
    /// infrastructure error, not a business outcome.
    async fn insert(&self, payment: &PendingPayment) -> Result<(), DomainError>;

    /// Looks up a pending payment by its own id.
    async fn find_by_id(
        &self,
        id: &PendingPaymentId,
    ) -> Result<Option<PendingPayment>, DomainError>;

    /// Looks up a pending payment by the provider's intent reference.
    async fn find_by_intent(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<PendingPayment>, DomainError>;

    /// Sets a new amount iff the row is still Pending.
    async fn update_amount_if_pending(
        &self,
        id: &PendingPaymentId,
        amount: Amount,
    ) -> Result<ConditionalUpdate, DomainError>;

    /// Stamps the row Expired iff it is still Pending.
    async fn mark_expired_if_pending(
        &self,
        id: &PendingPaymentId,
    ) -> Result<ConditionalUpdate, DomainError>;

    /// Lists rows that are still Pending but whose reservation window has
    /// passed, for the expiry sweep. Bounded by `limit`.
    async fn list_expired_pending(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<PendingPayment>, DomainError>;
}
