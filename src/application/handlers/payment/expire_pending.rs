//! ExpirePendingPaymentsHandler - the explicit expiry sweep.
//!
//! Status polls report expiry lazily and never write; this sweep is the
//! writer that eventually stamps lapsed reservations Expired. It runs
//! through the same conditional-update primitive as every other writer,
//! so a confirmation racing the sweep resolves cleanly: whoever commits
//! first wins the row.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::PaymentFlowError;
use crate::ports::{ConditionalUpdate, PendingPaymentRepository};

/// Sweeps lapsed pending payments into the Expired state.
pub struct ExpirePendingPaymentsHandler {
    repository: Arc<dyn PendingPaymentRepository>,
    batch_size: u32,
}

impl ExpirePendingPaymentsHandler {
    pub fn new(repository: Arc<dyn PendingPaymentRepository>, batch_size: u32) -> Self {
        Self {
            repository,
            batch_size,
        }
    }

    /// Runs one sweep pass. Returns how many rows were stamped.
    pub async fn handle(&self) -> Result<u64, PaymentFlowError> {
        let now = Timestamp::now();
        let lapsed = self
            .repository
            .list_expired_pending(now, self.batch_size)
            .await?;

        let mut swept = 0u64;
        for payment in lapsed {
            match self.repository.mark_expired_if_pending(&payment.id).await? {
                ConditionalUpdate::Applied(_) => swept += 1,
                // A confirmation won the row between the list and the
                // stamp; leave it to the reconciler's outcome.
                ConditionalUpdate::Conflict(_) => {}
            }
        }

        if swept > 0 {
            tracing::info!(swept, "Expired lapsed pending payments");
        }

        Ok(swept)
    }
}
