//! ReconcilePaymentHandler - turns verified provider confirmations into orders.
//!
//! The correctness-critical piece of the pipeline. Every confirmation
//! for the same provider intent observes one linearizable sequence of
//! status transitions because the only commit point is the store's
//! conditional update: duplicate deliveries, webhook-vs-adjustment
//! races, and late confirmations all resolve through it.

use std::sync::Arc;

use crate::domain::foundation::{OrderId, OrderNumber, Timestamp};
use crate::domain::payment::{PaymentFlowError, PaymentStatus, PendingPayment};
use crate::ports::{
    ConditionalUpdate, MaterializeOutcome, OrderMaterializer, PaymentConfirmation,
    PendingPaymentRepository,
};

/// Result of reconciling one confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This confirmation materialized the order.
    OrderCreated {
        order_id: OrderId,
        order_number: OrderNumber,
    },

    /// A previous delivery already materialized it; same references.
    AlreadyCompleted {
        order_id: OrderId,
        order_number: OrderNumber,
    },
}

impl ReconcileOutcome {
    /// The order reference, regardless of which delivery created it.
    pub fn order_id(&self) -> OrderId {
        match self {
            ReconcileOutcome::OrderCreated { order_id, .. }
            | ReconcileOutcome::AlreadyCompleted { order_id, .. } => *order_id,
        }
    }

    /// The order number, regardless of which delivery created it.
    pub fn order_number(&self) -> OrderNumber {
        match self {
            ReconcileOutcome::OrderCreated { order_number, .. }
            | ReconcileOutcome::AlreadyCompleted { order_number, .. } => *order_number,
        }
    }
}

/// Handler for provider confirmations.
pub struct ReconcilePaymentHandler {
    repository: Arc<dyn PendingPaymentRepository>,
    materializer: Arc<dyn OrderMaterializer>,
}

impl ReconcilePaymentHandler {
    pub fn new(
        repository: Arc<dyn PendingPaymentRepository>,
        materializer: Arc<dyn OrderMaterializer>,
    ) -> Self {
        Self {
            repository,
            materializer,
        }
    }

    pub async fn handle(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<ReconcileOutcome, PaymentFlowError> {
        // 1. Look up by the provider's intent reference
        let payment = self
            .repository
            .find_by_intent(&confirmation.provider_intent_id)
            .await?
            .ok_or_else(|| {
                PaymentFlowError::unknown_intent(&confirmation.provider_intent_id)
            })?;

        match payment.status {
            // 2. Duplicate delivery: answer with the existing order
            PaymentStatus::Completed => Self::existing_order(&payment),

            // 3. Late confirmation for a dead reservation
            PaymentStatus::Expired | PaymentStatus::Failed => {
                Err(PaymentFlowError::stale_confirmation(
                    &confirmation.provider_intent_id,
                    payment.status.as_str(),
                ))
            }

            PaymentStatus::Pending => {
                self.reconcile_pending(payment, confirmation).await
            }
        }
    }

    async fn reconcile_pending(
        &self,
        payment: PendingPayment,
        confirmation: PaymentConfirmation,
    ) -> Result<ReconcileOutcome, PaymentFlowError> {
        // A lapsed reservation is honored even though its row still says
        // Pending: stamp it and reject, so money that moved late never
        // silently resurrects the checkout.
        if payment.is_expired(Timestamp::now()) {
            return match self.repository.mark_expired_if_pending(&payment.id).await? {
                ConditionalUpdate::Applied(_) => Err(PaymentFlowError::stale_confirmation(
                    &confirmation.provider_intent_id,
                    PaymentStatus::Expired.as_str(),
                )),
                ConditionalUpdate::Conflict(current) => match current.status {
                    // A racing delivery beat us to completion; it was in
                    // flight before expiry was observed, so answer like a
                    // duplicate.
                    PaymentStatus::Completed => Self::existing_order(&current),
                    _ => Err(PaymentFlowError::stale_confirmation(
                        &confirmation.provider_intent_id,
                        current.status.as_str(),
                    )),
                },
            };
        }

        // 4. The reported money must be exactly the ledger's money
        if confirmation.amount_minor != payment.amount.minor_units()
            || !payment.currency.matches_code(&confirmation.currency)
        {
            return Err(PaymentFlowError::AmountMismatch {
                provider_intent_id: confirmation.provider_intent_id,
                ledger_minor: payment.amount.minor_units(),
                reported_minor: confirmation.amount_minor,
                ledger_currency: payment.currency.as_str().to_string(),
                reported_currency: confirmation.currency,
            });
        }

        // 5. Create the order and stamp completion as one atomic unit
        match self.materializer.materialize(&payment).await? {
            MaterializeOutcome::Materialized(receipt) => {
                tracing::info!(
                    pending_payment_id = %payment.id,
                    provider_intent_id = %payment.provider_intent_id,
                    order_id = %receipt.order_id,
                    order_number = %receipt.order_number,
                    "Order materialized from confirmed payment"
                );
                Ok(ReconcileOutcome::OrderCreated {
                    order_id: receipt.order_id,
                    order_number: receipt.order_number,
                })
            }
            MaterializeOutcome::StateConflict(current) => match current.status {
                PaymentStatus::Completed => Self::existing_order(&current),
                _ => Err(PaymentFlowError::stale_confirmation(
                    &current.provider_intent_id,
                    current.status.as_str(),
                )),
            },
        }
    }

    /// Answers a duplicate delivery with the already-materialized order.
    fn existing_order(payment: &PendingPayment) -> Result<ReconcileOutcome, PaymentFlowError> {
        match (payment.order_id, payment.order_number) {
            (Some(order_id), Some(order_number)) => Ok(ReconcileOutcome::AlreadyCompleted {
                order_id,
                order_number,
            }),
            _ => Err(PaymentFlowError::infrastructure(format!(
                "Completed payment {} is missing its order reference",
                payment.id
            ))),
        }
    }
}
