//! AdjustAmountHandler - Command handler for pre-confirmation amount changes.
//!
//! The single most safety-critical check in the pipeline lives here: an
//! already-completed or expired payment's amount must never change,
//! because a provider-side charge may already be authorized for the old
//! amount. The fast status check rejects the obvious cases; the store's
//! conditional update decides races.

use std::sync::Arc;

use crate::domain::foundation::{Amount, PendingPaymentId};
use crate::domain::payment::{PaymentFlowError, PaymentStatus, PendingPayment};
use crate::ports::{ConditionalUpdate, GatewayRegistry, PendingPaymentRepository};

/// Command to change the intended charge amount.
#[derive(Debug, Clone)]
pub struct AdjustAmountCommand {
    pub pending_payment_id: PendingPaymentId,
    pub amount_minor: i64,
}

/// Handler for amount adjustments.
pub struct AdjustAmountHandler {
    repository: Arc<dyn PendingPaymentRepository>,
    gateways: GatewayRegistry,
}

impl AdjustAmountHandler {
    pub fn new(repository: Arc<dyn PendingPaymentRepository>, gateways: GatewayRegistry) -> Self {
        Self {
            repository,
            gateways,
        }
    }

    pub async fn handle(
        &self,
        cmd: AdjustAmountCommand,
    ) -> Result<PendingPayment, PaymentFlowError> {
        let amount = Amount::new(cmd.amount_minor)
            .map_err(|_| PaymentFlowError::invalid_amount(cmd.amount_minor))?;

        let payment = self
            .repository
            .find_by_id(&cmd.pending_payment_id)
            .await?
            .ok_or_else(|| PaymentFlowError::not_found(cmd.pending_payment_id))?;

        if payment.status != PaymentStatus::Pending {
            return Err(PaymentFlowError::invalid_state(
                payment.status.as_str(),
                "adjust the amount of",
            ));
        }

        // Push the new amount to the provider first, against the
        // destination frozen at creation - never the opposite account.
        let gateway = self.gateways.for_provider(payment.routing.provider);
        gateway
            .update_intent_amount(
                &payment.provider_intent_id,
                &payment.routing.destination,
                amount,
                payment.currency,
            )
            .await?;

        // Commit through the conditional update. A confirmation that
        // landed between the read and here wins the row; the adjustment
        // is then rejected rather than silently lost.
        match self
            .repository
            .update_amount_if_pending(&payment.id, amount)
            .await?
        {
            ConditionalUpdate::Applied(updated) => {
                tracing::info!(
                    pending_payment_id = %updated.id,
                    amount_minor = updated.amount.minor_units(),
                    "Charge amount adjusted"
                );
                Ok(updated)
            }
            ConditionalUpdate::Conflict(current) => Err(PaymentFlowError::invalid_state(
                current.status.as_str(),
                "adjust the amount of",
            )),
        }
    }
}
