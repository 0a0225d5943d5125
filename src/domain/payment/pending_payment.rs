//! PendingPayment aggregate.
//!
//! One entry per checkout attempt: the durable record of an in-flight
//! payment intent, its amount, where it settles, and how long the
//! reservation holds. The aggregate enforces the invariants; the store
//! enforces them under concurrency with conditional updates.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Amount, Currency, OrderId, OrderNumber, PendingPaymentId, RestaurantId, StateMachine,
    Timestamp,
};

use super::errors::PaymentFlowError;
use super::routing::RoutingDecision;
use super::status::PaymentStatus;

/// Durable record of an in-flight checkout attempt.
///
/// Invariants:
/// - `order_id`/`order_number` are set together, exactly once, and only
///   when `status` is Completed.
/// - `amount` is mutable only while `status` is Pending.
/// - `routing` is frozen at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub id: PendingPaymentId,
    pub restaurant_id: RestaurantId,

    /// The provider's own intent reference; globally unique and the
    /// idempotency key for reconciliation.
    pub provider_intent_id: String,

    pub amount: Amount,
    pub currency: Currency,
    pub routing: RoutingDecision,
    pub status: PaymentStatus,
    pub expires_at: Timestamp,
    pub order_id: Option<OrderId>,
    pub order_number: Option<OrderNumber>,
    pub created_at: Timestamp,
}

impl PendingPayment {
    /// Opens a new pending payment with the given reservation window.
    pub fn open(
        restaurant_id: RestaurantId,
        provider_intent_id: String,
        amount: Amount,
        currency: Currency,
        routing: RoutingDecision,
        ttl_minutes: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PendingPaymentId::new(),
            restaurant_id,
            provider_intent_id,
            amount,
            currency,
            routing,
            status: PaymentStatus::Pending,
            expires_at: now.plus_minutes(ttl_minutes),
            order_id: None,
            order_number: None,
            created_at: now,
        }
    }

    /// True once the reservation window has passed.
    ///
    /// Purely observational: callers that need the terminal state written
    /// must go through a conditional update on the store.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_before(&now)
    }

    /// Changes the intended charge amount. Pending only.
    pub fn adjust_amount(&mut self, new_amount: Amount) -> Result<(), PaymentFlowError> {
        if self.status != PaymentStatus::Pending {
            return Err(PaymentFlowError::invalid_state(
                self.status.as_str(),
                "adjust the amount of",
            ));
        }
        self.amount = new_amount;
        Ok(())
    }

    /// Marks the payment completed and stamps the order reference.
    ///
    /// The order reference is written in the same step as the status so
    /// `order_id.is_some()` and `status == Completed` can never diverge.
    pub fn complete(
        &mut self,
        order_id: OrderId,
        order_number: OrderNumber,
    ) -> Result<(), PaymentFlowError> {
        self.status = self
            .status
            .transition_to(PaymentStatus::Completed)
            .map_err(|_| {
                PaymentFlowError::invalid_state(self.status.as_str(), "complete")
            })?;
        self.order_id = Some(order_id);
        self.order_number = Some(order_number);
        Ok(())
    }

    /// Marks the reservation lapsed.
    pub fn mark_expired(&mut self) -> Result<(), PaymentFlowError> {
        self.status = self
            .status
            .transition_to(PaymentStatus::Expired)
            .map_err(|_| PaymentFlowError::invalid_state(self.status.as_str(), "expire"))?;
        Ok(())
    }

    /// Marks the payment definitively failed.
    pub fn mark_failed(&mut self) -> Result<(), PaymentFlowError> {
        self.status = self
            .status
            .transition_to(PaymentStatus::Failed)
            .map_err(|_| PaymentFlowError::invalid_state(self.status.as_str(), "fail"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::routing::{Destination, PaymentProvider};

    fn test_payment() -> PendingPayment {
        PendingPayment::open(
            RestaurantId::new(),
            "pi_test_1".to_string(),
            Amount::new(2500).unwrap(),
            Currency::Eur,
            RoutingDecision {
                provider: PaymentProvider::Stripe,
                destination: Destination::Platform,
            },
            30,
            Timestamp::now(),
        )
    }

    #[test]
    fn open_starts_pending_with_future_expiry() {
        let payment = test_payment();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.order_id.is_none());
        assert!(payment.order_number.is_none());
        assert!(!payment.is_expired(Timestamp::now()));
    }

    #[test]
    fn adjust_amount_succeeds_while_pending() {
        let mut payment = test_payment();
        payment.adjust_amount(Amount::new(3000).unwrap()).unwrap();
        assert_eq!(payment.amount.minor_units(), 3000);
    }

    #[test]
    fn adjust_amount_fails_after_completion_and_leaves_amount_untouched() {
        let mut payment = test_payment();
        payment
            .complete(OrderId::new(), OrderNumber::new(7).unwrap())
            .unwrap();

        let result = payment.adjust_amount(Amount::new(9999).unwrap());
        assert!(matches!(
            result,
            Err(PaymentFlowError::InvalidState { ref current, .. }) if current == "completed"
        ));
        assert_eq!(payment.amount.minor_units(), 2500);
    }

    #[test]
    fn adjust_amount_fails_after_expiry_state() {
        let mut payment = test_payment();
        payment.mark_expired().unwrap();

        let result = payment.adjust_amount(Amount::new(100).unwrap());
        assert!(matches!(result, Err(PaymentFlowError::InvalidState { .. })));
        assert_eq!(payment.amount.minor_units(), 2500);
    }

    #[test]
    fn complete_stamps_order_reference_with_status() {
        let mut payment = test_payment();
        let order_id = OrderId::new();
        let order_number = OrderNumber::new(12).unwrap();

        payment.complete(order_id, order_number).unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.order_id, Some(order_id));
        assert_eq!(payment.order_number, Some(order_number));
    }

    #[test]
    fn complete_is_rejected_from_terminal_states() {
        let mut payment = test_payment();
        payment.mark_expired().unwrap();

        let result = payment.complete(OrderId::new(), OrderNumber::new(1).unwrap());
        assert!(matches!(result, Err(PaymentFlowError::InvalidState { .. })));
        assert!(payment.order_id.is_none());
    }

    #[test]
    fn mark_expired_is_rejected_once_completed() {
        let mut payment = test_payment();
        payment
            .complete(OrderId::new(), OrderNumber::new(1).unwrap())
            .unwrap();

        assert!(payment.mark_expired().is_err());
        assert_eq!(payment.status, PaymentStatus::Completed);
    }

    #[test]
    fn is_expired_tracks_the_reservation_window() {
        let mut payment = test_payment();
        payment.expires_at = Timestamp::now().plus_minutes(-1);
        assert!(payment.is_expired(Timestamp::now()));
        // Observational only - the status is untouched.
        assert_eq!(payment.status, PaymentStatus::Pending);
    }
}
