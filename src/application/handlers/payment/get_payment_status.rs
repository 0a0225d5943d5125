//! GetPaymentStatusHandler - Query handler for client polling.
//!
//! Purely observational: the poll never writes. Expiry is reported
//! lazily from `expires_at` because a concurrent reconciliation might
//! still be mid-flight; only the reconciler or the sweep writes
//! terminal states.

use std::str::FromStr;
use std::sync::Arc;

use crate::domain::foundation::{OrderId, OrderNumber, PendingPaymentId, Timestamp};
use crate::domain::payment::PaymentFlowError;
use crate::ports::PendingPaymentRepository;

/// Query for the current reconciliation state of a checkout.
#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    /// Raw id as received from the client; format-validated before any
    /// store access.
    pub pending_payment_id: String,
}

/// What the client learns from a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatusView {
    Completed {
        order_id: OrderId,
        order_number: OrderNumber,
    },
    Expired,
    Pending,
}

/// Handler for status polls.
pub struct GetPaymentStatusHandler {
    repository: Arc<dyn PendingPaymentRepository>,
}

impl GetPaymentStatusHandler {
    pub fn new(repository: Arc<dyn PendingPaymentRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: GetPaymentStatusQuery,
    ) -> Result<PaymentStatusView, PaymentFlowError> {
        let id = PendingPaymentId::from_str(&query.pending_payment_id)
            .map_err(|_| PaymentFlowError::malformed_id(&query.pending_payment_id))?;

        let payment = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| PaymentFlowError::not_found(id))?;

        // An order reference outranks everything else; the row can only
        // carry one when it is Completed.
        if let (Some(order_id), Some(order_number)) = (payment.order_id, payment.order_number) {
            return Ok(PaymentStatusView::Completed {
                order_id,
                order_number,
            });
        }

        if payment.is_expired(Timestamp::now()) {
            return Ok(PaymentStatusView::Expired);
        }

        Ok(PaymentStatusView::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::domain::foundation::{Amount, Currency, RestaurantId};
    use crate::domain::payment::{
        Destination, PaymentProvider, PaymentStatus, PendingPayment, RoutingDecision,
    };
    use crate::ports::OrderMaterializer;

    fn pending() -> PendingPayment {
        PendingPayment::open(
            RestaurantId::new(),
            format!("pi_{}", uuid::Uuid::new_v4()),
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

    #[tokio::test]
    async fn malformed_id_fails_before_any_lookup() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let handler = GetPaymentStatusHandler::new(store);

        let result = handler
            .handle(GetPaymentStatusQuery {
                pending_payment_id: "not-a-uuid".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(PaymentFlowError::MalformedId(ref raw)) if raw == "not-a-uuid"
        ));
    }

    #[tokio::test]
    async fn unknown_id_reports_not_found() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let handler = GetPaymentStatusHandler::new(store);

        let result = handler
            .handle(GetPaymentStatusQuery {
                pending_payment_id: PendingPaymentId::new().to_string(),
            })
            .await;

        assert!(matches!(result, Err(PaymentFlowError::NotFound(_))));
    }

    #[tokio::test]
    async fn live_pending_payment_reports_pending() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let payment = pending();
        store.insert(&payment).await.unwrap();
        let handler = GetPaymentStatusHandler::new(store);

        let view = handler
            .handle(GetPaymentStatusQuery {
                pending_payment_id: payment.id.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(view, PaymentStatusView::Pending);
    }

    #[tokio::test]
    async fn completed_payment_reports_order_reference() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let payment = pending();
        store.insert(&payment).await.unwrap();
        store.materialize(&payment).await.unwrap();
        let handler = GetPaymentStatusHandler::new(store.clone());

        let view = handler
            .handle(GetPaymentStatusQuery {
                pending_payment_id: payment.id.to_string(),
            })
            .await
            .unwrap();

        let stored = store.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(
            view,
            PaymentStatusView::Completed {
                order_id: stored.order_id.unwrap(),
                order_number: stored.order_number.unwrap(),
            }
        );
    }

    #[tokio::test]
    async fn lapsed_payment_reports_expired_without_writing() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let mut payment = pending();
        payment.expires_at = Timestamp::now().plus_minutes(-1);
        store.insert(&payment).await.unwrap();
        let handler = GetPaymentStatusHandler::new(store.clone());

        let view = handler
            .handle(GetPaymentStatusQuery {
                pending_payment_id: payment.id.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(view, PaymentStatusView::Expired);

        // The lazy transition never touched the row.
        let stored = store.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn repeated_polls_are_idempotent() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let payment = pending();
        store.insert(&payment).await.unwrap();
        store.materialize(&payment).await.unwrap();
        let handler = GetPaymentStatusHandler::new(store);

        let first = handler
            .handle(GetPaymentStatusQuery {
                pending_payment_id: payment.id.to_string(),
            })
            .await
            .unwrap();
        let second = handler
            .handle(GetPaymentStatusQuery {
                pending_payment_id: payment.id.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(first, second);
    }
}
