//! In-memory pending payment store and order ledger.
//!
//! Implements both `PendingPaymentRepository` and `OrderMaterializer`
//! over one RwLock'd map. Every conditional update runs inside a single
//! write-lock critical section, which gives the same per-intent
//! linearizability the SQL adapter gets from conditional UPDATEs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    Amount, Currency, DomainError, ErrorCode, OrderId, OrderNumber, PendingPaymentId,
    RestaurantId, Timestamp,
};
use crate::domain::payment::{PaymentStatus, PendingPayment};
use crate::ports::{
    ConditionalUpdate, MaterializeOutcome, OrderMaterializer, OrderReceipt,
    PendingPaymentRepository,
};

/// An order created by materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub restaurant_id: RestaurantId,
    pub amount: Amount,
    pub currency: Currency,
}

#[derive(Default)]
struct StoreState {
    payments: HashMap<PendingPaymentId, PendingPayment>,
    intent_index: HashMap<String, PendingPaymentId>,
    orders: Vec<MaterializedOrder>,
}

/// In-memory implementation of the ledger ports.
pub struct InMemoryPaymentStore {
    state: RwLock<StoreState>,
    next_order_number: AtomicI64,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            next_order_number: AtomicI64::new(1),
        }
    }

    /// Number of orders materialized so far. Test observability.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Snapshot of all materialized orders. Test observability.
    pub async fn orders(&self) -> Vec<MaterializedOrder> {
        self.state.read().await.orders.clone()
    }
}

impl Default for InMemoryPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PendingPaymentRepository for InMemoryPaymentStore {
    async fn insert(&self, payment: &PendingPayment) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state
            .intent_index
            .contains_key(&payment.provider_intent_id)
        {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!(
                    "Duplicate provider intent id: {}",
                    payment.provider_intent_id
                ),
            ));
        }
        state
            .intent_index
            .insert(payment.provider_intent_id.clone(), payment.id);
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PendingPaymentId,
    ) -> Result<Option<PendingPayment>, DomainError> {
        Ok(self.state.read().await.payments.get(id).cloned())
    }

    async fn find_by_intent(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<PendingPayment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .intent_index
            .get(provider_intent_id)
            .and_then(|id| state.payments.get(id))
            .cloned())
    }

    async fn update_amount_if_pending(
        &self,
        id: &PendingPaymentId,
        amount: Amount,
    ) -> Result<ConditionalUpdate, DomainError> {
        let mut state = self.state.write().await;
        let payment = state.payments.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::PaymentNotFound, format!("No payment {}", id))
        })?;

        if payment.status != PaymentStatus::Pending {
            return Ok(ConditionalUpdate::Conflict(payment.clone()));
        }
        payment.amount = amount;
        Ok(ConditionalUpdate::Applied(payment.clone()))
    }

    async fn mark_expired_if_pending(
        &self,
        id: &PendingPaymentId,
    ) -> Result<ConditionalUpdate, DomainError> {
        let mut state = self.state.write().await;
        let payment = state.payments.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::PaymentNotFound, format!("No payment {}", id))
        })?;

        if payment.status != PaymentStatus::Pending {
            return Ok(ConditionalUpdate::Conflict(payment.clone()));
        }
        payment.status = PaymentStatus::Expired;
        Ok(ConditionalUpdate::Applied(payment.clone()))
    }

    async fn list_expired_pending(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<PendingPayment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Pending && p.is_expired(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderMaterializer for InMemoryPaymentStore {
    async fn materialize(
        &self,
        payment: &PendingPayment,
    ) -> Result<MaterializeOutcome, DomainError> {
        // One write-lock section covers the status check, the order
        // insert, and the completion stamp.
        let mut state = self.state.write().await;
        let stored = state
            .payments
            .get(&payment.id)
            .cloned()
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PaymentNotFound,
                    format!("No payment {}", payment.id),
                )
            })?;

        if stored.status != PaymentStatus::Pending {
            return Ok(MaterializeOutcome::StateConflict(stored));
        }

        let order_number = OrderNumber::new(self.next_order_number.fetch_add(1, Ordering::SeqCst))
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
        let receipt = OrderReceipt {
            order_id: OrderId::new(),
            order_number,
        };

        state.orders.push(MaterializedOrder {
            order_id: receipt.order_id,
            order_number: receipt.order_number,
            restaurant_id: stored.restaurant_id,
            amount: stored.amount,
            currency: stored.currency,
        });

        let row = state
            .payments
            .get_mut(&payment.id)
            .expect("row existed above and the lock is held");
        row.complete(receipt.order_id, receipt.order_number)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;

        Ok(MaterializeOutcome::Materialized(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{Destination, PaymentProvider, RoutingDecision};

    fn test_payment() -> PendingPayment {
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
    async fn insert_and_find_by_both_keys() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment();
        store.insert(&payment).await.unwrap();

        let by_id = store.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(by_id, payment);

        let by_intent = store
            .find_by_intent(&payment.provider_intent_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_intent.id, payment.id);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_intent_id() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment();
        store.insert(&payment).await.unwrap();

        let mut duplicate = test_payment();
        duplicate.provider_intent_id = payment.provider_intent_id.clone();
        assert!(store.insert(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn update_amount_applies_while_pending() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment();
        store.insert(&payment).await.unwrap();

        let outcome = store
            .update_amount_if_pending(&payment.id, Amount::new(3000).unwrap())
            .await
            .unwrap();

        match outcome {
            ConditionalUpdate::Applied(updated) => {
                assert_eq!(updated.amount.minor_units(), 3000)
            }
            other => panic!("expected Applied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_amount_conflicts_after_materialization() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment();
        store.insert(&payment).await.unwrap();
        store.materialize(&payment).await.unwrap();

        let outcome = store
            .update_amount_if_pending(&payment.id, Amount::new(3000).unwrap())
            .await
            .unwrap();

        match outcome {
            ConditionalUpdate::Conflict(current) => {
                assert_eq!(current.status, PaymentStatus::Completed);
                assert_eq!(current.amount.minor_units(), 2500);
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn materialize_creates_exactly_one_order() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment();
        store.insert(&payment).await.unwrap();

        let first = store.materialize(&payment).await.unwrap();
        let receipt = match first {
            MaterializeOutcome::Materialized(receipt) => receipt,
            other => panic!("expected Materialized, got {:?}", other),
        };

        // Second attempt loses the conditional update and reports the winner.
        let second = store.materialize(&payment).await.unwrap();
        match second {
            MaterializeOutcome::StateConflict(current) => {
                assert_eq!(current.order_id, Some(receipt.order_id));
            }
            other => panic!("expected StateConflict, got {:?}", other),
        }

        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn materialized_order_matches_ledger_total() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment();
        store.insert(&payment).await.unwrap();
        store.materialize(&payment).await.unwrap();

        let orders = store.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].amount, payment.amount);
        assert_eq!(orders[0].currency, payment.currency);
        assert_eq!(orders[0].restaurant_id, payment.restaurant_id);
    }

    #[tokio::test]
    async fn mark_expired_only_touches_pending_rows() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment();
        store.insert(&payment).await.unwrap();

        let first = store.mark_expired_if_pending(&payment.id).await.unwrap();
        assert!(matches!(first, ConditionalUpdate::Applied(_)));

        let second = store.mark_expired_if_pending(&payment.id).await.unwrap();
        assert!(matches!(second, ConditionalUpdate::Conflict(_)));
    }

    #[tokio::test]
    async fn list_expired_pending_skips_live_and_terminal_rows() {
        let store = InMemoryPaymentStore::new();

        let mut lapsed = test_payment();
        lapsed.expires_at = Timestamp::now().plus_minutes(-5);
        store.insert(&lapsed).await.unwrap();

        let live = test_payment();
        store.insert(&live).await.unwrap();

        let mut completed = test_payment();
        completed.expires_at = Timestamp::now().plus_minutes(-5);
        store.insert(&completed).await.unwrap();
        store.materialize(&completed).await.unwrap();

        let expired = store
            .list_expired_pending(Timestamp::now(), 100)
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, lapsed.id);
    }
}
