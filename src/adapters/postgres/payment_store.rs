//! PostgreSQL implementation of the ledger ports.
//!
//! Conditional updates are expressed directly in SQL
//! (`... WHERE status = 'pending'`), which makes the row-level
//! compare-and-swap the database's problem: concurrent writers on the
//! same intent serialize on the row lock and exactly one predicate
//! evaluation wins. Materialization wraps the order insert and the
//! completion stamp in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Amount, Currency, DomainError, ErrorCode, OrderId, OrderNumber, PendingPaymentId,
    RestaurantId, Timestamp,
};
use crate::domain::payment::{
    Destination, PaymentProvider, PaymentStatus, PendingPayment, RoutingDecision,
};
use crate::ports::{
    ConditionalUpdate, MaterializeOutcome, OrderMaterializer, OrderReceipt,
    PendingPaymentRepository,
};

/// PostgreSQL implementation of `PendingPaymentRepository` and
/// `OrderMaterializer`.
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Creates a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_current(
        &self,
        id: &PendingPaymentId,
    ) -> Result<PendingPayment, DomainError> {
        let row = sqlx::query_as::<_, PendingPaymentRow>(
            "SELECT * FROM pending_payments WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            DomainError::new(ErrorCode::PaymentNotFound, format!("No payment {}", id))
        })?;

        row.try_into()
    }
}

/// Database row representation of a pending payment.
#[derive(Debug, sqlx::FromRow)]
struct PendingPaymentRow {
    id: Uuid,
    restaurant_id: Uuid,
    provider_intent_id: String,
    amount_minor: i64,
    currency: String,
    provider: String,
    destination_account_id: Option<String>,
    status: String,
    expires_at: DateTime<Utc>,
    order_id: Option<Uuid>,
    order_number: Option<i64>,
    created_at: DateTime<Utc>,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

impl TryFrom<PendingPaymentRow> for PendingPayment {
    type Error = DomainError;

    fn try_from(row: PendingPaymentRow) -> Result<Self, Self::Error> {
        let currency: Currency = row.currency.parse().map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid currency value: {}", row.currency),
            )
        })?;

        let order_number = row
            .order_number
            .map(OrderNumber::new)
            .transpose()
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;

        Ok(PendingPayment {
            id: PendingPaymentId::from_uuid(row.id),
            restaurant_id: RestaurantId::from_uuid(row.restaurant_id),
            provider_intent_id: row.provider_intent_id,
            amount: Amount::new(row.amount_minor).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, e.to_string())
            })?,
            currency,
            routing: RoutingDecision {
                provider: parse_provider(&row.provider)?,
                destination: Destination::from_account_id(row.destination_account_id),
            },
            status: parse_status(&row.status)?,
            expires_at: Timestamp::from_datetime(row.expires_at),
            order_id: row.order_id.map(OrderId::from_uuid),
            order_number,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "completed" => Ok(PaymentStatus::Completed),
        "expired" => Ok(PaymentStatus::Expired),
        "failed" => Ok(PaymentStatus::Failed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn parse_provider(s: &str) -> Result<PaymentProvider, DomainError> {
    match s {
        "stripe" => Ok(PaymentProvider::Stripe),
        "paytabs" => Ok(PaymentProvider::PayTabs),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid provider value: {}", s),
        )),
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Database error: {}", e))
}

#[async_trait]
impl PendingPaymentRepository for PostgresPaymentStore {
    async fn insert(&self, payment: &PendingPayment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO pending_payments (
                id, restaurant_id, provider_intent_id, amount_minor, currency,
                provider, destination_account_id, status, expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.restaurant_id.as_uuid())
        .bind(&payment.provider_intent_id)
        .bind(payment.amount.minor_units())
        .bind(payment.currency.as_str())
        .bind(payment.routing.provider.as_str())
        .bind(payment.routing.destination.account_id())
        .bind(payment.status.as_str())
        .bind(payment.expires_at.as_datetime())
        .bind(payment.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("pending_payments_provider_intent_id_key") {
                    return DomainError::new(
                        ErrorCode::DatabaseError,
                        format!(
                            "Duplicate provider intent id: {}",
                            payment.provider_intent_id
                        ),
                    );
                }
            }
            db_error(e)
        })?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PendingPaymentId,
    ) -> Result<Option<PendingPayment>, DomainError> {
        sqlx::query_as::<_, PendingPaymentRow>(
            "SELECT * FROM pending_payments WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn find_by_intent(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<PendingPayment>, DomainError> {
        sqlx::query_as::<_, PendingPaymentRow>(
            "SELECT * FROM pending_payments WHERE provider_intent_id = $1",
        )
        .bind(provider_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn update_amount_if_pending(
        &self,
        id: &PendingPaymentId,
        amount: Amount,
    ) -> Result<ConditionalUpdate, DomainError> {
        let updated = sqlx::query_as::<_, PendingPaymentRow>(
            r#"
            UPDATE pending_payments
            SET amount_minor = $2, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(amount.minor_units())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match updated {
            Some(row) => Ok(ConditionalUpdate::Applied(row.try_into()?)),
            None => Ok(ConditionalUpdate::Conflict(self.fetch_current(id).await?)),
        }
    }

    async fn mark_expired_if_pending(
        &self,
        id: &PendingPaymentId,
    ) -> Result<ConditionalUpdate, DomainError> {
        let updated = sqlx::query_as::<_, PendingPaymentRow>(
            r#"
            UPDATE pending_payments
            SET status = 'expired', updated_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match updated {
            Some(row) => Ok(ConditionalUpdate::Applied(row.try_into()?)),
            None => Ok(ConditionalUpdate::Conflict(self.fetch_current(id).await?)),
        }
    }

    async fn list_expired_pending(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<PendingPayment>, DomainError> {
        let rows = sqlx::query_as::<_, PendingPaymentRow>(
            r#"
            SELECT * FROM pending_payments
            WHERE status = 'pending' AND expires_at < $1
            ORDER BY expires_at
            LIMIT $2
            "#,
        )
        .bind(now.as_datetime())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl OrderMaterializer for PostgresPaymentStore {
    async fn materialize(
        &self,
        payment: &PendingPayment,
    ) -> Result<MaterializeOutcome, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let order_id = Uuid::new_v4();
        let (order_number,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO orders (id, restaurant_id, amount_minor, currency, created_at)
            VALUES ($1, $2, $3, $4, now())
            RETURNING order_number
            "#,
        )
        .bind(order_id)
        .bind(payment.restaurant_id.as_uuid())
        .bind(payment.amount.minor_units())
        .bind(payment.currency.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let stamped = sqlx::query_as::<_, PendingPaymentRow>(
            r#"
            UPDATE pending_payments
            SET status = 'completed', order_id = $2, order_number = $3, updated_at = now()
            WHERE provider_intent_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(&payment.provider_intent_id)
        .bind(order_id)
        .bind(order_number)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        match stamped {
            Some(_) => {
                tx.commit().await.map_err(db_error)?;
                Ok(MaterializeOutcome::Materialized(OrderReceipt {
                    order_id: OrderId::from_uuid(order_id),
                    order_number: OrderNumber::new(order_number).map_err(|e| {
                        DomainError::new(ErrorCode::DatabaseError, e.to_string())
                    })?,
                }))
            }
            None => {
                // Predicate failed: roll the order insert back and report
                // the row that won.
                tx.rollback().await.map_err(db_error)?;
                let current = self.fetch_current(&payment.id).await?;
                Ok(MaterializeOutcome::StateConflict(current))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_covers_every_stored_value() {
        assert_eq!(parse_status("pending").unwrap(), PaymentStatus::Pending);
        assert_eq!(parse_status("completed").unwrap(), PaymentStatus::Completed);
        assert_eq!(parse_status("expired").unwrap(), PaymentStatus::Expired);
        assert_eq!(parse_status("failed").unwrap(), PaymentStatus::Failed);
        assert!(parse_status("refunded").is_err());
    }

    #[test]
    fn parse_provider_covers_every_stored_value() {
        assert_eq!(parse_provider("stripe").unwrap(), PaymentProvider::Stripe);
        assert_eq!(parse_provider("paytabs").unwrap(), PaymentProvider::PayTabs);
        assert!(parse_provider("square").is_err());
    }

    #[test]
    fn status_strings_roundtrip_with_the_state_machine() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Expired,
            PaymentStatus::Failed,
        ] {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
    }
}
