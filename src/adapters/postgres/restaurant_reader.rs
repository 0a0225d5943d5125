//! PostgreSQL implementation of RestaurantReader.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, RestaurantId};
use crate::domain::payment::{CountryCode, RestaurantPaymentProfile};
use crate::ports::RestaurantReader;

/// Reads tenant payment profiles from the restaurants table.
pub struct PostgresRestaurantReader {
    pool: PgPool,
}

impl PostgresRestaurantReader {
    /// Creates a new reader over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    restaurant_id: Uuid,
    country: String,
    stripe_account_id: Option<String>,
    stripe_onboarding_completed: bool,
}

impl TryFrom<ProfileRow> for RestaurantPaymentProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let country: CountryCode = row.country.parse().map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid country value: {}", row.country),
            )
        })?;

        Ok(RestaurantPaymentProfile {
            restaurant_id: RestaurantId::from_uuid(row.restaurant_id),
            country,
            stripe_account_id: row.stripe_account_id,
            stripe_onboarding_completed: row.stripe_onboarding_completed,
        })
    }
}

#[async_trait]
impl RestaurantReader for PostgresRestaurantReader {
    async fn payment_profile(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Option<RestaurantPaymentProfile>, DomainError> {
        sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT restaurant_id, country, stripe_account_id, stripe_onboarding_completed
            FROM restaurant_payment_profiles
            WHERE restaurant_id = $1
            "#,
        )
        .bind(restaurant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Database error: {}", e))
        })?
        .map(TryInto::try_into)
        .transpose()
    }
}
