//! Restaurant payment profile port.
//!
//! Onboarding (out of scope) writes the profile; the pipeline only
//! reads it to route checkouts.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, RestaurantId};
use crate::domain::payment::RestaurantPaymentProfile;

/// Read access to tenant payment profiles.
#[async_trait]
pub trait RestaurantReader: Send + Sync {
    /// Fetches a restaurant's payment profile, if the tenant exists.
    async fn payment_profile(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Option<RestaurantPaymentProfile>, DomainError>;
}
