//! In-memory restaurant payment profile directory.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, RestaurantId};
use crate::domain::payment::RestaurantPaymentProfile;
use crate::ports::RestaurantReader;

/// Fixed set of tenant profiles, seeded at construction.
pub struct StaticRestaurantDirectory {
    profiles: HashMap<RestaurantId, RestaurantPaymentProfile>,
}

impl StaticRestaurantDirectory {
    pub fn new(profiles: impl IntoIterator<Item = RestaurantPaymentProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.restaurant_id, p))
                .collect(),
        }
    }

    /// Directory with no tenants; every lookup misses.
    pub fn empty() -> Self {
        Self::new([])
    }
}

#[async_trait]
impl RestaurantReader for StaticRestaurantDirectory {
    async fn payment_profile(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Option<RestaurantPaymentProfile>, DomainError> {
        Ok(self.profiles.get(restaurant_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_seeded_profile() {
        let profile = RestaurantPaymentProfile {
            restaurant_id: RestaurantId::new(),
            country: "DE".parse().unwrap(),
            stripe_account_id: Some("acct_1".to_string()),
            stripe_onboarding_completed: true,
        };
        let directory = StaticRestaurantDirectory::new([profile.clone()]);

        let found = directory
            .payment_profile(&profile.restaurant_id)
            .await
            .unwrap();
        assert_eq!(found, Some(profile));
    }

    #[tokio::test]
    async fn misses_unknown_tenant() {
        let directory = StaticRestaurantDirectory::empty();
        let found = directory.payment_profile(&RestaurantId::new()).await.unwrap();
        assert!(found.is_none());
    }
}
