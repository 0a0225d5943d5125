//! Tenant payment profile.
//!
//! Read-mostly projection of a restaurant's merchant onboarding state.
//! Written by the external onboarding flow; this crate only reads it to
//! decide where a charge settles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{RestaurantId, ValidationError};

/// ISO 3166-1 alpha-2 country code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    /// Returns the two-letter code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CountryCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "country",
                format!("Expected two-letter ISO code, got '{}'", s),
            ));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A restaurant's merchant-account state, as left by onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantPaymentProfile {
    pub restaurant_id: RestaurantId,

    /// Country the tenant operates in; drives provider selection.
    pub country: CountryCode,

    /// Connected merchant sub-account, if onboarding created one.
    pub stripe_account_id: Option<String>,

    /// Whether the onboarding flow ran to completion.
    pub stripe_onboarding_completed: bool,
}

impl RestaurantPaymentProfile {
    /// True when charges can be routed directly to the tenant's
    /// sub-account: onboarding finished and an account id exists.
    pub fn is_chargeable(&self) -> bool {
        self.stripe_onboarding_completed && self.stripe_account_id.is_some()
    }
}
