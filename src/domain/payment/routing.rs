//! Provider routing.
//!
//! Picks which payment provider handles a checkout and where the funds
//! settle. The decision is computed exactly once, frozen onto the
//! pending payment at creation, and never recomputed afterwards: a
//! tenant finishing onboarding mid-flight must not move an already
//! created charge to a different destination.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::profile::{CountryCode, RestaurantPaymentProfile};

/// Countries where the primary provider's card network operates.
/// Tenants elsewhere are routed to the regional provider.
static CARD_NETWORK_COUNTRIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "US", "CA", "GB", "IE", "FR", "DE", "ES", "IT", "NL", "BE", "AT", "PT", "CH", "SE", "NO",
        "DK", "FI", "AU", "NZ", "SG", "JP", "AE",
    ]
    .into_iter()
    .collect()
});

/// Payment providers the platform can charge through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    /// Primary card provider with connected sub-accounts.
    Stripe,

    /// Regional hosted-page provider; single merchant-of-record.
    PayTabs,
}

impl PaymentProvider {
    /// Storage/display form used by adapters.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::PayTabs => "paytabs",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a charge settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "account_id")]
pub enum Destination {
    /// Shared platform account; funds held until an administrative payout.
    Platform,

    /// Direct charge on the tenant's merchant sub-account.
    SubAccount(String),
}

impl Destination {
    /// The sub-account id, if any. `None` means the platform account.
    pub fn account_id(&self) -> Option<&str> {
        match self {
            Destination::Platform => None,
            Destination::SubAccount(id) => Some(id),
        }
    }

    /// Rebuilds a destination from the nullable stored column.
    pub fn from_account_id(account_id: Option<String>) -> Self {
        match account_id {
            Some(id) => Destination::SubAccount(id),
            None => Destination::Platform,
        }
    }
}

/// Provider plus settlement destination for one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub provider: PaymentProvider,
    pub destination: Destination,
}

impl RoutingDecision {
    /// Routes a checkout for the given tenant profile.
    ///
    /// Tenants outside the card network go to the regional provider,
    /// which has no destination-account concept. Otherwise a chargeable
    /// sub-account takes a direct charge; anyone else settles on the
    /// platform account.
    pub fn route(profile: &RestaurantPaymentProfile) -> Self {
        if !card_network_supported(&profile.country) {
            return Self {
                provider: PaymentProvider::PayTabs,
                destination: Destination::Platform,
            };
        }

        let destination = match (&profile.stripe_account_id, profile.is_chargeable()) {
            (Some(account_id), true) => Destination::SubAccount(account_id.clone()),
            _ => Destination::Platform,
        };

        Self {
            provider: PaymentProvider::Stripe,
            destination,
        }
    }
}

/// Whether the primary provider's card network covers the country.
pub fn card_network_supported(country: &CountryCode) -> bool {
    CARD_NETWORK_COUNTRIES.contains(country.as_str())
}
