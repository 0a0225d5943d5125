//! Payment configuration (Stripe + PayTabs)

use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// PayTabs merchant profile id
    pub paytabs_profile_id: String,

    /// PayTabs server key
    pub paytabs_server_key: String,

    /// How long a checkout reservation holds before it lapses.
    ///
    /// Default 30 minutes: beyond realistic checkout plus 3-D Secure
    /// latency, while bounding how long an abandoned cart occupies a
    /// provider-side reservation.
    #[serde(default = "default_checkout_ttl_minutes")]
    pub checkout_ttl_minutes: i64,

    /// Seconds between expiry sweep passes
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Maximum rows stamped per sweep pass
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if self.paytabs_profile_id.is_empty() {
            return Err(ValidationError::MissingRequired("PAYTABS_PROFILE_ID"));
        }
        if self.paytabs_server_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYTABS_SERVER_KEY"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.checkout_ttl_minutes < 1 || self.checkout_ttl_minutes > 24 * 60 {
            return Err(ValidationError::InvalidCheckoutTtl);
        }
        if self.sweep_interval_secs < 10 {
            return Err(ValidationError::InvalidSweepInterval);
        }

        Ok(())
    }
}

fn default_checkout_ttl_minutes() -> i64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweep_batch_size() -> u32 {
    500
}
