//! Payment gateway port for provider integrations.
//!
//! Defines the contract for payment provider adapters (Stripe, PayTabs).
//! Implementations own the provider intent lifecycle and the webhook
//! signature-verification boundary: only verified, already-parsed
//! confirmations ever reach the reconciler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{Amount, Currency, RestaurantId};
use crate::domain::payment::{Destination, PaymentProvider};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a provider intent for the given amount and destination.
    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<ProviderIntent, GatewayError>;

    /// Pushes a new amount onto an existing provider intent.
    ///
    /// The destination must be the one the intent was created against -
    /// never the opposite account.
    async fn update_intent_amount(
        &self,
        provider_intent_id: &str,
        destination: &Destination,
        amount: Amount,
        currency: Currency,
    ) -> Result<(), GatewayError>;

    /// Cancels a provider intent. Used to compensate when the ledger
    /// insert fails after the intent was created.
    async fn cancel_intent(
        &self,
        provider_intent_id: &str,
        destination: &Destination,
    ) -> Result<(), GatewayError>;

    /// Verifies a webhook signature and parses the event.
    ///
    /// Returns the verified payload if the signature is valid, an error
    /// otherwise. Unverified bytes never cross this boundary.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookPayload, GatewayError>;
}

/// Request to create a provider intent.
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    /// Tenant the charge belongs to (stored as provider metadata).
    pub restaurant_id: RestaurantId,

    pub amount: Amount,
    pub currency: Currency,

    /// Settlement destination chosen by routing, frozen for this intent.
    pub destination: Destination,
}

/// A provider-side intent created for a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIntent {
    /// The provider's intent reference.
    pub id: String,

    /// Secret the client needs to drive the provider's payment UI.
    pub client_secret: String,
}

/// Verified webhook content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookPayload {
    /// A successful payment confirmation to reconcile.
    Confirmation(PaymentConfirmation),

    /// A verified event the pipeline does not act on.
    Ignored { event_type: String },
}

/// A signature-verified payment confirmation.
///
/// The only input the reconciler accepts; produced exclusively by
/// `PaymentGateway::verify_webhook`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub provider_intent_id: String,

    /// Amount the provider reports as captured, in minor units.
    pub amount_minor: i64,

    /// Currency code as reported by the provider.
    pub currency: String,
}

/// Maps each provider to its gateway adapter.
#[derive(Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    /// Builds a registry from per-provider adapters.
    pub fn new(
        stripe: Arc<dyn PaymentGateway>,
        paytabs: Arc<dyn PaymentGateway>,
    ) -> Self {
        let mut gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>> = HashMap::new();
        gateways.insert(PaymentProvider::Stripe, stripe);
        gateways.insert(PaymentProvider::PayTabs, paytabs);
        Self { gateways }
    }

    /// Builds a registry that serves the same adapter for every
    /// provider. Test/dev convenience.
    pub fn uniform(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::new(gateway.clone(), gateway)
    }

    /// Resolves the gateway for a routed provider.
    pub fn for_provider(&self, provider: PaymentProvider) -> Arc<dyn PaymentGateway> {
        self.gateways
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| unreachable!("registry covers every PaymentProvider variant"))
    }
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Creates a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Creates a provider API error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }

    /// Creates an invalid webhook error.
    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidWebhook, message)
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for crate::domain::payment::PaymentFlowError {
    fn from(err: GatewayError) -> Self {
        use crate::domain::payment::PaymentFlowError;

        match err.code {
            GatewayErrorCode::InvalidWebhook => PaymentFlowError::invalid_webhook_signature(),
            _ => PaymentFlowError::gateway_failed(err.to_string()),
        }
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Invalid webhook signature or payload.
    InvalidWebhook,

    /// Resource not found at the provider.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::InvalidWebhook => "invalid_webhook",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn gateway_error_retryable_follows_code() {
        assert!(GatewayErrorCode::NetworkError.is_retryable());
        assert!(GatewayErrorCode::RateLimitExceeded.is_retryable());

        assert!(!GatewayErrorCode::InvalidWebhook.is_retryable());
        assert!(!GatewayErrorCode::ProviderError.is_retryable());
    }

    #[test]
    fn gateway_error_display_includes_code_and_message() {
        let err = GatewayError::invalid_webhook("bad signature");
        assert!(err.to_string().contains("invalid_webhook"));
        assert!(err.to_string().contains("bad signature"));
    }
}
