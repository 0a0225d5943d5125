//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait against the Stripe
//! PaymentIntents API. Direct charges on tenant sub-accounts are made
//! with the `Stripe-Account` header; platform charges omit it.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Amount, Currency};
use crate::domain::payment::Destination;
use crate::ports::{
    CreateIntentRequest, GatewayError, PaymentConfirmation, PaymentGateway, ProviderIntent,
    WebhookPayload,
};

use super::webhook_types::{
    hex_encode, SignatureHeader, StripePaymentIntent, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Whether to require livemode events in production.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe gateway adapter.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Attach auth and, for sub-account destinations, the Stripe-Account
    /// header that makes the call a direct charge on the tenant account.
    fn request(
        &self,
        builder: reqwest::RequestBuilder,
        destination: &Destination,
    ) -> reqwest::RequestBuilder {
        let builder =
            builder.basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None);
        match destination.account_id() {
            Some(account_id) => builder.header("Stripe-Account", account_id),
            None => builder,
        }
    }

    async fn parse_intent_response(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<StripePaymentIntent, GatewayError> {
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(operation, error = %error_text, "Stripe API call failed");
            return Err(GatewayError::provider(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }

    /// Verify webhook signature using HMAC-SHA256.
    ///
    /// # Security
    ///
    /// - Uses constant-time comparison to prevent timing attacks
    /// - Validates timestamp to prevent replay attacks
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), GatewayError> {
        // 1. Validate timestamp (prevent replay attacks)
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(GatewayError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(GatewayError::invalid_webhook("Event timestamp in future"));
        }

        // 2. Compute expected signature
        let signed_payload = format!(
            "{}.{}",
            header.timestamp,
            String::from_utf8_lossy(payload)
        );

        let mut mac = HmacSha256::new_from_slice(
            self.config.webhook_secret.expose_secret().as_bytes(),
        )
        .expect("HMAC can take key of any size");

        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();

        // 3. Constant-time comparison
        let expected_bytes: &[u8] = expected.as_slice();
        let provided_bytes: &[u8] = &header.v1_signature;

        if expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
            tracing::warn!(
                expected_signature = hex_encode(expected_bytes),
                "Invalid webhook signature"
            );
            return Err(GatewayError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a verified event into the payload the pipeline consumes.
    fn parse_event(&self, payload: &[u8]) -> Result<WebhookPayload, GatewayError> {
        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            GatewayError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Rejected test mode event in production");
            return Err(GatewayError::invalid_webhook(
                "Test mode events not allowed in production",
            ));
        }

        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                let intent: StripePaymentIntent =
                    serde_json::from_value(event.data.object.clone()).map_err(|e| {
                        GatewayError::invalid_webhook(format!("Invalid payment intent: {}", e))
                    })?;

                Ok(WebhookPayload::Confirmation(PaymentConfirmation {
                    provider_intent_id: intent.id.clone(),
                    amount_minor: intent.captured_amount(),
                    currency: intent.currency.to_ascii_uppercase(),
                }))
            }
            other => Ok(WebhookPayload::Ignored {
                event_type: other.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<ProviderIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.config.api_base_url);

        let params = vec![
            ("amount", request.amount.minor_units().to_string()),
            ("currency", request.currency.as_str().to_lowercase()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[restaurant_id]", request.restaurant_id.to_string()),
        ];

        let response = self
            .request(self.http_client.post(&url), &request.destination)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let intent = Self::parse_intent_response(response, "create_intent").await?;
        let client_secret = intent.client_secret.clone().ok_or_else(|| {
            GatewayError::provider("Stripe intent response missing client_secret")
        })?;

        Ok(ProviderIntent {
            id: intent.id,
            client_secret,
        })
    }

    async fn update_intent_amount(
        &self,
        provider_intent_id: &str,
        destination: &Destination,
        amount: Amount,
        _currency: Currency,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.config.api_base_url, provider_intent_id
        );

        let params = vec![("amount", amount.minor_units().to_string())];

        let response = self
            .request(self.http_client.post(&url), destination)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found("Payment intent"));
        }

        Self::parse_intent_response(response, "update_intent_amount").await?;
        Ok(())
    }

    async fn cancel_intent(
        &self,
        provider_intent_id: &str,
        destination: &Destination,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/v1/payment_intents/{}/cancel",
            self.config.api_base_url, provider_intent_id
        );

        let response = self
            .request(self.http_client.post(&url), destination)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found("Payment intent"));
        }

        Self::parse_intent_response(response, "cancel_intent").await?;
        Ok(())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookPayload, GatewayError> {
        let header = SignatureHeader::parse(signature)
            .map_err(|e| GatewayError::invalid_webhook(e.to_string()))?;

        self.verify_signature(payload, &header)?;
        self.parse_event(payload)
    }
}
