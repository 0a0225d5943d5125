//! PayTabs payment gateway adapter.
//!
//! Regional provider for markets the primary card network does not
//! cover. PayTabs is a hosted-page gateway and a single
//! merchant-of-record: there is no destination-account concept, so the
//! destination is ignored beyond what routing already guaranteed.
//!
//! Amounts cross this boundary as decimal strings in the currency's
//! major unit; conversion to and from minor units happens here and only
//! here.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Amount, Currency};
use crate::domain::payment::Destination;
use crate::ports::{
    CreateIntentRequest, GatewayError, PaymentConfirmation, PaymentGateway, ProviderIntent,
    WebhookPayload,
};

use crate::adapters::stripe::hex_encode;

type HmacSha256 = Hmac<Sha256>;

/// PayTabs API configuration.
#[derive(Clone)]
pub struct PayTabsConfig {
    /// Merchant profile id.
    profile_id: String,

    /// Server key; authenticates API calls and signs callbacks.
    server_key: SecretString,

    /// Base URL for the PayTabs API.
    api_base_url: String,
}

impl PayTabsConfig {
    /// Create a new PayTabs configuration.
    pub fn new(profile_id: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            server_key: SecretString::new(server_key.into()),
            api_base_url: "https://secure.paytabs.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// PayTabs gateway adapter.
pub struct PayTabsGateway {
    config: PayTabsConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PaymentRequestResponse {
    tran_ref: String,
    redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionQueryResponse {
    cart_id: String,
}

#[derive(Debug, Deserialize)]
struct CallbackBody {
    tran_ref: String,
    cart_amount: String,
    cart_currency: String,
    payment_result: CallbackResult,
}

#[derive(Debug, Deserialize)]
struct CallbackResult {
    response_status: String,
}

impl PayTabsGateway {
    /// Create a new PayTabs gateway with the given configuration.
    pub fn new(config: PayTabsConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .http_client
            .post(&url)
            .header("authorization", self.config.server_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(path, error = %error_text, "PayTabs API call failed");
            return Err(GatewayError::provider(format!(
                "PayTabs API error: {}",
                error_text
            )));
        }

        response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse PayTabs response: {}", e))
        })
    }
}

/// Format minor units as the decimal string PayTabs expects.
fn format_decimal(minor: i64, digits: u32) -> String {
    let scale = 10i64.pow(digits);
    format!(
        "{}.{:0width$}",
        minor / scale,
        minor % scale,
        width = digits as usize
    )
}

/// Parse a PayTabs decimal amount back into minor units.
fn parse_decimal_minor(s: &str, digits: u32) -> Option<i64> {
    let s = s.trim();
    let (major, fraction) = match s.split_once('.') {
        Some((major, fraction)) => (major, fraction),
        None => (s, ""),
    };

    if fraction.len() > digits as usize {
        return None;
    }

    let major: i64 = major.parse().ok()?;
    let fraction_value: i64 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().ok()?
    };
    if major < 0 || fraction_value < 0 {
        return None;
    }

    let scale = 10i64.pow(digits);
    let fraction_scale = 10i64.pow(digits - fraction.len() as u32);
    Some(major * scale + fraction_value * fraction_scale)
}

#[async_trait]
impl PaymentGateway for PayTabsGateway {
    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<ProviderIntent, GatewayError> {
        let cart_id = format!("sufra-{}-{}", request.restaurant_id, uuid::Uuid::new_v4());
        let body = serde_json::json!({
            "profile_id": self.config.profile_id,
            "tran_type": "sale",
            "tran_class": "ecom",
            "cart_id": cart_id,
            "cart_description": "Sufra table order",
            "cart_currency": request.currency.as_str(),
            "cart_amount": format_decimal(
                request.amount.minor_units(),
                request.currency.minor_digits()
            ),
        });

        let response: PaymentRequestResponse =
            self.post_json("/payment/request", body).await?;

        let redirect_url = response.redirect_url.ok_or_else(|| {
            GatewayError::provider("PayTabs response missing redirect_url")
        })?;

        // The hosted-page URL plays the client_secret role: it is what
        // the client needs to drive the provider's payment UI.
        Ok(ProviderIntent {
            id: response.tran_ref,
            client_secret: redirect_url,
        })
    }

    async fn update_intent_amount(
        &self,
        provider_intent_id: &str,
        _destination: &Destination,
        amount: Amount,
        currency: Currency,
    ) -> Result<(), GatewayError> {
        // PayTabs has no in-place amend; re-requesting with the original
        // cart id replaces the open transaction's amount and keeps the
        // same transaction reference.
        let query: TransactionQueryResponse = self
            .post_json(
                "/payment/query",
                serde_json::json!({
                    "profile_id": self.config.profile_id,
                    "tran_ref": provider_intent_id,
                }),
            )
            .await?;

        let response: PaymentRequestResponse = self
            .post_json(
                "/payment/request",
                serde_json::json!({
                    "profile_id": self.config.profile_id,
                    "tran_type": "sale",
                    "tran_class": "ecom",
                    "cart_id": query.cart_id,
                    "cart_currency": currency.as_str(),
                    "cart_amount": format_decimal(amount.minor_units(), currency.minor_digits()),
                }),
            )
            .await?;

        if response.tran_ref != provider_intent_id {
            return Err(GatewayError::provider(
                "PayTabs re-request returned a different transaction reference",
            ));
        }

        Ok(())
    }

    async fn cancel_intent(
        &self,
        provider_intent_id: &str,
        _destination: &Destination,
    ) -> Result<(), GatewayError> {
        let _: serde_json::Value = self
            .post_json(
                "/payment/request",
                serde_json::json!({
                    "profile_id": self.config.profile_id,
                    "tran_type": "void",
                    "tran_ref": provider_intent_id,
                }),
            )
            .await?;
        Ok(())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookPayload, GatewayError> {
        // PayTabs signs the raw callback body with the server key.
        let provided = hex_decode(signature)
            .ok_or_else(|| GatewayError::invalid_webhook("Signature is not valid hex"))?;

        let mut mac = HmacSha256::new_from_slice(
            self.config.server_key.expose_secret().as_bytes(),
        )
        .expect("HMAC can take key of any size");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.as_slice().ct_eq(provided.as_slice()).unwrap_u8() != 1 {
            tracing::warn!(
                expected_signature = hex_encode(expected.as_slice()),
                "Invalid PayTabs callback signature"
            );
            return Err(GatewayError::invalid_webhook("Invalid signature"));
        }

        let body: CallbackBody = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::invalid_webhook(format!("Invalid JSON: {}", e)))?;

        // "A" is approved; everything else is not a capture.
        if body.payment_result.response_status != "A" {
            return Ok(WebhookPayload::Ignored {
                event_type: format!(
                    "payment_result.{}",
                    body.payment_result.response_status
                ),
            });
        }

        let currency: Currency = body.cart_currency.parse().map_err(|_| {
            GatewayError::invalid_webhook(format!(
                "Unsupported callback currency: {}",
                body.cart_currency
            ))
        })?;

        let amount_minor = parse_decimal_minor(&body.cart_amount, currency.minor_digits())
            .ok_or_else(|| {
                GatewayError::invalid_webhook(format!(
                    "Unparseable callback amount: {}",
                    body.cart_amount
                ))
            })?;

        Ok(WebhookPayload::Confirmation(PaymentConfirmation {
            provider_intent_id: body.tran_ref,
            amount_minor,
            currency: currency.as_str().to_string(),
        }))
    }
}

/// Decode a hex string to bytes.
fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        bytes.push(u8::from_str_radix(&hex[i..i + 2], 16).ok()?);
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], key: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).unwrap();
        mac.update(payload);
        hex_encode(&mac.finalize().into_bytes())
    }

    fn callback(status: &str, amount: &str, currency: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "tran_ref": "TST2234500012345",
            "cart_amount": amount,
            "cart_currency": currency,
            "payment_result": { "response_status": status }
        }))
        .unwrap()
    }

    fn test_gateway() -> PayTabsGateway {
        PayTabsGateway::new(PayTabsConfig::new("87654", "SNJNBkMHKB"))
    }

    #[test]
    fn format_decimal_handles_three_digit_currencies() {
        assert_eq!(format_decimal(12000, 3), "12.000");
        assert_eq!(format_decimal(1200, 3), "1.200");
        assert_eq!(format_decimal(2500, 2), "25.00");
        assert_eq!(format_decimal(5, 2), "0.05");
    }

    #[test]
    fn parse_decimal_minor_inverts_format() {
        for (minor, digits) in [(12000i64, 3u32), (1200, 3), (2500, 2), (5, 2), (100, 2)] {
            let formatted = format_decimal(minor, digits);
            assert_eq!(parse_decimal_minor(&formatted, digits), Some(minor));
        }
    }

    #[test]
    fn parse_decimal_minor_handles_short_and_missing_fractions() {
        assert_eq!(parse_decimal_minor("12", 3), Some(12000));
        assert_eq!(parse_decimal_minor("12.5", 2), Some(1250));
        assert_eq!(parse_decimal_minor("12.3456", 2), None);
        assert_eq!(parse_decimal_minor("abc", 2), None);
    }

    #[tokio::test]
    async fn verify_webhook_accepts_signed_approved_callback() {
        let gateway = test_gateway();
        let payload = callback("A", "1.200", "JOD");
        let signature = sign(&payload, "SNJNBkMHKB");

        let result = gateway.verify_webhook(&payload, &signature).await.unwrap();
        match result {
            WebhookPayload::Confirmation(confirmation) => {
                assert_eq!(confirmation.provider_intent_id, "TST2234500012345");
                assert_eq!(confirmation.amount_minor, 1200);
                assert_eq!(confirmation.currency, "JOD");
            }
            other => panic!("expected Confirmation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn verify_webhook_rejects_bad_signature() {
        let gateway = test_gateway();
        let payload = callback("A", "1.200", "JOD");
        let signature = sign(&payload, "wrong-key");

        assert!(gateway.verify_webhook(&payload, &signature).await.is_err());
    }

    #[tokio::test]
    async fn verify_webhook_ignores_declined_callbacks() {
        let gateway = test_gateway();
        let payload = callback("D", "1.200", "JOD");
        let signature = sign(&payload, "SNJNBkMHKB");

        let result = gateway.verify_webhook(&payload, &signature).await.unwrap();
        assert!(matches!(
            result,
            WebhookPayload::Ignored { ref event_type } if event_type == "payment_result.D"
        ));
    }
}
