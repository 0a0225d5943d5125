//! Mock payment gateway for tests and local development.
//!
//! Records every intent it creates so tests can assert on amounts,
//! destinations, and cancellations. Webhook verification accepts a
//! fixed `"valid"` signature over a simple JSON payload instead of the
//! real HMAC scheme.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::foundation::{Amount, Currency};
use crate::domain::payment::Destination;
use crate::ports::{
    CreateIntentRequest, GatewayError, PaymentConfirmation, PaymentGateway, ProviderIntent,
    WebhookPayload,
};

/// What the mock remembers about an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedIntent {
    pub amount_minor: i64,
    pub currency: Currency,
    pub destination: Destination,
    pub cancelled: bool,
}

/// Shape of the mock's webhook payload.
#[derive(Debug, Deserialize)]
struct MockWebhookBody {
    intent_id: String,
    amount_minor: i64,
    currency: String,
    #[serde(default)]
    event: Option<String>,
}

/// In-memory gateway double.
pub struct MockPaymentGateway {
    counter: AtomicU64,
    intents: Mutex<HashMap<String, RecordedIntent>>,
    fail_create: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            intents: Mutex::new(HashMap::new()),
            fail_create: false,
        }
    }

    /// Gateway whose create_intent always fails. Error-path tests.
    pub fn failing() -> Self {
        Self {
            counter: AtomicU64::new(0),
            intents: Mutex::new(HashMap::new()),
            fail_create: true,
        }
    }

    /// The amount currently held on an intent, if it exists.
    pub fn intent_amount(&self, intent_id: &str) -> Option<i64> {
        self.intents
            .lock()
            .unwrap()
            .get(intent_id)
            .map(|i| i.amount_minor)
    }

    /// Whether the intent was cancelled.
    pub fn was_cancelled(&self, intent_id: &str) -> bool {
        self.intents
            .lock()
            .unwrap()
            .get(intent_id)
            .map(|i| i.cancelled)
            .unwrap_or(false)
    }

    /// Full record of an intent.
    pub fn recorded(&self, intent_id: &str) -> Option<RecordedIntent> {
        self.intents.lock().unwrap().get(intent_id).cloned()
    }

    /// Number of intents created so far.
    pub fn created_count(&self) -> usize {
        self.intents.lock().unwrap().len()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<ProviderIntent, GatewayError> {
        if self.fail_create {
            return Err(GatewayError::provider("Simulated create failure"));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_mock_{}", n);

        self.intents.lock().unwrap().insert(
            id.clone(),
            RecordedIntent {
                amount_minor: request.amount.minor_units(),
                currency: request.currency,
                destination: request.destination,
                cancelled: false,
            },
        );

        Ok(ProviderIntent {
            client_secret: format!("{}_secret", id),
            id,
        })
    }

    async fn update_intent_amount(
        &self,
        provider_intent_id: &str,
        destination: &Destination,
        amount: Amount,
        _currency: Currency,
    ) -> Result<(), GatewayError> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .get_mut(provider_intent_id)
            .ok_or_else(|| GatewayError::not_found("Payment intent"))?;

        if &intent.destination != destination {
            return Err(GatewayError::provider(
                "Amount update routed to the wrong destination account",
            ));
        }

        intent.amount_minor = amount.minor_units();
        Ok(())
    }

    async fn cancel_intent(
        &self,
        provider_intent_id: &str,
        _destination: &Destination,
    ) -> Result<(), GatewayError> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .get_mut(provider_intent_id)
            .ok_or_else(|| GatewayError::not_found("Payment intent"))?;
        intent.cancelled = true;
        Ok(())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookPayload, GatewayError> {
        if signature != "valid" {
            return Err(GatewayError::invalid_webhook("Invalid signature"));
        }

        let body: MockWebhookBody = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::invalid_webhook(format!("Invalid JSON: {}", e)))?;

        match body.event.as_deref() {
            None | Some("payment.captured") => {
                Ok(WebhookPayload::Confirmation(PaymentConfirmation {
                    provider_intent_id: body.intent_id,
                    amount_minor: body.amount_minor,
                    currency: body.currency.to_ascii_uppercase(),
                }))
            }
            Some(other) => Ok(WebhookPayload::Ignored {
                event_type: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::RestaurantId;

    fn create_request(destination: Destination) -> CreateIntentRequest {
        CreateIntentRequest {
            restaurant_id: RestaurantId::new(),
            amount: Amount::new(2500).unwrap(),
            currency: Currency::Eur,
            destination,
        }
    }

    #[tokio::test]
    async fn records_created_intents() {
        let gateway = MockPaymentGateway::new();
        let intent = gateway
            .create_intent(create_request(Destination::Platform))
            .await
            .unwrap();

        assert_eq!(gateway.intent_amount(&intent.id), Some(2500));
        assert_eq!(gateway.created_count(), 1);
    }

    #[tokio::test]
    async fn update_amount_rejects_destination_swap() {
        let gateway = MockPaymentGateway::new();
        let intent = gateway
            .create_intent(create_request(Destination::SubAccount("acct_1".into())))
            .await
            .unwrap();

        let result = gateway
            .update_intent_amount(
                &intent.id,
                &Destination::Platform,
                Amount::new(3000).unwrap(),
                Currency::Eur,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(gateway.intent_amount(&intent.id), Some(2500));
    }

    #[tokio::test]
    async fn verify_webhook_requires_the_valid_signature() {
        let gateway = MockPaymentGateway::new();
        let payload =
            br#"{"intent_id":"pi_mock_1","amount_minor":2500,"currency":"eur"}"#.to_vec();

        assert!(gateway.verify_webhook(&payload, "nope").await.is_err());

        let verified = gateway.verify_webhook(&payload, "valid").await.unwrap();
        assert!(matches!(
            verified,
            WebhookPayload::Confirmation(PaymentConfirmation { ref currency, .. })
            if currency == "EUR"
        ));
    }

    #[tokio::test]
    async fn verify_webhook_passes_through_ignored_events() {
        let gateway = MockPaymentGateway::new();
        let payload = br#"{"intent_id":"pi_1","amount_minor":1,"currency":"usd","event":"refund.created"}"#.to_vec();

        let verified = gateway.verify_webhook(&payload, "valid").await.unwrap();
        assert!(matches!(verified, WebhookPayload::Ignored { .. }));
    }
}
