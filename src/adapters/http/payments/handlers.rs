//! HTTP handlers for payment endpoints.
//!
//! These handlers connect axum routes to application layer command and
//! query handlers.
//!
//! # Webhook acknowledgement policy
//!
//! Classified rejections (`UnknownIntent`, `StaleConfirmation`,
//! `AmountMismatch`) are acknowledged with 200 so the provider stops
//! retrying an event that will never succeed; they are logged at error
//! level for manual reconciliation instead. Only signature failures
//! (400) and infrastructure failures (500, provider retries) are
//! surfaced.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::payment::{
    AdjustAmountCommand, AdjustAmountHandler, CreateCheckoutCommand, CreateCheckoutHandler,
    GetPaymentStatusHandler, GetPaymentStatusQuery, ReconcilePaymentHandler,
};
use crate::domain::foundation::{PendingPaymentId, RestaurantId};
use crate::domain::payment::{PaymentFlowError, PaymentProvider};
use crate::ports::{
    GatewayRegistry, OrderMaterializer, PendingPaymentRepository, RestaurantReader,
    WebhookPayload,
};

use super::dto::{
    AdjustAmountRequest, CheckoutResponse, CreateCheckoutRequest, ErrorResponse,
    PaymentStatusResponse, PaymentSummaryResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; dependencies are Arc-wrapped for cheap sharing.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub repository: Arc<dyn PendingPaymentRepository>,
    pub materializer: Arc<dyn OrderMaterializer>,
    pub restaurants: Arc<dyn RestaurantReader>,
    pub gateways: GatewayRegistry,
    pub checkout_ttl_minutes: i64,
}

impl PaymentsAppState {
    /// Create handlers on demand from the shared state.
    pub fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.repository.clone(),
            self.restaurants.clone(),
            self.gateways.clone(),
            self.checkout_ttl_minutes,
        )
    }

    pub fn adjust_amount_handler(&self) -> AdjustAmountHandler {
        AdjustAmountHandler::new(self.repository.clone(), self.gateways.clone())
    }

    pub fn status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.repository.clone())
    }

    pub fn reconcile_handler(&self) -> ReconcilePaymentHandler {
        ReconcilePaymentHandler::new(self.repository.clone(), self.materializer.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/checkout - Open a checkout
pub async fn create_checkout(
    State(state): State<PaymentsAppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let handler = state.create_checkout_handler();
    let cmd = CreateCheckoutCommand {
        restaurant_id: RestaurantId::from_uuid(request.restaurant_id),
        amount_minor: request.amount_minor,
        currency: request.currency,
    };

    let result = handler.handle(cmd).await?;

    let response = CheckoutResponse {
        pending_payment_id: result.payment.id.to_string(),
        provider_intent_id: result.payment.provider_intent_id.clone(),
        client_secret: result.client_secret,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/payments/{id}/amount - Adjust the intended charge amount
pub async fn adjust_amount(
    State(state): State<PaymentsAppState>,
    Path(id): Path<String>,
    Json(request): Json<AdjustAmountRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let pending_payment_id = PendingPaymentId::from_str(&id)
        .map_err(|_| PaymentFlowError::malformed_id(&id))?;

    let handler = state.adjust_amount_handler();
    let updated = handler
        .handle(AdjustAmountCommand {
            pending_payment_id,
            amount_minor: request.amount_minor,
        })
        .await?;

    Ok(Json(PaymentSummaryResponse::from(&updated)))
}

/// GET /api/payments/{id}/status - Poll reconciliation state
pub async fn get_payment_status(
    State(state): State<PaymentsAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let handler = state.status_handler();
    let view = handler
        .handle(GetPaymentStatusQuery {
            pending_payment_id: id,
        })
        .await?;

    Ok(Json(PaymentStatusResponse::from(view)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Stripe webhook events
pub async fn handle_stripe_webhook(
    State(state): State<PaymentsAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let signature = header_value(&headers, "Stripe-Signature")?;
    handle_webhook(&state, PaymentProvider::Stripe, &body, &signature).await
}

/// POST /api/webhooks/paytabs - PayTabs callback events
pub async fn handle_paytabs_webhook(
    State(state): State<PaymentsAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let signature = header_value(&headers, "Signature")?;
    handle_webhook(&state, PaymentProvider::PayTabs, &body, &signature).await
}

fn header_value(
    headers: &axum::http::HeaderMap,
    name: &'static str,
) -> Result<String, PaymentApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .ok_or_else(|| {
            PaymentApiError::from(PaymentFlowError::invalid_webhook_signature())
        })
}

async fn handle_webhook(
    state: &PaymentsAppState,
    provider: PaymentProvider,
    body: &[u8],
    signature: &str,
) -> Result<StatusCode, PaymentApiError> {
    // Verification is the trust boundary: nothing unverified reaches
    // the reconciler.
    let gateway = state.gateways.for_provider(provider);
    let payload = gateway
        .verify_webhook(body, signature)
        .await
        .map_err(PaymentFlowError::from)?;

    let confirmation = match payload {
        WebhookPayload::Confirmation(confirmation) => confirmation,
        WebhookPayload::Ignored { event_type } => {
            tracing::debug!(%provider, event_type, "Ignoring webhook event");
            return Ok(StatusCode::OK);
        }
    };

    match state.reconcile_handler().handle(confirmation).await {
        Ok(outcome) => {
            tracing::debug!(%provider, ?outcome, "Webhook reconciled");
            Ok(StatusCode::OK)
        }
        // Permanently-rejected events: acknowledge so the provider stops
        // retrying, alert for manual reconciliation.
        Err(
            err @ (PaymentFlowError::UnknownIntent(_)
            | PaymentFlowError::StaleConfirmation { .. }
            | PaymentFlowError::AmountMismatch { .. }),
        ) => {
            tracing::error!(%provider, error = %err, "Webhook rejected; needs manual reconciliation");
            Ok(StatusCode::OK)
        }
        // Transient failures surface as 5xx so the provider retries;
        // reconciliation is idempotent under redelivery.
        Err(err) => Err(err.into()),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError(PaymentFlowError);

impl From<PaymentFlowError> for PaymentApiError {
    fn from(err: PaymentFlowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            PaymentFlowError::NotFound(_) => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
            PaymentFlowError::RestaurantNotFound(_) => {
                (StatusCode::NOT_FOUND, "RESTAURANT_NOT_FOUND")
            }
            PaymentFlowError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            PaymentFlowError::UnsupportedCurrency(_) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_CURRENCY")
            }
            PaymentFlowError::MalformedId(_) => (StatusCode::BAD_REQUEST, "MALFORMED_ID"),
            PaymentFlowError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
            PaymentFlowError::UnknownIntent(_) => (StatusCode::CONFLICT, "UNKNOWN_INTENT"),
            PaymentFlowError::StaleConfirmation { .. } => {
                (StatusCode::CONFLICT, "STALE_CONFIRMATION")
            }
            PaymentFlowError::AmountMismatch { .. } => {
                (StatusCode::CONFLICT, "AMOUNT_MISMATCH")
            }
            PaymentFlowError::InvalidWebhookSignature => {
                (StatusCode::BAD_REQUEST, "INVALID_WEBHOOK_SIGNATURE")
            }
            PaymentFlowError::GatewayFailed { .. } => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            PaymentFlowError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse::new(error_code, self.0.message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPaymentStore, StaticRestaurantDirectory};
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::domain::foundation::{Amount, Currency, Timestamp};
    use crate::domain::payment::{
        Destination, PendingPayment, RestaurantPaymentProfile, RoutingDecision,
    };

    fn seeded_state(
        profiles: Vec<RestaurantPaymentProfile>,
    ) -> (PaymentsAppState, Arc<InMemoryPaymentStore>, Arc<MockPaymentGateway>) {
        let store = Arc::new(InMemoryPaymentStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let state = PaymentsAppState {
            repository: store.clone(),
            materializer: store.clone(),
            restaurants: Arc::new(StaticRestaurantDirectory::new(profiles)),
            gateways: GatewayRegistry::uniform(gateway.clone()),
            checkout_ttl_minutes: 30,
        };
        (state, store, gateway)
    }

    fn seed_payment() -> PendingPayment {
        PendingPayment::open(
            RestaurantId::new(),
            "pi_mock_http".to_string(),
            Amount::new(2500).unwrap(),
            Currency::Eur,
            RoutingDecision {
                provider: PaymentProvider::Stripe,
                destination: Destination::Platform,
            },
            30,
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn webhook_acknowledges_unknown_intent_with_200() {
        let (state, store, _gateway) = seeded_state(vec![]);
        let _ = store; // no rows: every intent is unknown

        let body =
            br#"{"intent_id":"pi_never","amount_minor":2500,"currency":"EUR"}"#.to_vec();
        let status = handle_webhook(&state, PaymentProvider::Stripe, &body, "valid")
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_acknowledges_amount_mismatch_without_creating_order() {
        let (state, store, _gateway) = seeded_state(vec![]);
        let payment = seed_payment();
        store.insert(&payment).await.unwrap();

        let body = serde_json::to_vec(&serde_json::json!({
            "intent_id": payment.provider_intent_id,
            "amount_minor": 2400,
            "currency": "EUR",
        }))
        .unwrap();

        let status = handle_webhook(&state, PaymentProvider::Stripe, &body, "valid")
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn webhook_rejects_invalid_signature() {
        let (state, _store, _gateway) = seeded_state(vec![]);

        let body = br#"{"intent_id":"pi_x","amount_minor":1,"currency":"EUR"}"#.to_vec();
        let result = handle_webhook(&state, PaymentProvider::Stripe, &body, "forged").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn webhook_reconciles_matching_confirmation() {
        let (state, store, _gateway) = seeded_state(vec![]);
        let payment = seed_payment();
        store.insert(&payment).await.unwrap();

        let body = serde_json::to_vec(&serde_json::json!({
            "intent_id": payment.provider_intent_id,
            "amount_minor": 2500,
            "currency": "EUR",
        }))
        .unwrap();

        let status = handle_webhook(&state, PaymentProvider::Stripe, &body, "valid")
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn webhook_acknowledges_ignored_events_without_touching_the_store() {
        let (state, store, _gateway) = seeded_state(vec![]);
        let payment = seed_payment();
        store.insert(&payment).await.unwrap();

        let body = serde_json::to_vec(&serde_json::json!({
            "intent_id": payment.provider_intent_id,
            "amount_minor": 2500,
            "currency": "EUR",
            "event": "refund.created",
        }))
        .unwrap();

        let status = handle_webhook(&state, PaymentProvider::Stripe, &body, "valid")
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.order_count().await, 0);
    }
}
