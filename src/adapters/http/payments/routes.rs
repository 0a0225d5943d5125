//! Axum router configuration for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    adjust_amount, create_checkout, get_payment_status, handle_paytabs_webhook,
    handle_stripe_webhook, PaymentsAppState,
};

/// Create the payment API router.
///
/// # Routes
///
/// ## Client Endpoints
/// - `POST /checkout` - Open a checkout (creates the provider intent)
/// - `POST /{id}/amount` - Adjust the intended charge amount
/// - `GET /{id}/status` - Poll reconciliation state
pub fn payment_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/:id/amount", post(adjust_amount))
        .route("/:id/status", get(get_payment_status))
}

/// Create the webhook router.
///
/// Separate from the client routes because webhooks carry no user
/// session; they are authenticated by provider signature instead.
///
/// # Routes
/// - `POST /stripe` - Stripe webhook events
/// - `POST /paytabs` - PayTabs callback events
pub fn webhook_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/stripe", post(handle_stripe_webhook))
        .route("/paytabs", post(handle_paytabs_webhook))
}

/// Create the complete payment module router.
///
/// Suitable for mounting at `/api`:
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", payments_router())
///     .with_state(app_state);
/// ```
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::{InMemoryPaymentStore, StaticRestaurantDirectory};
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::ports::GatewayRegistry;

    fn test_state() -> PaymentsAppState {
        let store = Arc::new(InMemoryPaymentStore::new());
        PaymentsAppState {
            repository: store.clone(),
            materializer: store,
            restaurants: Arc::new(StaticRestaurantDirectory::empty()),
            gateways: GatewayRegistry::uniform(Arc::new(MockPaymentGateway::new())),
            checkout_ttl_minutes: 30,
        }
    }

    #[test]
    fn payment_routes_creates_router() {
        let router = payment_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let router = webhook_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn payments_router_creates_combined_router() {
        let router = payments_router();
        let _: Router<()> = router.with_state(test_state());
    }
}
