//! CreateCheckoutHandler - Command handler for opening a checkout.
//!
//! Routes the charge, creates the provider intent, and records the
//! pending payment. The routing decision is frozen into the row here
//! and never recomputed afterwards.

use std::sync::Arc;

use crate::domain::foundation::{Amount, Currency, RestaurantId, Timestamp};
use crate::domain::payment::{PaymentFlowError, PendingPayment, RoutingDecision};
use crate::ports::{
    CreateIntentRequest, GatewayRegistry, PendingPaymentRepository, RestaurantReader,
};

/// Command to open a checkout.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub restaurant_id: RestaurantId,
    pub amount_minor: i64,
    pub currency: String,
}

/// Result of a successful checkout creation.
#[derive(Debug, Clone)]
pub struct CreateCheckoutResult {
    pub payment: PendingPayment,

    /// Secret the client uses to drive the provider's payment UI.
    pub client_secret: String,
}

/// Handler for opening checkouts.
pub struct CreateCheckoutHandler {
    repository: Arc<dyn PendingPaymentRepository>,
    restaurants: Arc<dyn RestaurantReader>,
    gateways: GatewayRegistry,
    checkout_ttl_minutes: i64,
}

impl CreateCheckoutHandler {
    pub fn new(
        repository: Arc<dyn PendingPaymentRepository>,
        restaurants: Arc<dyn RestaurantReader>,
        gateways: GatewayRegistry,
        checkout_ttl_minutes: i64,
    ) -> Self {
        Self {
            repository,
            restaurants,
            gateways,
            checkout_ttl_minutes,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, PaymentFlowError> {
        // 1. Validate inputs before touching any collaborator
        let amount = Amount::new(cmd.amount_minor)
            .map_err(|_| PaymentFlowError::invalid_amount(cmd.amount_minor))?;
        let currency: Currency = cmd
            .currency
            .parse()
            .map_err(|_| PaymentFlowError::unsupported_currency(&cmd.currency))?;

        // 2. Route the charge from the tenant's onboarding state
        let profile = self
            .restaurants
            .payment_profile(&cmd.restaurant_id)
            .await?
            .ok_or_else(|| PaymentFlowError::restaurant_not_found(cmd.restaurant_id))?;
        let routing = RoutingDecision::route(&profile);

        // 3. Create the provider intent against the routed destination
        let gateway = self.gateways.for_provider(routing.provider);
        let intent = gateway
            .create_intent(CreateIntentRequest {
                restaurant_id: cmd.restaurant_id,
                amount,
                currency,
                destination: routing.destination.clone(),
            })
            .await?;

        // 4. Record the pending payment. If the insert fails the intent
        //    must not outlive it: cancel before surfacing the error so
        //    neither side holds a reference the other lacks.
        let payment = PendingPayment::open(
            cmd.restaurant_id,
            intent.id.clone(),
            amount,
            currency,
            routing.clone(),
            self.checkout_ttl_minutes,
            Timestamp::now(),
        );

        if let Err(err) = self.repository.insert(&payment).await {
            if let Err(cancel_err) = gateway
                .cancel_intent(&intent.id, &routing.destination)
                .await
            {
                tracing::warn!(
                    provider_intent_id = %intent.id,
                    error = %cancel_err,
                    "Failed to cancel provider intent after ledger insert failure"
                );
            }
            return Err(err.into());
        }

        tracing::info!(
            pending_payment_id = %payment.id,
            provider_intent_id = %payment.provider_intent_id,
            provider = %payment.routing.provider,
            "Checkout opened"
        );

        Ok(CreateCheckoutResult {
            payment,
            client_secret: intent.client_secret,
        })
    }
}
