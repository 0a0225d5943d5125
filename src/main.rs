//! Sufra payment service binary.
//!
//! Wires the PostgreSQL store, the provider gateways, and the HTTP
//! surface together, and runs the background expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sufra::adapters::http::payments::{payments_router, PaymentsAppState};
use sufra::adapters::paytabs::{PayTabsConfig, PayTabsGateway};
use sufra::adapters::postgres::{PostgresPaymentStore, PostgresRestaurantReader};
use sufra::adapters::stripe::{StripeConfig, StripeGateway};
use sufra::application::handlers::payment::ExpirePendingPaymentsHandler;
use sufra::config::AppConfig;
use sufra::ports::GatewayRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.server.log_level.clone()))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let store = Arc::new(PostgresPaymentStore::new(pool.clone()));
    let restaurants = Arc::new(PostgresRestaurantReader::new(pool));

    let stripe = Arc::new(StripeGateway::new(
        StripeConfig::new(
            config.payment.stripe_api_key.clone(),
            config.payment.stripe_webhook_secret.clone(),
        )
        .with_require_livemode(config.is_production()),
    ));
    let paytabs = Arc::new(PayTabsGateway::new(PayTabsConfig::new(
        config.payment.paytabs_profile_id.clone(),
        config.payment.paytabs_server_key.clone(),
    )));
    let gateways = GatewayRegistry::new(stripe, paytabs);

    let state = PaymentsAppState {
        repository: store.clone(),
        materializer: store.clone(),
        restaurants,
        gateways,
        checkout_ttl_minutes: config.payment.checkout_ttl_minutes,
    };

    // Expiry sweep: the only writer of terminal states besides the
    // reconciler. Status polls stay read-only.
    let sweep = ExpirePendingPaymentsHandler::new(store, config.payment.sweep_batch_size);
    let sweep_interval = Duration::from_secs(config.payment.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = sweep.handle().await {
                tracing::warn!(error = %err, "Expiry sweep failed");
            }
        }
    });

    let app = Router::new()
        .nest("/api", payments_router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                ))),
        );

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "Sufra payment service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
