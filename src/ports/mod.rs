//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Ledger Ports
//!
//! - `PendingPaymentRepository` - pending payment storage with
//!   conditional-update primitives (the per-intent serialization point)
//! - `OrderMaterializer` - atomic order creation + completion stamp
//!
//! ## Collaborator Ports
//!
//! - `PaymentGateway` - provider intent lifecycle and webhook verification
//! - `RestaurantReader` - tenant payment profiles written by onboarding

mod order_materializer;
mod payment_gateway;
mod pending_payment_repository;
mod restaurant_reader;

pub use order_materializer::{MaterializeOutcome, OrderMaterializer, OrderReceipt};
pub use payment_gateway::{
    CreateIntentRequest, GatewayError, GatewayErrorCode, GatewayRegistry, PaymentConfirmation,
    PaymentGateway, ProviderIntent, WebhookPayload,
};
pub use pending_payment_repository::{ConditionalUpdate, PendingPaymentRepository};
pub use restaurant_reader::RestaurantReader;
