//! Payment bounded context.
//!
//! Covers the life of a checkout attempt from intent creation through
//! provider confirmation and order materialization: the `PendingPayment`
//! aggregate, its status state machine, provider routing, tenant payment
//! profiles, and the domain error taxonomy.

mod errors;
mod pending_payment;
mod profile;
mod routing;
mod status;

pub use errors::PaymentFlowError;
pub use pending_payment::PendingPayment;
pub use profile::{CountryCode, RestaurantPaymentProfile};
pub use routing::{Destination, PaymentProvider, RoutingDecision};
pub use status::PaymentStatus;
