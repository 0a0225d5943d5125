//! Payment HTTP endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    AdjustAmountRequest, CheckoutResponse, CreateCheckoutRequest, ErrorResponse,
    PaymentStatusResponse, PaymentSummaryResponse,
};
pub use handlers::{PaymentApiError, PaymentsAppState};
pub use routes::{payment_routes, payments_router, webhook_routes};
