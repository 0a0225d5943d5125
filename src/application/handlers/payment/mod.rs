//! Payment pipeline handlers.
//!
//! One handler per external operation: checkout creation, amount
//! adjustment, webhook reconciliation, status polling, and the expiry
//! sweep.

mod adjust_amount;
mod create_checkout;
mod expire_pending;
mod get_payment_status;
mod reconcile_payment;

pub use adjust_amount::{AdjustAmountCommand, AdjustAmountHandler};
pub use create_checkout::{CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult};
pub use expire_pending::ExpirePendingPaymentsHandler;
pub use get_payment_status::{
    GetPaymentStatusHandler, GetPaymentStatusQuery, PaymentStatusView,
};
pub use reconcile_payment::{ReconcileOutcome, ReconcilePaymentHandler};
