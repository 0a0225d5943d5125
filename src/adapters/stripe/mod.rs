//! Stripe adapter - primary card provider.

mod gateway;
mod mock_gateway;
mod webhook_types;

pub use gateway::{StripeConfig, StripeGateway};
pub use mock_gateway::{MockPaymentGateway, RecordedIntent};
pub use webhook_types::{hex_encode, SignatureHeader, SignatureParseError};
