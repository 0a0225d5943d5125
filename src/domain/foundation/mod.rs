//! Foundation - shared kernel for the payment domain.
//!
//! Value objects, typed identifiers, error types, and the state machine
//! trait used by every bounded context in the crate.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OrderId, OrderNumber, PendingPaymentId, RestaurantId};
pub use money::{Amount, Currency};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
