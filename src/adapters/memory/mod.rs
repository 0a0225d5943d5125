//! In-memory adapters.
//!
//! Back the ports with process-local state for tests and development.
//! The store honors the same conditional-update contract as the
//! PostgreSQL adapter, so pipeline behavior is identical under test.

mod payment_store;
mod restaurant_directory;

pub use payment_store::{InMemoryPaymentStore, MaterializedOrder};
pub use restaurant_directory::StaticRestaurantDirectory;
