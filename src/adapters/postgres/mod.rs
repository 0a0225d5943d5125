//! PostgreSQL adapters.

mod payment_store;
mod restaurant_reader;

pub use payment_store::PostgresPaymentStore;
pub use restaurant_reader::PostgresRestaurantReader;
