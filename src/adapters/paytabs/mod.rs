//! PayTabs adapter - regional hosted-page provider.

mod gateway;

pub use gateway::{PayTabsConfig, PayTabsGateway};
