pub mod migrate;
pub mod plans;
pub mod subscriptions;
pub mod usage;
