pub mod pubsub;
pub mod reddit;
