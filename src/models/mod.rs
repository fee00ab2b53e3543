pub mod message;
pub mod post;
pub mod reddit;
pub mod status;
