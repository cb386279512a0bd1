//! Order domain module
//!
//! Owns the order status state machine, creation with variant inventory
//! reservation, delivery secrets and the shared persistence helpers used by
//! the delivery and settlement services.

mod error;
pub mod inventory;
mod model;
pub mod secret;
mod service;
mod status;
pub mod store;
mod workflow;

pub use error::OrderError;
pub use model::*;
pub use secret::DeliverySecret;
pub use service::OrderService;
pub use status::OrderStatus;
pub use workflow::WorkflowSettings;
