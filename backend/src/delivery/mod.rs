//! Delivery domain module
//!
//! Delivery agents, exclusive order assignment and OTP-confirmed drop-off.

mod model;
mod service;

pub use model::*;
pub use service::DeliveryService;
