//! Middleware for the order API
//!
//! Request tracing and the role-checking authentication extractors.

pub mod auth;
mod tracing;

pub use auth::{
    authenticate_token, AdminUser, AuthenticatedUser, CustomerUser, DeliveryHeadUser, DeliveryUser,
    ShopUser,
};
pub use tracing::{request_tracing, REQUEST_ID_HEADER};
