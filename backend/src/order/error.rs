//! Order workflow errors

use thiserror::Error;

/// Failure of an order workflow operation.
///
/// Guard failures are never retried; each variant carries the reason shown
/// to the caller.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("{0}")]
    NotFound(String),

    /// Wrong current status, already assigned, already settled or a stale
    /// version write.
    #[error("{0}")]
    Conflict(String),

    /// Caller does not own or control the resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    /// Delivery OTP / QR token past its validity window.
    #[error("{0}")]
    Expired(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OrderError {
    pub fn order_not_found(id: uuid::Uuid) -> Self {
        OrderError::NotFound(format!("Order {} not found", id))
    }
}

impl From<validator::ValidationErrors> for OrderError {
    fn from(err: validator::ValidationErrors) -> Self {
        OrderError::Validation(err.to_string())
    }
}
