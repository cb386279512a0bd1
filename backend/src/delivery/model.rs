//! Delivery agent models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::order::{Order, OrderError};

/// Delivery agent ("delivery boy")
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAgent {
    pub id: Uuid,
    /// Human-facing unique id, e.g. "DB001"
    pub external_id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Eligible for a new assignment
    pub is_available: bool,
    /// Soft-delete flag
    pub is_active: bool,
    /// Every order ever assigned, oldest first
    pub assigned_orders: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryAgent {
    /// Fails unless the agent may take a new order
    pub fn ensure_assignable(&self) -> Result<(), OrderError> {
        if !self.is_active {
            return Err(OrderError::Conflict(format!(
                "Delivery agent {} is not active",
                self.external_id
            )));
        }
        if !self.is_available {
            return Err(OrderError::Conflict(format!(
                "Delivery agent {} is not available",
                self.external_id
            )));
        }
        Ok(())
    }
}

/// Request DTO for registering a delivery agent
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAgentRequest {
    #[validate(length(min = 1, max = 32, message = "External id must be 1-32 characters"))]
    pub external_id: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 5, max = 20, message = "Phone number is invalid"))]
    pub phone: Option<String>,
}

/// Request DTO for a delivery head assignment
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOrderRequest {
    pub order_id: Uuid,
    pub boy_id: Uuid,
}

/// Request DTO for drop-off confirmation
#[derive(Debug, Deserialize)]
pub struct ConfirmDeliveryRequest {
    #[serde(default)]
    pub otp: Option<String>,
}

impl ConfirmDeliveryRequest {
    /// The submitted code, or a validation error if it is missing
    pub fn code(&self) -> Result<&str, OrderError> {
        match self.otp.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(OrderError::Validation("OTP is required".to_string())),
        }
    }
}

/// Response DTO for an assignment
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub order: Order,
    pub delivery_boy: DeliveryAgent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(is_active: bool, is_available: bool) -> DeliveryAgent {
        DeliveryAgent {
            id: Uuid::new_v4(),
            external_id: "DB001".to_string(),
            name: "Ravi".to_string(),
            phone: None,
            is_available,
            is_active,
            assigned_orders: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ensure_assignable() {
        assert!(agent(true, true).ensure_assignable().is_ok());
        assert!(matches!(
            agent(true, false).ensure_assignable(),
            Err(OrderError::Conflict(_))
        ));
        assert!(matches!(
            agent(false, true).ensure_assignable(),
            Err(OrderError::Conflict(_))
        ));
    }

    #[test]
    fn test_confirm_request_requires_code() {
        let missing = ConfirmDeliveryRequest { otp: None };
        assert!(matches!(missing.code(), Err(OrderError::Validation(_))));

        let blank = ConfirmDeliveryRequest {
            otp: Some("  ".to_string()),
        };
        assert!(matches!(blank.code(), Err(OrderError::Validation(_))));

        let given = ConfirmDeliveryRequest {
            otp: Some(" 123456".to_string()),
        };
        assert_eq!(given.code().unwrap(), "123456");
    }

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterAgentRequest {
            external_id: "DB001".to_string(),
            name: "Ravi".to_string(),
            phone: None,
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterAgentRequest {
            external_id: String::new(),
            name: "Ravi".to_string(),
            phone: Some("12".to_string()),
        };
        assert!(bad.validate().is_err());
    }
}
