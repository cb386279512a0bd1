//! Shared API models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace roles carried in bearer tokens
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Ordering customer
    User,
    Shop,
    /// Delivery agent
    Delivery,
    DeliveryHead,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Shop => "shop",
            UserRole::Delivery => "delivery",
            UserRole::DeliveryHead => "delivery_head",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "shop" => Some(UserRole::Shop),
            "delivery" => Some(UserRole::Delivery),
            "delivery_head" => Some(UserRole::DeliveryHead),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
