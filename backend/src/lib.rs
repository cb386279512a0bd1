//! Marketplace order workflow backend
//!
//! Order lifecycle, delivery assignment and OTP-confirmed hand-off behind a
//! role-guarded REST API.

pub mod auth;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod order;
pub mod routes;
pub mod settlement;
pub mod state;
pub mod websocket;
