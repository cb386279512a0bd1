//! API handlers, one module per caller role

use axum::{
    extract::{Path, Query},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::error::ApiError;

pub mod admin;
pub mod delivery;
pub mod delivery_head;
pub mod shop;
pub mod user;

/// JSON body whose decode failures answer with the `ApiError` envelope
pub type ApiJson<T> = WithRejection<Json<T>, ApiError>;
pub type ApiPath<T> = WithRejection<Path<T>, ApiError>;
pub type ApiQuery<T> = WithRejection<Query<T>, ApiError>;
