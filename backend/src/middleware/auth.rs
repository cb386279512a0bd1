//! Authentication extractors
//!
//! Verify the bearer token and expose the caller as a typed identity. Role
//! extractors reject callers whose token carries a different role.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{verify_token, AuthKeys, JwtError};
use crate::models::UserRole;

/// Caller identity extracted from a verified token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthError {
    #[serde(skip)]
    status: StatusCode,
    error: AuthErrorDetails,
}

#[derive(Debug, Serialize)]
struct AuthErrorDetails {
    code: String,
    message: String,
}

impl AuthError {
    fn unauthorized(code: &str, message: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, code, message)
    }

    fn forbidden(message: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    fn with_status(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            error: AuthErrorDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Resolve a raw bearer token into the caller identity.
///
/// Shared by the header extractors and the realtime feed, which also accepts
/// the token as a query parameter.
pub fn authenticate_token(
    token: Option<&str>,
    keys: &AuthKeys,
) -> Result<AuthenticatedUser, Response> {
    let token = token.ok_or_else(|| {
        AuthError::unauthorized("MISSING_TOKEN", "Bearer token required").into_response()
    })?;

    let claims = verify_token(token, keys.jwt_secret()).map_err(|e| {
        let (code, message) = match e {
            JwtError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
            _ => ("INVALID_TOKEN", "Invalid token"),
        };
        AuthError::unauthorized(code, message).into_response()
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        AuthError::unauthorized("INVALID_TOKEN", "Invalid subject in token").into_response()
    })?;

    let role = UserRole::parse(&claims.role).ok_or_else(|| {
        AuthError::unauthorized("INVALID_TOKEN", "Invalid role in token").into_response()
    })?;

    Ok(AuthenticatedUser { user_id, role })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthError::unauthorized(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                    .into_response()
                })?;

        let keys = Arc::<AuthKeys>::from_ref(state);
        authenticate_token(Some(bearer.token()), &keys)
    }
}

async fn require_role<S>(
    parts: &mut Parts,
    state: &S,
    role: UserRole,
    message: &str,
) -> Result<AuthenticatedUser, Response>
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    let user = AuthenticatedUser::from_request_parts(parts, state).await?;
    if user.role != role {
        tracing::debug!(user_id = %user.user_id, role = %user.role, required = %role, "Role check failed");
        return Err(AuthError::forbidden(message).into_response());
    }
    Ok(user)
}

/// Ordering customer
pub struct CustomerUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for CustomerUser
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::User, "Customer access required")
            .await
            .map(CustomerUser)
    }
}

/// Shop owner; `user_id` is the shop id
pub struct ShopUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for ShopUser
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Shop, "Shop access required")
            .await
            .map(ShopUser)
    }
}

/// Delivery agent; `user_id` is the agent id
pub struct DeliveryUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for DeliveryUser
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Delivery, "Delivery agent access required")
            .await
            .map(DeliveryUser)
    }
}

pub struct DeliveryHeadUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for DeliveryHeadUser
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::DeliveryHead, "Delivery head access required")
            .await
            .map(DeliveryHeadUser)
    }
}

pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Admin, "Admin access required")
            .await
            .map(AdminUser)
    }
}
