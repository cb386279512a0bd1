//! Bearer token verification
//!
//! Tokens are issued by the marketplace auth service; this service only
//! verifies them with the shared HS256 secret from configuration.

mod jwt;

pub use jwt::{generate_access_token, verify_token, Claims, JwtError};

/// Verification key material shared with request extractors
#[derive(Clone)]
pub struct AuthKeys {
    jwt_secret: String,
}

impl AuthKeys {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
}
