//! Caller identity extracted from request headers.
//!
//! The session layer in front of this service authenticates the caller and
//! forwards the account as headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::{Identity, Role, UserId};

use crate::error::ApiError;

/// Header carrying the authenticated account's user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated account's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor for the authenticated caller. Rejects with 401 when the user ID
/// header is missing or not a positive integer.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(UserId::new)
            .filter(UserId::is_valid)
            .ok_or(ApiError::Unauthorized)?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(Role::parse)
            .unwrap_or_default();

        let identity = Identity::new(user_id, role);
        tracing::debug!(%user_id, role = identity.role().as_str(), "authenticated caller");
        Ok(Self(identity))
    }
}
