//! Request extractors: resolving the bearer credential to an
//! authenticated user, and route-level role gates.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use identity::AuthUser;
use model::Role;

use crate::{AppState, error::ApiError};

/// The authenticated caller, extracted from the `Authorization` header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub AuthUser);

impl CurrentUser {
    /// Route-level role gate; services still apply their own ownership
    /// checks on top.
    pub fn require_role(self, allowed: &[Role]) -> Result<AuthUser, ApiError> {
        if allowed.contains(&self.0.role) {
            Ok(self.0)
        } else {
            Err(ApiError::Forbidden("access denied".into()))
        }
    }

    pub fn into_inner(self) -> AuthUser {
        self.0
    }
}

/// Strip the `Bearer` scheme from an Authorization header value.
pub(crate) fn bearer_token(header_value: &str) -> &str {
    header_value
        .strip_prefix("Bearer ")
        .unwrap_or(header_value)
        .trim()
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("token not provided".into()))?;

        let auth = state
            .verifier
            .authenticate(bearer_token(header_value))
            .map_err(|err| ApiError::Unauthenticated(err.to_string()))?;

        Ok(CurrentUser(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_strips_scheme() {
        assert_eq!(bearer_token("Bearer abc.def.123"), "abc.def.123");
        assert_eq!(bearer_token("abc.def.123"), "abc.def.123");
        assert_eq!(bearer_token("Bearer  abc "), "abc");
    }

    #[test]
    fn test_require_role() {
        let user = CurrentUser(AuthUser {
            user_id: uuid::Uuid::new_v4(),
            role: Role::Customer,
        });
        assert!(user.require_role(&[Role::Customer, Role::Admin]).is_ok());
        assert!(user.require_role(&[Role::Owner]).is_err());
    }
}
