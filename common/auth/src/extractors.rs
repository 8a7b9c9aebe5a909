use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderValue};

use crate::authenticator::Authenticator;
use crate::claims::ClaimSet;
use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Verified caller identity, extracted from an `Authorization: Bearer` header
/// by the [`Authenticator`] held in router state.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: ClaimSet,
    pub token: String,
}

impl AuthContext {
    pub fn subject(&self) -> &str {
        self.claims.subject()
    }

    pub fn role(&self) -> &str {
        self.claims.role()
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        self.claims.has_role(allowed)
    }

    pub fn into_claims(self) -> ClaimSet {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<Authenticator>::from_ref(state);

        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;

        let token = parse_bearer(header_value)?;
        let claims = authenticator.verify(&token).await?;

        Ok(Self { claims, token })
    }
}

/// Token carried by a bearer authorization value. The scheme is matched
/// case-insensitively.
pub fn parse_bearer(value: &HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?
        .trim();

    let (scheme, token) = raw
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthorization)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthorization);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_accepts_valid_token() {
        let header = HeaderValue::from_static("Bearer abc.def.ghi");
        let token = parse_bearer(&header).expect("token");
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn parse_bearer_ignores_scheme_case() {
        let header = HeaderValue::from_static("bearer abc.def.ghi");
        assert_eq!(parse_bearer(&header).expect("token"), "abc.def.ghi");
    }

    #[test]
    fn parse_bearer_rejects_wrong_scheme() {
        let header = HeaderValue::from_static("Basic credentials");
        let err = parse_bearer(&header).expect_err("should reject");
        assert!(matches!(err, AuthError::InvalidAuthorization));
    }

    #[test]
    fn parse_bearer_rejects_empty_value() {
        let header = HeaderValue::from_static("Bearer    ");
        let err = parse_bearer(&header).expect_err("should reject empty token");
        assert!(matches!(err, AuthError::InvalidAuthorization));

        let header = HeaderValue::from_static("Bearer");
        assert!(parse_bearer(&header).is_err());
    }
}
