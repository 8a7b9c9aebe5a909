use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::claims::ClaimsViolation;
use crate::resolver::ResolveError;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures raised while constructing an authenticator, issuing a token or
/// verifying one.
///
/// Every per-token variant is terminal for the request that produced it; the
/// authenticator never hands back a partially validated claim set.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("invalid authenticator configuration: {0}")]
    Construction(String),
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("no usable public key for kid '{kid}'")]
    UnknownKey {
        kid: String,
        #[source]
        source: ResolveError,
    },
    #[error("token signature verification failed")]
    BadSignature,
    #[error("token claims rejected: {0}")]
    ClaimsInvalid(#[from] ClaimsViolation),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("failed to parse key material: {0}")]
    KeyParse(String),
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
}

impl AuthError {
    /// Stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Construction(_) => "construction",
            AuthError::MalformedToken(_) => "malformed",
            AuthError::UnknownKey { .. } => "unknown_key",
            AuthError::BadSignature => "bad_signature",
            AuthError::ClaimsInvalid(_) => "claims_invalid",
            AuthError::Signing(_) => "signing",
            AuthError::KeyParse(_) => "key_parse",
            AuthError::MissingAuthorization => "missing_authorization",
            AuthError::InvalidAuthorization => "invalid_authorization",
        }
    }

    /// True for failures caused by the presented credentials rather than by
    /// local configuration.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            AuthError::Construction(_) | AuthError::Signing(_) | AuthError::KeyParse(_)
        )
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::MissingAuthorization | AuthError::InvalidAuthorization => {
                (StatusCode::UNAUTHORIZED, "AUTH_HEADER")
            }
            AuthError::UnknownKey { .. } => (StatusCode::UNAUTHORIZED, "AUTH_KEY"),
            AuthError::MalformedToken(_) | AuthError::BadSignature => {
                (StatusCode::UNAUTHORIZED, "AUTH_TOKEN")
            }
            AuthError::ClaimsInvalid(_) => (StatusCode::UNAUTHORIZED, "AUTH_CLAIMS"),
            AuthError::Construction(_) | AuthError::Signing(_) | AuthError::KeyParse(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_CONFIG")
            }
        };

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AuthError::MalformedToken("missing kid".into());
        assert_eq!(err.to_string(), "malformed token: missing kid");

        let err = AuthError::ClaimsInvalid(ClaimsViolation::Expired);
        assert_eq!(err.to_string(), "token claims rejected: token expired");
    }

    #[test]
    fn unknown_key_preserves_resolver_source() {
        use std::error::Error;

        let err = AuthError::UnknownKey {
            kid: "k1".into(),
            source: ResolveError::NotFound { kid: "k1".into() },
        };
        let source = err.source().expect("source chain must be preserved");
        assert_eq!(source.to_string(), "no public key registered for kid 'k1'");
    }

    #[test]
    fn token_failures_map_to_unauthorized() {
        for err in [
            AuthError::MissingAuthorization,
            AuthError::MalformedToken("x".into()),
            AuthError::BadSignature,
            AuthError::ClaimsInvalid(ClaimsViolation::Audience),
            AuthError::UnknownKey {
                kid: "k".into(),
                source: ResolveError::Unavailable("timeout".into()),
            },
        ] {
            assert!(err.is_rejection());
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn configuration_failures_map_to_server_error() {
        let err = AuthError::Signing("boom".into());
        assert!(!err.is_rejection());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(AuthError::BadSignature.kind(), "bad_signature");
        assert_eq!(
            AuthError::ClaimsInvalid(ClaimsViolation::Expired).kind(),
            "claims_invalid"
        );
        assert_eq!(AuthError::MissingAuthorization.kind(), "missing_authorization");
    }
}
