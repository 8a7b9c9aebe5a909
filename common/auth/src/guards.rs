use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::roles::Role;
use crate::AuthContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    Forbidden { required: Vec<Role> },
}

impl GuardError {
    pub fn message(&self) -> String {
        match self {
            GuardError::Forbidden { required } if required.is_empty() => {
                "Insufficient role".to_string()
            }
            GuardError::Forbidden { required } => {
                let names: Vec<&str> = required.iter().map(Role::as_str).collect();
                format!("Insufficient role. Required one of: {}", names.join(", "))
            }
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "code": "AUTH_ROLE", "message": self.message() }));
        (StatusCode::FORBIDDEN, body).into_response()
    }
}

/// Admit the caller when its role is one of `allowed`. An empty list admits
/// every authenticated caller.
pub fn ensure_role(auth: &AuthContext, allowed: &[Role]) -> Result<(), GuardError> {
    if allowed.is_empty() || auth.has_role(allowed) {
        return Ok(());
    }
    Err(GuardError::Forbidden {
        required: allowed.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::ClaimSet;
    use chrono::{Duration, Utc};

    fn context(role: &str) -> AuthContext {
        let now = Utc::now();
        let claims = ClaimSet::new(
            "travel project",
            "u1",
            ["students"],
            role,
            now,
            now + Duration::hours(1),
        )
        .expect("claims");
        AuthContext {
            claims,
            token: "t".into(),
        }
    }

    #[test]
    fn matching_role_passes() {
        let auth = context("MUTATE");
        assert!(ensure_role(&auth, &[Role::Admin, Role::Mutate]).is_ok());
    }

    #[test]
    fn empty_allow_list_passes() {
        assert!(ensure_role(&context("QUERY"), &[]).is_ok());
    }

    #[test]
    fn other_role_is_forbidden() {
        let err = ensure_role(&context("QUERY"), &[Role::Admin]).expect_err("forbidden");
        assert_eq!(
            err,
            GuardError::Forbidden {
                required: vec![Role::Admin]
            }
        );
        assert_eq!(err.message(), "Insufficient role. Required one of: ADMIN");
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}
