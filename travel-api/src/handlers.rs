use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use travel_auth::{ensure_role, ClaimSet, GuardError, JwkSet, Role};

use crate::app::{AppState, Caller};

pub async fn health() -> &'static str {
    "ok"
}

pub async fn jwks(State(state): State<AppState>) -> Json<JwkSet> {
    Json(state.authenticator.public_jwks())
}

/// The caller's verified claims, in token wire layout.
pub async fn whoami(Caller(auth): Caller) -> Json<ClaimSet> {
    Json(auth.into_claims())
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub roles: Vec<String>,
}

pub async fn list_roles(
    State(state): State<AppState>,
    Caller(auth): Caller,
) -> Result<Json<RolesResponse>, GuardError> {
    ensure_role(&auth, &[Role::Admin])?;
    let roles = state
        .authenticator
        .role_catalog()
        .iter()
        .map(str::to_string)
        .collect();
    Ok(Json(RolesResponse { roles }))
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Unable to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
