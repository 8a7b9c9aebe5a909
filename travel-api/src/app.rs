use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::routing::get;
use axum::Router;
use tracing::info;
use travel_auth::{
    parse_algorithm, AuthContext, AuthError, Authenticator, JwksFetcher, JwksKeyResolver,
    KeyFamily, KeyResolver, Role, SigningKey, StaticKeyResolver,
};

use crate::config::ApiConfig;
use crate::handlers::{health, jwks, list_roles, metrics_endpoint, whoami};
use crate::metrics::ApiMetrics;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(authenticator: Authenticator) -> Result<Self> {
        Ok(Self {
            authenticator: Arc::new(authenticator),
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }
}

impl FromRef<AppState> for Arc<Authenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}

/// Authenticated caller. Wraps [`AuthContext`] and counts every
/// verification outcome.
#[derive(Debug, Clone)]
pub struct Caller(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AuthError> {
        let result = AuthContext::from_request_parts(parts, state).await;
        state
            .metrics
            .record_verification(result.as_ref().map(|_| ()));
        result.map(Self)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/jwks", get(jwks))
        .route("/.well-known/jwks.json", get(jwks))
        .route("/v1/whoami", get(whoami))
        .route("/v1/roles", get(list_roles))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

/// Load the signing key named by `config` and assemble the authenticator,
/// backed by a JWKS endpoint when one is configured.
pub fn build_authenticator(config: &ApiConfig) -> Result<Authenticator> {
    let algorithm = parse_algorithm(&config.algorithm)?;
    let private_pem = fs::read(&config.private_key_file).with_context(|| {
        format!(
            "Failed to read private key {}",
            config.private_key_file.display()
        )
    })?;

    let signing_key = match KeyFamily::of(algorithm) {
        Some(KeyFamily::Rsa) => SigningKey::from_rsa_pem(&private_pem)?,
        Some(family) => {
            let path = config.public_key_file.as_ref().ok_or_else(|| {
                anyhow!("AUTH_PUBLIC_KEY_FILE must be set for {family} signing keys")
            })?;
            let public_pem = fs::read(path)
                .with_context(|| format!("Failed to read public key {}", path.display()))?;
            if family == KeyFamily::Ec {
                SigningKey::from_ec_pem(&private_pem, &public_pem)?
            } else {
                SigningKey::from_ed_pem(&private_pem, &public_pem)?
            }
        }
        None => return Err(anyhow!("Unsupported algorithm {}", config.algorithm)),
    };

    let resolver: Arc<dyn KeyResolver> = match &config.jwks {
        Some(settings) => {
            info!(url = %settings.url, "verifying tokens against remote JWKS");
            let fetcher = JwksFetcher::with_timeout(settings.url.clone(), settings.timeout)?;
            Arc::new(
                JwksKeyResolver::new(fetcher)
                    .with_min_refresh_interval(settings.min_refresh_interval),
            )
        }
        None => Arc::new(StaticKeyResolver::from_signing_key(
            config.key_id.clone(),
            &signing_key,
        )),
    };

    let authenticator = Authenticator::builder()
        .with_signing_key(signing_key)
        .with_key_id(config.key_id.clone())
        .with_algorithm(config.algorithm.clone())
        .with_resolver(resolver)
        .with_config(config.jwt.clone())
        .with_role_catalog(Role::catalog())
        .build()?;
    Ok(authenticator)
}
