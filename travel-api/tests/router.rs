use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde_json::Value;
use tempfile::NamedTempFile;
use tower::util::ServiceExt;
use travel_api::config::config_from_lookup;
use travel_api::{build_authenticator, router, AppState};
use travel_auth::Authenticator;

const KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";

struct TestApp {
    router: Router,
    state: AppState,
    _key_file: NamedTempFile,
}

impl TestApp {
    fn new() -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)?;
        let mut key_file = NamedTempFile::new()?;
        key_file.write_all(private_key.to_pkcs8_pem(LineEnding::LF)?.as_bytes())?;

        let path = key_file.path().display().to_string();
        let config = config_from_lookup(|key| match key {
            "AUTH_PRIVATE_KEY_FILE" => Some(path.clone()),
            "AUTH_KEY_ID" => Some(KID.to_string()),
            _ => None,
        })?;
        let state = AppState::new(build_authenticator(&config)?)?;

        Ok(Self {
            router: router(state.clone()),
            state,
            _key_file: key_file,
        })
    }

    fn authenticator(&self) -> Arc<Authenticator> {
        self.state.authenticator.clone()
    }

    fn token_for(&self, role: &str) -> Result<String> {
        let auth = self.authenticator();
        Ok(auth.issue(&auth.claims("u1", role, Duration::hours(1))?)?)
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<Response> {
        let mut request = Request::builder().uri(path);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(self
            .router
            .clone()
            .oneshot(request.body(Body::empty())?)
            .await?)
    }
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_and_jwks_are_public() -> Result<()> {
    let app = TestApp::new()?;

    let response = app.get("/v1/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await?.to_bytes();
    assert_eq!(&body[..], b"ok");

    for path in ["/v1/jwks", "/.well-known/jwks.json"] {
        let response = app.get(path, None).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let jwks = json_body(response).await?;
        assert_eq!(jwks["keys"][0]["kid"], KID);
        assert_eq!(jwks["keys"][0]["alg"], "RS256");
    }
    Ok(())
}

#[tokio::test]
async fn missing_header_is_unauthorized() -> Result<()> {
    let app = TestApp::new()?;
    let response = app.get("/v1/whoami", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["code"], "AUTH_HEADER");
    assert_eq!(
        app.state.metrics.verification_count("missing_authorization"),
        1
    );
    Ok(())
}

#[tokio::test]
async fn bad_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new()?;
    let response = app.get("/v1/whoami", Some("not.a.token")).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["code"], "AUTH_TOKEN");
    assert_eq!(app.state.metrics.verification_count("malformed"), 1);
    Ok(())
}

#[tokio::test]
async fn whoami_returns_verified_claims() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.token_for("MUTATE")?;

    let response = app.get("/v1/whoami", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["sub"], "u1");
    assert_eq!(body["iss"], "travel project");
    assert_eq!(body["Auth"]["ROLE"], "MUTATE");
    assert_eq!(app.state.metrics.verification_count("ok"), 1);
    Ok(())
}

#[tokio::test]
async fn roles_require_admin() -> Result<()> {
    let app = TestApp::new()?;

    let query = app.token_for("QUERY")?;
    let response = app.get("/v1/roles", Some(&query)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await?;
    assert_eq!(body["code"], "AUTH_ROLE");

    let admin = app.token_for("ADMIN")?;
    let response = app.get("/v1/roles", Some(&admin)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(
        body["roles"],
        serde_json::json!(["ADMIN", "EMAIL", "MUTATE", "QUERY"])
    );
    Ok(())
}

#[tokio::test]
async fn metrics_expose_verification_outcomes() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.token_for("QUERY")?;
    app.get("/v1/whoami", Some(&token)).await?;
    app.get("/v1/whoami", None).await?;

    let response = app.get("/metrics", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await?.to_bytes();
    let text = String::from_utf8(bytes.to_vec())?;
    assert!(text.contains("auth_token_verifications_total{outcome=\"ok\"} 1"));
    assert!(text.contains("auth_token_verifications_total{outcome=\"missing_authorization\"} 1"));
    Ok(())
}
