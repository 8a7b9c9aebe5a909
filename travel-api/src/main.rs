use anyhow::{Context, Result};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;
use travel_api::{build_authenticator, load_api_config, router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_api_config().context("Failed to load travel-api configuration")?;
    let authenticator =
        build_authenticator(&config).context("Failed to construct token authenticator")?;
    info!(
        kid = authenticator.key_id(),
        algorithm = ?authenticator.algorithm(),
        issuer = %config.jwt.issuer,
        "token authenticator ready"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let app = router(AppState::new(authenticator)?).layer(cors);

    let addr = config.socket_addr()?;
    info!(%addr, "starting travel-api");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
