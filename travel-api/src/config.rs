use std::collections::BTreeSet;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use travel_auth::jwks::DEFAULT_JWKS_TIMEOUT;
use travel_auth::resolver::DEFAULT_MIN_REFRESH_INTERVAL;
use travel_auth::{JwtConfig, DEFAULT_AUDIENCE, DEFAULT_ISSUER};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8086;
const DEFAULT_ALGORITHM: &str = "RS256";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub private_key_file: PathBuf,
    /// Public key PEM, required for EC and Ed25519 algorithms.
    pub public_key_file: Option<PathBuf>,
    pub key_id: String,
    pub algorithm: String,
    pub jwt: JwtConfig,
    pub jwks: Option<JwksSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwksSettings {
    pub url: String,
    pub min_refresh_interval: Duration,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid HOST '{}'", self.host))?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

pub fn load_api_config() -> Result<ApiConfig> {
    config_from_lookup(|key| env::var(key).ok())
}

/// Build the config from an arbitrary variable source.
pub fn config_from_lookup<F>(lookup: F) -> Result<ApiConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

    let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = var("PORT")
        .map(|value| value.parse::<u16>())
        .transpose()
        .context("Failed to parse PORT")?
        .unwrap_or(DEFAULT_PORT);

    let private_key_file = var("AUTH_PRIVATE_KEY_FILE")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("AUTH_PRIVATE_KEY_FILE must be set"))?;
    let public_key_file = var("AUTH_PUBLIC_KEY_FILE").map(PathBuf::from);
    let key_id = var("AUTH_KEY_ID").ok_or_else(|| anyhow!("AUTH_KEY_ID must be set"))?;
    let algorithm = var("AUTH_ALGORITHM").unwrap_or_else(|| DEFAULT_ALGORITHM.to_string());

    let issuer = var("AUTH_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
    let audience = var("AUTH_AUDIENCE")
        .map(|value| parse_list(&value))
        .unwrap_or_else(|| BTreeSet::from([DEFAULT_AUDIENCE.to_string()]));
    let leeway = var("AUTH_LEEWAY_SECONDS")
        .map(|value| value.parse::<u32>())
        .transpose()
        .context("Failed to parse AUTH_LEEWAY_SECONDS")?
        .unwrap_or(0);
    let jwt = JwtConfig::new(issuer, DEFAULT_AUDIENCE)
        .with_audience(audience)
        .with_leeway(leeway);

    let jwks = match var("AUTH_JWKS_URL") {
        Some(url) => Some(JwksSettings {
            url,
            min_refresh_interval: seconds_from(
                &var,
                "AUTH_JWKS_MIN_REFRESH_SECONDS",
                DEFAULT_MIN_REFRESH_INTERVAL,
            )?,
            timeout: seconds_from(&var, "AUTH_JWKS_TIMEOUT_SECONDS", DEFAULT_JWKS_TIMEOUT)?,
        }),
        None => None,
    };

    Ok(ApiConfig {
        host,
        port,
        private_key_file,
        public_key_file,
        key_id,
        algorithm,
        jwt,
        jwks,
    })
}

fn seconds_from<F>(var: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(var(key)
        .map(|value| value.parse::<u64>())
        .transpose()
        .with_context(|| format!("Failed to parse {key}"))?
        .map(Duration::from_secs)
        .unwrap_or(default))
}

fn parse_list(value: &str) -> BTreeSet<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
