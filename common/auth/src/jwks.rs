use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::algorithm::FORBIDDEN_ALGORITHMS;
use crate::error::{AuthError, AuthResult};
use crate::keys::RsaComponents;
use crate::resolver::ResolveError;

/// Default upper bound for a single JWKS request.
pub const DEFAULT_JWKS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// A single JSON Web Key. Only the members needed for RSA, EC and OKP
/// signature keys are modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl Jwk {
    pub fn rsa(kid: &str, algorithm: Algorithm, components: &RsaComponents) -> Self {
        Self {
            kid: Some(kid.to_string()),
            kty: Some("RSA".to_string()),
            use_: Some("sig".to_string()),
            alg: Some(format!("{algorithm:?}")),
            n: Some(components.n.clone()),
            e: Some(components.e.clone()),
            ..Self::default()
        }
    }

    /// Decode the public key. The `alg` member is only screened against the
    /// forbidden list; the verifying algorithm is never taken from it.
    pub fn decoding_key(&self) -> Result<(String, DecodingKey), String> {
        let kid = self.kid.clone().ok_or("entry missing key id (kid)")?;

        if let Some(alg) = &self.alg {
            if FORBIDDEN_ALGORITHMS
                .iter()
                .any(|forbidden| forbidden.eq_ignore_ascii_case(alg))
            {
                return Err(format!("key '{kid}' declares forbidden alg '{alg}'"));
            }
        }

        let missing = |member: &str| format!("key '{kid}' missing '{member}'");
        let key = match self.kty.as_deref().unwrap_or("RSA") {
            "RSA" => {
                let n = self.n.as_deref().ok_or_else(|| missing("n"))?;
                let e = self.e.as_deref().ok_or_else(|| missing("e"))?;
                DecodingKey::from_rsa_components(n, e)
            }
            "EC" => {
                match self.crv.as_deref() {
                    Some("P-256") | Some("P-384") => {}
                    other => {
                        return Err(format!("key '{kid}' uses unsupported curve {other:?}"));
                    }
                }
                let x = self.x.as_deref().ok_or_else(|| missing("x"))?;
                let y = self.y.as_deref().ok_or_else(|| missing("y"))?;
                DecodingKey::from_ec_components(x, y)
            }
            "OKP" => {
                if self.crv.as_deref() != Some("Ed25519") {
                    return Err(format!(
                        "key '{kid}' uses unsupported curve {:?}",
                        self.crv
                    ));
                }
                let x = self.x.as_deref().ok_or_else(|| missing("x"))?;
                DecodingKey::from_ed_components(x)
            }
            other => return Err(format!("key '{kid}' uses unsupported key type '{other}'")),
        }
        .map_err(|err| format!("key '{kid}' could not be decoded: {err}"))?;

        Ok((kid, key))
    }
}

impl JwkSet {
    /// Decode every usable entry, skipping (and logging) the rest so one
    /// unsupported key does not hide the others.
    pub fn decoding_keys(&self) -> Vec<(String, DecodingKey)> {
        self.keys
            .iter()
            .filter_map(|jwk| match jwk.decoding_key() {
                Ok(entry) => Some(entry),
                Err(reason) => {
                    warn!(%reason, "skipping JWKS entry");
                    None
                }
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> AuthResult<Self> {
        Self::with_timeout(url, DEFAULT_JWKS_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::Construction(format!("JWKS client: {err}")))?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<(String, DecodingKey)>, ResolveError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| ResolveError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ResolveError::Unavailable(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body: JwkSet = response
            .json()
            .await
            .map_err(|err| ResolveError::Unavailable(format!("invalid JWKS body: {err}")))?;

        Ok(body.decoding_keys())
    }
}
