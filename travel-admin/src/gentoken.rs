use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use tracing::info;
use travel_auth::{
    parse_algorithm, Authenticator, JwtConfig, KeyFamily, Role, SigningKey, StaticKeyResolver,
};

use crate::users::UserDirectory;

pub const DEFAULT_KEY_ID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";
/// One year.
pub const DEFAULT_TTL_HOURS: i64 = 8760;
const MAX_TTL_HOURS: i64 = 10 * DEFAULT_TTL_HOURS;

#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub email: String,
    pub private_key_file: PathBuf,
    pub algorithm: String,
    pub users_file: PathBuf,
    pub key_id: String,
    pub ttl_hours: i64,
    pub jwt: JwtConfig,
}

/// Mint a token for the user registered under `request.email`, signed with
/// the RSA key in `request.private_key_file`.
pub async fn generate_token(request: &TokenRequest) -> Result<String> {
    if !(1..=MAX_TTL_HOURS).contains(&request.ttl_hours) {
        return Err(anyhow!(
            "token lifetime must be between 1 and {MAX_TTL_HOURS} hours, got {}",
            request.ttl_hours
        ));
    }
    let algorithm = parse_algorithm(&request.algorithm)?;
    if KeyFamily::of(algorithm) != Some(KeyFamily::Rsa) {
        return Err(anyhow!(
            "gentoken signs with RSA keys; {} is not an RSA algorithm",
            request.algorithm
        ));
    }

    let directory = UserDirectory::load(&request.users_file)?;
    let user = directory.find_by_email(&request.email)?;

    let private_pem = fs::read(&request.private_key_file).with_context(|| {
        format!(
            "Failed to read private key {}",
            request.private_key_file.display()
        )
    })?;
    let signing_key =
        SigningKey::from_rsa_pem(&private_pem).context("Failed to parse PEM private key")?;

    let resolver = StaticKeyResolver::from_signing_key(request.key_id.clone(), &signing_key);
    let authenticator = Authenticator::builder()
        .with_signing_key(signing_key)
        .with_key_id(request.key_id.clone())
        .with_algorithm(request.algorithm.clone())
        .with_resolver(Arc::new(resolver))
        .with_config(request.jwt.clone())
        .with_role_catalog(Role::catalog())
        .build()
        .context("Failed to construct authenticator")?;

    let claims = authenticator.claims(
        user.id.clone(),
        user.role.clone(),
        Duration::hours(request.ttl_hours),
    )?;
    let token = authenticator
        .issue(&claims)
        .with_context(|| format!("Failed to sign token for {}", user.email))?;

    authenticator
        .verify(&token)
        .await
        .context("Generated token failed verification")?;

    info!(
        subject = %user.id,
        role = %user.role,
        kid = %request.key_id,
        expires_at = %claims.expires_at(),
        "generated token"
    );
    Ok(token)
}

pub fn render_token(token: &str) -> String {
    format!("-----BEGIN TOKEN-----\n{token}\n-----END TOKEN-----\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_block_is_framed() {
        assert_eq!(
            render_token("a.b.c"),
            "-----BEGIN TOKEN-----\na.b.c\n-----END TOKEN-----\n"
        );
    }
}
