#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use travel_auth::{Authenticator, JwtConfig, KeyResolver, SigningKey, StaticKeyResolver};

pub const PRIMARY_KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";
pub const SECONDARY_KID: &str = "0f3c4c2e-2d0b-4a8e-9b44-4f8f52f1d8a7";

fn generate() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut OsRng, 2048).expect("generate rsa key")
}

pub fn primary_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate)
}

pub fn secondary_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate)
}

pub fn private_pem(key: &RsaPrivateKey) -> Result<String> {
    Ok(key.to_pkcs8_pem(LineEnding::LF)?.to_string())
}

pub fn public_pem(key: &RsaPrivateKey) -> Result<String> {
    Ok(key.to_public_key().to_public_key_pem(LineEnding::LF)?)
}

pub fn signing_key(key: &RsaPrivateKey) -> Result<SigningKey> {
    Ok(SigningKey::from_rsa_private_key(key)?)
}

/// Resolver that knows only the primary key.
pub fn primary_resolver() -> Result<Arc<dyn KeyResolver>> {
    Ok(Arc::new(StaticKeyResolver::from_signing_key(
        PRIMARY_KID,
        &signing_key(primary_key())?,
    )))
}

pub fn authenticator(
    key: &RsaPrivateKey,
    kid: &str,
    algorithm: &str,
    resolver: Arc<dyn KeyResolver>,
) -> Result<Authenticator> {
    Ok(Authenticator::builder()
        .with_signing_key(signing_key(key)?)
        .with_key_id(kid)
        .with_algorithm(algorithm)
        .with_resolver(resolver)
        .with_config(JwtConfig::default())
        .build()?)
}

pub fn primary_authenticator() -> Result<Authenticator> {
    authenticator(primary_key(), PRIMARY_KID, "RS256", primary_resolver()?)
}
