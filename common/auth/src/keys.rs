//! Private signing keys and their public halves.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;

use crate::algorithm::KeyFamily;
use crate::error::{AuthError, AuthResult};
use crate::jwks::Jwk;

/// Base64url-encoded RSA public components, as published in a JWK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaComponents {
    pub n: String,
    pub e: String,
}

/// An asymmetric private key together with the public key that verifies
/// its signatures.
#[derive(Clone)]
pub struct SigningKey {
    family: KeyFamily,
    encoding: EncodingKey,
    verifying: DecodingKey,
    rsa: Option<RsaComponents>,
}

impl SigningKey {
    /// Parse an RSA private key in PKCS#8 or PKCS#1 PEM form. The public key
    /// is derived from it.
    pub fn from_rsa_pem(pem: &[u8]) -> AuthResult<Self> {
        let text = std::str::from_utf8(pem)
            .map_err(|err| AuthError::KeyParse(format!("RSA private key is not UTF-8: {err}")))?;
        let private = RsaPrivateKey::from_pkcs8_pem(text)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text))
            .map_err(|err| AuthError::KeyParse(format!("RSA private key: {err}")))?;
        Self::from_rsa_private_key(&private)
    }

    pub fn from_rsa_private_key(private: &RsaPrivateKey) -> AuthResult<Self> {
        let der = private
            .to_pkcs1_der()
            .map_err(|err| AuthError::KeyParse(format!("RSA private key: {err}")))?;
        let encoding = EncodingKey::from_rsa_der(der.as_bytes());

        let public = private.to_public_key();
        let components = RsaComponents {
            n: URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
        };
        let verifying = DecodingKey::from_rsa_components(&components.n, &components.e)
            .map_err(|err| AuthError::KeyParse(format!("RSA public key: {err}")))?;

        Ok(Self {
            family: KeyFamily::Rsa,
            encoding,
            verifying,
            rsa: Some(components),
        })
    }

    /// ECDSA (P-256 / P-384) private key in PKCS#8 PEM plus its public key PEM.
    pub fn from_ec_pem(private_pem: &[u8], public_pem: &[u8]) -> AuthResult<Self> {
        let encoding = EncodingKey::from_ec_pem(private_pem)
            .map_err(|err| AuthError::KeyParse(format!("EC private key: {err}")))?;
        let verifying = DecodingKey::from_ec_pem(public_pem)
            .map_err(|err| AuthError::KeyParse(format!("EC public key: {err}")))?;
        Ok(Self {
            family: KeyFamily::Ec,
            encoding,
            verifying,
            rsa: None,
        })
    }

    /// Ed25519 private key in PKCS#8 PEM plus its public key PEM.
    pub fn from_ed_pem(private_pem: &[u8], public_pem: &[u8]) -> AuthResult<Self> {
        let encoding = EncodingKey::from_ed_pem(private_pem)
            .map_err(|err| AuthError::KeyParse(format!("Ed25519 private key: {err}")))?;
        let verifying = DecodingKey::from_ed_pem(public_pem)
            .map_err(|err| AuthError::KeyParse(format!("Ed25519 public key: {err}")))?;
        Ok(Self {
            family: KeyFamily::Ed,
            encoding,
            verifying,
            rsa: None,
        })
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    pub fn verifying_key(&self) -> &DecodingKey {
        &self.verifying
    }

    pub fn rsa_components(&self) -> Option<&RsaComponents> {
        self.rsa.as_ref()
    }

    /// Public JWK for this key. Only RSA keys carry their components, so EC
    /// and Ed25519 keys return `None`.
    pub fn to_jwk(&self, kid: &str, algorithm: Algorithm) -> Option<Jwk> {
        self.rsa
            .as_ref()
            .map(|components| Jwk::rsa(kid, algorithm, components))
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}
