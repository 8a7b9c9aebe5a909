use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::algorithm::{parse_algorithm, KeyFamily};
use crate::claims::{ClaimSet, ClaimsRepr, ClaimsViolation};
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::JwkSet;
use crate::keys::SigningKey;
use crate::resolver::{KeyResolver, ResolveError};
use crate::roles::{Role, RoleSet};

const KEY_PROBE: &[u8] = b"travel-auth signing key probe";

/// Issues and verifies signed identity tokens.
///
/// Everything is fixed at construction: the signing key and its key id, the
/// single accepted algorithm, the claim policy and the role catalog. The
/// instance holds no mutable state and can be shared across tasks behind an
/// `Arc`.
pub struct Authenticator {
    signing_key: SigningKey,
    key_id: String,
    algorithm: Algorithm,
    resolver: Arc<dyn KeyResolver>,
    config: JwtConfig,
    roles: RoleSet,
    policy: Validation,
}

impl Authenticator {
    /// Authenticator for the travel service defaults: [`JwtConfig::default`]
    /// and the [`Role::catalog`].
    pub fn new(
        signing_key: SigningKey,
        key_id: impl Into<String>,
        algorithm: &str,
        resolver: Arc<dyn KeyResolver>,
    ) -> AuthResult<Self> {
        Self::builder()
            .with_signing_key(signing_key)
            .with_key_id(key_id)
            .with_algorithm(algorithm)
            .with_resolver(resolver)
            .build()
    }

    pub fn builder() -> AuthenticatorBuilder {
        AuthenticatorBuilder::default()
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn role_catalog(&self) -> &RoleSet {
        &self.roles
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Key set publishing the active public key, for remote verifiers.
    pub fn public_jwks(&self) -> JwkSet {
        JwkSet {
            keys: self
                .signing_key
                .to_jwk(&self.key_id, self.algorithm)
                .into_iter()
                .collect(),
        }
    }

    /// Claim set for `subject` under this authenticator's issuer and
    /// audience, valid from now for `ttl`, with a fresh token id.
    pub fn claims(
        &self,
        subject: impl Into<String>,
        role: impl Into<String>,
        ttl: Duration,
    ) -> AuthResult<ClaimSet> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(ClaimsViolation::InvalidClaim("exp"))?;
        let claims = ClaimSet::new(
            self.config.issuer.clone(),
            subject,
            self.config.audience.iter().cloned(),
            role,
            now,
            expires_at,
        )?
        .with_not_before(now)?
        .with_jwt_id(Uuid::new_v4().to_string());
        Ok(claims)
    }

    /// Sign `claims` into a compact token whose header names this
    /// authenticator's key id.
    pub fn issue(&self, claims: &ClaimSet) -> AuthResult<String> {
        if !self.roles.contains(claims.role()) {
            return Err(AuthError::Signing(format!(
                "role '{}' is not in the role catalog",
                claims.role()
            )));
        }

        let mut header = Header::new(self.algorithm);
        header.kid = Some(self.key_id.clone());

        let token = encode(&header, claims, self.signing_key.encoding_key())
            .map_err(|err| AuthError::Signing(err.to_string()))?;
        debug!(kid = %self.key_id, subject = claims.subject(), "issued token");
        Ok(token)
    }

    /// Recover the claim set from `token` once structure, key, signature and
    /// claims have all been checked, in that order.
    pub async fn verify(&self, token: &str) -> AuthResult<ClaimSet> {
        let header = decode_header(token)
            .map_err(|err| AuthError::MalformedToken(format!("invalid header: {err}")))?;
        let kid = match header.kid {
            Some(kid) if !kid.is_empty() => kid,
            _ => {
                return Err(AuthError::MalformedToken(
                    "missing key id (kid) in token header".into(),
                ))
            }
        };

        let key = self.resolver.resolve(&kid).await.map_err(|source| {
            debug!(kid = %kid, error = %source, "token key id not resolvable");
            AuthError::UnknownKey {
                kid: kid.clone(),
                source,
            }
        })?;

        // The header algorithm is attacker controlled; only the configured
        // one is ever used to check the signature.
        if header.alg != self.algorithm {
            warn!(
                kid = %kid,
                declared = ?header.alg,
                expected = ?self.algorithm,
                "rejected token signed with unexpected algorithm"
            );
            return Err(AuthError::BadSignature);
        }

        let data = decode::<ClaimsRepr>(token, &key, &self.policy)
            .map_err(|err| self.classify(&kid, err))?;

        let claims = ClaimSet::try_from(data.claims)?;
        self.check_claims(&claims)?;

        debug!(kid = %kid, subject = claims.subject(), role = claims.role(), "verified token");
        Ok(claims)
    }

    fn check_claims(&self, claims: &ClaimSet) -> Result<(), ClaimsViolation> {
        if claims.issuer() != self.config.issuer {
            return Err(ClaimsViolation::Issuer);
        }
        if !claims.audience_intersects(&self.config.audience) {
            return Err(ClaimsViolation::Audience);
        }
        if let Some(violation) = claims.temporal_violation(Utc::now(), self.config.leeway_seconds)
        {
            return Err(violation);
        }
        if !self.roles.contains(claims.role()) {
            return Err(ClaimsViolation::UnknownRole(claims.role().to_string()));
        }
        Ok(())
    }

    fn classify(&self, kid: &str, err: JwtError) -> AuthError {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                warn!(kid, error = %err, "token signature rejected");
                AuthError::BadSignature
            }
            ErrorKind::ExpiredSignature => ClaimsViolation::Expired.into(),
            ErrorKind::ImmatureSignature => ClaimsViolation::NotYetValid.into(),
            ErrorKind::InvalidIssuer => ClaimsViolation::Issuer.into(),
            ErrorKind::InvalidAudience => ClaimsViolation::Audience.into(),
            ErrorKind::MissingRequiredClaim(claim) => {
                ClaimsViolation::MissingClaim(claim.clone()).into()
            }
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                AuthError::UnknownKey {
                    kid: kid.to_string(),
                    source: ResolveError::InvalidKey {
                        kid: kid.to_string(),
                        reason: err.to_string(),
                    },
                }
            }
            _ => AuthError::MalformedToken(err.to_string()),
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("config", &self.config)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct AuthenticatorBuilder {
    signing_key: Option<SigningKey>,
    key_id: Option<String>,
    algorithm: Option<String>,
    resolver: Option<Arc<dyn KeyResolver>>,
    config: JwtConfig,
    roles: Option<RoleSet>,
}

impl AuthenticatorBuilder {
    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.key_id = Some(kid.into());
        self
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_config(mut self, config: JwtConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_role_catalog(mut self, roles: RoleSet) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn build(self) -> AuthResult<Authenticator> {
        let signing_key = self
            .signing_key
            .ok_or_else(|| AuthError::Construction("private signing key is required".into()))?;
        let key_id = self
            .key_id
            .filter(|kid| !kid.trim().is_empty())
            .ok_or_else(|| AuthError::Construction("public key id cannot be blank".into()))?;
        let algorithm = self
            .algorithm
            .ok_or_else(|| AuthError::Construction("signing algorithm is required".into()))
            .and_then(|name| parse_algorithm(&name))?;
        let resolver = self
            .resolver
            .ok_or_else(|| AuthError::Construction("key resolver is required".into()))?;
        let roles = self.roles.unwrap_or_else(Role::catalog);
        if roles.is_empty() {
            return Err(AuthError::Construction("role catalog cannot be empty".into()));
        }
        self.config.validate()?;

        if KeyFamily::of(algorithm) != Some(signing_key.family()) {
            return Err(AuthError::Construction(format!(
                "algorithm {algorithm:?} cannot sign with a {} key",
                signing_key.family()
            )));
        }
        probe_signing_key(&signing_key, algorithm)?;

        let policy = parser_policy(algorithm, &self.config);

        Ok(Authenticator {
            signing_key,
            key_id,
            algorithm,
            resolver,
            config: self.config,
            roles,
            policy,
        })
    }
}

/// Verification policy applied identically to every token.
fn parser_policy(algorithm: Algorithm, config: &JwtConfig) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.algorithms = vec![algorithm];
    validation.set_issuer(&[config.issuer.as_str()]);
    let audience: Vec<&str> = config.audience.iter().map(String::as_str).collect();
    validation.set_audience(&audience);
    validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = config.leeway_seconds.into();
    validation
}

/// Sign and verify a fixed message so an unusable or mismatched key fails at
/// startup instead of on the first request.
fn probe_signing_key(key: &SigningKey, algorithm: Algorithm) -> AuthResult<()> {
    let signature = jsonwebtoken::crypto::sign(KEY_PROBE, key.encoding_key(), algorithm)
        .map_err(|err| {
            AuthError::Construction(format!(
                "signing key cannot produce {algorithm:?} signatures: {err}"
            ))
        })?;
    let valid = jsonwebtoken::crypto::verify(&signature, KEY_PROBE, key.verifying_key(), algorithm)
        .map_err(|err| AuthError::Construction(format!("signing key self-check failed: {err}")))?;
    if !valid {
        return Err(AuthError::Construction(
            "private key does not match its public key".into(),
        ));
    }
    Ok(())
}
