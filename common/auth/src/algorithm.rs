//! Signing algorithm allow-list.
//!
//! The configured algorithm is the only one an authenticator will ever sign
//! or verify with. Symmetric algorithms are refused outright: with them the
//! published verification key would double as the signing secret.

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::Algorithm;

use crate::error::{AuthError, AuthResult};

/// Algorithm names that are never accepted, whatever the configuration says.
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Asymmetric algorithms an authenticator may be configured with.
pub const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

/// Key pair family an algorithm signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    Rsa,
    Ec,
    Ed,
}

impl KeyFamily {
    pub fn of(algorithm: Algorithm) -> Option<Self> {
        match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Some(KeyFamily::Rsa),
            Algorithm::ES256 | Algorithm::ES384 => Some(KeyFamily::Ec),
            Algorithm::EdDSA => Some(KeyFamily::Ed),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => None,
        }
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::Ec => "EC",
            KeyFamily::Ed => "Ed25519",
        };
        f.write_str(label)
    }
}

/// Resolve a configured algorithm name against the allow-list.
///
/// # Errors
///
/// Returns [`AuthError::Construction`] when the name is forbidden, unknown,
/// or a known algorithm that is not on [`ACCEPTED_ALGORITHMS`].
pub fn parse_algorithm(name: &str) -> AuthResult<Algorithm> {
    if FORBIDDEN_ALGORITHMS
        .iter()
        .any(|forbidden| forbidden.eq_ignore_ascii_case(name))
    {
        return Err(AuthError::Construction(format!(
            "algorithm '{name}' is not allowed for token signing"
        )));
    }

    let algorithm = Algorithm::from_str(name)
        .map_err(|_| AuthError::Construction(format!("unknown algorithm '{name}'")))?;
    ensure_accepted(algorithm)?;
    Ok(algorithm)
}

pub fn ensure_accepted(algorithm: Algorithm) -> AuthResult<()> {
    if ACCEPTED_ALGORITHMS.contains(&algorithm) {
        Ok(())
    } else {
        Err(AuthError::Construction(format!(
            "algorithm {algorithm:?} is not in the accepted list"
        )))
    }
}
