use std::collections::BTreeSet;

use crate::error::{AuthError, AuthResult};

/// Issuer stamped on, and required of, every travel token.
pub const DEFAULT_ISSUER: &str = "travel project";
/// Audience stamped on, and required of, every travel token.
pub const DEFAULT_AUDIENCE: &str = "students";
/// Upper bound on clock-skew leeway: one day.
pub const MAX_LEEWAY_SECONDS: u32 = 86_400;

/// Claim policy shared by issuance and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtConfig {
    /// Expected issuer claim (iss).
    pub issuer: String,
    /// Accepted audience values (aud); a token must name at least one.
    pub audience: BTreeSet<String>,
    /// Allowable clock skew in seconds when validating exp/nbf/iat.
    pub leeway_seconds: u32,
}

impl JwtConfig {
    /// Config with a single audience and no leeway.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: BTreeSet::from([audience.into()]),
            leeway_seconds: 0,
        }
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    /// Replace the accepted audience set.
    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn validate(&self) -> AuthResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::Construction("issuer cannot be blank".into()));
        }
        if self.audience.iter().all(|value| value.trim().is_empty()) {
            return Err(AuthError::Construction(
                "at least one audience is required".into(),
            ));
        }
        if self.leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(AuthError::Construction(format!(
                "leeway of {}s exceeds the {MAX_LEEWAY_SECONDS}s limit",
                self.leeway_seconds
            )));
        }
        Ok(())
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ISSUER, DEFAULT_AUDIENCE)
    }
}
