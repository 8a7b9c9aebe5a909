use std::collections::BTreeSet;

use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The claim check that rejected a token or a claim set under construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsViolation {
    #[error("issuer is not accepted")]
    Issuer,
    #[error("audience does not include an accepted value")]
    Audience,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("token issued in the future")]
    IssuedInFuture,
    #[error("role '{0}' is not recognised")]
    UnknownRole(String),
    #[error("missing claim '{0}'")]
    MissingClaim(String),
    #[error("claim '{0}' has an invalid value")]
    InvalidClaim(&'static str),
    #[error("token lifetime ends before it begins")]
    InvertedLifetime,
}

/// Identity and authorization payload carried by a token.
///
/// Fields are private so a claim set cannot change once it has been built;
/// [`ClaimSet::with_not_before`] and [`ClaimSet::with_jwt_id`] consume the
/// value and are meant to be used before issuing. Timestamps are kept at
/// whole-second precision, matching the token encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ClaimsRepr", try_from = "ClaimsRepr")]
pub struct ClaimSet {
    issuer: String,
    subject: String,
    audience: BTreeSet<String>,
    role: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    not_before: Option<DateTime<Utc>>,
    jwt_id: Option<String>,
}

impl ClaimSet {
    pub fn new<A, S>(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        audience: A,
        role: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, ClaimsViolation>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let issuer = non_empty(issuer.into(), "iss")?;
        let subject = non_empty(subject.into(), "sub")?;
        let role = non_empty(role.into(), "role")?;
        let audience: BTreeSet<String> = audience
            .into_iter()
            .map(Into::into)
            .filter(|value: &String| !value.is_empty())
            .collect();
        if audience.is_empty() {
            return Err(ClaimsViolation::MissingClaim("aud".into()));
        }

        let issued_at = issued_at.trunc_subsecs(0);
        let expires_at = expires_at.trunc_subsecs(0);
        if issued_at > expires_at {
            return Err(ClaimsViolation::InvertedLifetime);
        }

        Ok(Self {
            issuer,
            subject,
            audience,
            role,
            issued_at,
            expires_at,
            not_before: None,
            jwt_id: None,
        })
    }

    pub fn with_not_before(mut self, not_before: DateTime<Utc>) -> Result<Self, ClaimsViolation> {
        let not_before = not_before.trunc_subsecs(0);
        if not_before > self.expires_at {
            return Err(ClaimsViolation::InvertedLifetime);
        }
        self.not_before = Some(not_before);
        Ok(self)
    }

    pub fn with_jwt_id(mut self, jwt_id: impl Into<String>) -> Self {
        let jwt_id = jwt_id.into();
        self.jwt_id = (!jwt_id.is_empty()).then_some(jwt_id);
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn audience(&self) -> &BTreeSet<String> {
        &self.audience
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.jwt_id.as_deref()
    }

    /// True iff the role is an exact, case-sensitive member of `candidates`.
    pub fn has_role<I>(&self, candidates: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        candidates
            .into_iter()
            .any(|candidate| candidate.as_ref() == self.role)
    }

    pub fn audience_intersects(&self, accepted: &BTreeSet<String>) -> bool {
        self.audience.iter().any(|value| accepted.contains(value))
    }

    /// `issued_at <= now <= expires_at`, and `not_before <= now` when present.
    pub fn is_temporally_valid(&self, now: DateTime<Utc>) -> bool {
        self.temporal_violation(now, 0).is_none()
    }

    pub fn is_temporally_valid_within(&self, now: DateTime<Utc>, leeway_seconds: u32) -> bool {
        self.temporal_violation(now, leeway_seconds).is_none()
    }

    /// Report which temporal check fails at `now`, allowing `leeway_seconds`
    /// of clock skew in either direction.
    pub fn temporal_violation(
        &self,
        now: DateTime<Utc>,
        leeway_seconds: u32,
    ) -> Option<ClaimsViolation> {
        let leeway = Duration::seconds(leeway_seconds.into());
        let now = now.trunc_subsecs(0);

        if self.expires_at < now - leeway {
            return Some(ClaimsViolation::Expired);
        }
        if matches!(self.not_before, Some(nbf) if nbf > now + leeway) {
            return Some(ClaimsViolation::NotYetValid);
        }
        if self.issued_at > now + leeway {
            return Some(ClaimsViolation::IssuedInFuture);
        }
        None
    }
}

fn non_empty(value: String, claim: &'static str) -> Result<String, ClaimsViolation> {
    if value.is_empty() {
        Err(ClaimsViolation::MissingClaim(claim.into()))
    } else {
        Ok(value)
    }
}

/// Wire layout of the token payload. The role sits under `Auth.ROLE` so tokens
/// stay readable by existing consumers that look for the role there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aud: Option<AudienceRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    #[serde(rename = "Auth", default, skip_serializing_if = "Option::is_none")]
    auth: Option<RoleRepr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoleRepr {
    #[serde(rename = "ROLE")]
    role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

impl From<ClaimSet> for ClaimsRepr {
    fn from(value: ClaimSet) -> Self {
        Self {
            iss: Some(value.issuer),
            sub: Some(value.subject),
            aud: Some(AudienceRepr::Many(value.audience.into_iter().collect())),
            iat: Some(value.issued_at.timestamp()),
            exp: Some(value.expires_at.timestamp()),
            nbf: value.not_before.map(|nbf| nbf.timestamp()),
            jti: value.jwt_id,
            auth: Some(RoleRepr { role: value.role }),
        }
    }
}

impl TryFrom<ClaimsRepr> for ClaimSet {
    type Error = ClaimsViolation;

    fn try_from(value: ClaimsRepr) -> Result<Self, Self::Error> {
        let missing = |claim: &str| ClaimsViolation::MissingClaim(claim.into());

        let issuer = value.iss.ok_or_else(|| missing("iss"))?;
        let subject = value.sub.ok_or_else(|| missing("sub"))?;
        let audience = match value.aud.ok_or_else(|| missing("aud"))? {
            AudienceRepr::Single(item) => vec![item],
            AudienceRepr::Many(items) => items,
        };
        let role = value.auth.ok_or_else(|| missing("Auth.ROLE"))?.role;
        let issued_at = timestamp(value.iat.ok_or_else(|| missing("iat"))?, "iat")?;
        let expires_at = timestamp(value.exp.ok_or_else(|| missing("exp"))?, "exp")?;

        let mut claims = ClaimSet::new(issuer, subject, audience, role, issued_at, expires_at)?;
        if let Some(nbf) = value.nbf {
            claims = claims.with_not_before(timestamp(nbf, "nbf")?)?;
        }
        if let Some(jti) = value.jti {
            claims = claims.with_jwt_id(jti);
        }
        Ok(claims)
    }
}

fn timestamp(seconds: i64, claim: &'static str) -> Result<DateTime<Utc>, ClaimsViolation> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(ClaimsViolation::InvalidClaim(claim))
}
