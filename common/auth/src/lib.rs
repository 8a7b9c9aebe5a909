pub mod algorithm;
pub mod authenticator;
pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod jwks;
pub mod keys;
pub mod resolver;
pub mod roles;

#[cfg(test)]
mod testkeys;

pub use algorithm::{parse_algorithm, KeyFamily, ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS};
pub use authenticator::{Authenticator, AuthenticatorBuilder};
pub use claims::{ClaimSet, ClaimsViolation};
pub use config::{JwtConfig, DEFAULT_AUDIENCE, DEFAULT_ISSUER, MAX_LEEWAY_SECONDS};
pub use error::{AuthError, AuthResult};
pub use extractors::{parse_bearer, AuthContext};
pub use guards::{ensure_role, GuardError};
pub use jwks::{Jwk, JwkSet, JwksFetcher};
pub use keys::{RsaComponents, SigningKey};
pub use resolver::{JwksKeyResolver, KeyResolver, ResolveError, StaticKeyResolver};
pub use roles::{Role, RoleSet, ROLE_ADMIN, ROLE_EMAIL, ROLE_MUTATE, ROLE_QUERY};
pub use jsonwebtoken::Algorithm;
