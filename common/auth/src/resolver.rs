//! Key identifier to public key resolution.
//!
//! A resolver is the only seam through which verification learns about keys.
//! A static map covers a single active key or a fixed rotation window;
//! [`JwksKeyResolver`] follows a published JSON Web Key Set.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::jwks::JwksFetcher;
use crate::keys::SigningKey;

/// Default minimum spacing between JWKS fetches triggered by cache misses.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no public key registered for kid '{kid}'")]
    NotFound { kid: String },
    #[error("key source unavailable: {0}")]
    Unavailable(String),
    #[error("public key for kid '{kid}' is unusable: {reason}")]
    InvalidKey { kid: String, reason: String },
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

/// Maps a key identifier to the public key that verifies its signatures.
///
/// Implementations must not change caller-visible state and must report an
/// unknown identifier as [`ResolveError::NotFound`], keeping it distinct from
/// transport failures.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError>;
}

/// Fixed set of known keys. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct StaticKeyResolver {
    keys: Arc<HashMap<String, DecodingKey>>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that knows exactly one key: the public half of `key`.
    pub fn from_signing_key(kid: impl Into<String>, key: &SigningKey) -> Self {
        Self::new().with_key(kid, key.verifying_key().clone())
    }

    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        Arc::make_mut(&mut self.keys).insert(kid.into(), key);
        self
    }

    pub fn with_rsa_pem(self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let kid = kid.into();
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|err| AuthError::KeyParse(format!("RSA public key for '{kid}': {err}")))?;
        Ok(self.with_key(kid, key))
    }

    pub fn with_ec_pem(self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let kid = kid.into();
        let key = DecodingKey::from_ec_pem(pem)
            .map_err(|err| AuthError::KeyParse(format!("EC public key for '{kid}': {err}")))?;
        Ok(self.with_key(kid, key))
    }

    pub fn with_ed_pem(self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let kid = kid.into();
        let key = DecodingKey::from_ed_pem(pem).map_err(|err| {
            AuthError::KeyParse(format!("Ed25519 public key for '{kid}': {err}"))
        })?;
        Ok(self.with_key(kid, key))
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for StaticKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&String> = self.keys.keys().collect();
        kids.sort();
        f.debug_struct("StaticKeyResolver").field("kids", &kids).finish()
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                kid: kid.to_string(),
            })
    }
}

#[derive(Default)]
struct CacheState {
    keys: HashMap<String, DecodingKey>,
    last_attempt: Option<Instant>,
    /// Failure of the most recent fetch, cleared by the next successful one.
    last_error: Option<ResolveError>,
}

/// Resolver backed by a remote JWKS endpoint with an in-memory key cache.
///
/// A miss triggers at most one fetch per `min_refresh_interval`; concurrent
/// misses wait on the same refresh instead of issuing their own.
pub struct JwksKeyResolver {
    fetcher: JwksFetcher,
    min_refresh_interval: Duration,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

impl JwksKeyResolver {
    pub fn new(fetcher: JwksFetcher) -> Self {
        Self {
            fetcher,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn fetcher(&self) -> &JwksFetcher {
        &self.fetcher
    }

    /// Fetch the key set now, regardless of the refresh interval.
    pub async fn prime(&self) -> Result<usize, ResolveError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    pub fn cached_len(&self) -> usize {
        self.read_state().keys.len()
    }

    fn cached(&self, kid: &str) -> Option<DecodingKey> {
        self.read_state().keys.get(kid).cloned()
    }

    fn refresh_due(&self) -> bool {
        match self.read_state().last_attempt {
            Some(at) => at.elapsed() >= self.min_refresh_interval,
            None => true,
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller must hold `refresh_lock`.
    async fn refresh_locked(&self) -> Result<usize, ResolveError> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .last_attempt = Some(Instant::now());

        let fetched = self.fetcher.fetch().await;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let keys = match fetched {
            Ok(keys) => {
                state.last_error = None;
                keys
            }
            Err(err) => {
                warn!(url = self.fetcher.url(), error = %err, "JWKS refresh failed");
                state.last_error = Some(err.clone());
                return Err(err);
            }
        };

        let count = keys.len();
        if count == 0 {
            warn!(url = self.fetcher.url(), "JWKS returned no usable keys; keeping cached set");
            return Ok(0);
        }

        state.keys = keys.into_iter().collect();
        info!(url = self.fetcher.url(), count, "refreshed JWKS");
        Ok(count)
    }
}

#[async_trait]
impl KeyResolver for JwksKeyResolver {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError> {
        if let Some(key) = self.cached(kid) {
            return Ok(key);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(key) = self.cached(kid) {
            return Ok(key);
        }

        let not_found = || ResolveError::NotFound {
            kid: kid.to_string(),
        };
        if !self.refresh_due() {
            debug!(kid, "JWKS refresh suppressed by minimum interval");
            // A suppressed retry after a failed fetch still reports the outage.
            return Err(self.read_state().last_error.clone().unwrap_or_else(not_found));
        }

        self.refresh_locked().await?;
        self.cached(kid).ok_or_else(not_found)
    }
}

impl fmt::Debug for JwksKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwksKeyResolver")
            .field("url", &self.fetcher.url())
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field("cached", &self.cached_len())
            .finish()
    }
}
