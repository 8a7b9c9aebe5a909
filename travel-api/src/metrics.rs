use anyhow::Result;
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use travel_auth::AuthError;

const OUTCOME_OK: &str = "ok";

/// Prometheus registry for the service. Verification outcomes are labelled
/// with [`AuthError::kind`], or `ok`.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    verifications: IntCounterVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self> {
        let verifications = IntCounterVec::new(
            Opts::new(
                "auth_token_verifications_total",
                "Bearer token verifications by outcome",
            ),
            &["outcome"],
        )?;
        let registry = Registry::new();
        registry.register(Box::new(verifications.clone()))?;
        Ok(Self {
            registry,
            verifications,
        })
    }

    pub fn record_verification(&self, outcome: Result<(), &AuthError>) {
        let label = match outcome {
            Ok(()) => OUTCOME_OK,
            Err(err) => err.kind(),
        };
        self.verifications.with_label_values(&[label]).inc();
    }

    pub fn verification_count(&self, outcome: &str) -> u64 {
        self.verifications.with_label_values(&[outcome]).get()
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }
}
