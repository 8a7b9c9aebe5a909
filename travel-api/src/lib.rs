pub mod app;
pub mod config;
pub mod handlers;
pub mod metrics;

pub use app::{build_authenticator, router, AppState};
pub use config::{load_api_config, ApiConfig};
