pub mod genkey;
pub mod gentoken;
pub mod users;

pub use genkey::{generate_key, GeneratedKey};
pub use gentoken::{generate_token, render_token, TokenRequest};
pub use users::{User, UserDirectory};
