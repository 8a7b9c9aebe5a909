use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use travel_admin::genkey::DEFAULT_BITS;
use travel_admin::gentoken::{DEFAULT_KEY_ID, DEFAULT_TTL_HOURS};
use travel_admin::users::DEFAULT_USERS_FILE;
use travel_admin::{generate_key, generate_token, render_token, TokenRequest};
use travel_auth::{JwtConfig, DEFAULT_AUDIENCE, DEFAULT_ISSUER};

#[derive(Parser, Debug)]
#[command(about = "Administrative tasks for the travel service", long_about = None)]
struct Options {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a signed token for a registered user
    Gentoken {
        email: String,
        private_key_file: PathBuf,
        algorithm: String,

        /// JSON user directory
        #[arg(long = "users", default_value = DEFAULT_USERS_FILE)]
        users_file: PathBuf,

        /// Key id placed in the token header
        #[arg(long = "kid", default_value = DEFAULT_KEY_ID)]
        key_id: String,

        #[arg(long, default_value_t = DEFAULT_TTL_HOURS)]
        ttl_hours: i64,

        #[arg(long, env = "AUTH_ISSUER", default_value = DEFAULT_ISSUER)]
        issuer: String,

        /// Audience values, comma separated
        #[arg(long, env = "AUTH_AUDIENCE", value_delimiter = ',', default_value = DEFAULT_AUDIENCE)]
        audience: Vec<String>,
    },
    /// Generate an RSA key pair
    Genkey {
        private_key_file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_BITS)]
        bits: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Options::parse().command {
        Command::Gentoken {
            email,
            private_key_file,
            algorithm,
            users_file,
            key_id,
            ttl_hours,
            issuer,
            audience,
        } => {
            let request = TokenRequest {
                email,
                private_key_file,
                algorithm,
                users_file,
                key_id,
                ttl_hours,
                jwt: JwtConfig::new(issuer, DEFAULT_AUDIENCE)
                    .with_audience(audience.iter().map(|value| value.trim().to_string())),
            };
            let token = generate_token(&request).await?;
            print!("{}", render_token(&token));
        }
        Command::Genkey {
            private_key_file,
            bits,
        } => {
            let generated = generate_key(&private_key_file, bits)?;
            println!("private key: {}", generated.private_path.display());
            println!("public key:  {}", generated.public_path.display());
        }
    }

    Ok(())
}
