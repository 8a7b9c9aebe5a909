use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use tracing::info;

pub const DEFAULT_BITS: usize = 2048;
const MIN_BITS: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    pub private_path: PathBuf,
    pub public_path: PathBuf,
}

/// Write a fresh RSA private key to `path` as PKCS#8 PEM and its public key
/// next to it as `<stem>.pub.pem`. Existing files are never overwritten.
pub fn generate_key(path: &Path, bits: usize) -> Result<GeneratedKey> {
    if bits < MIN_BITS {
        return Err(anyhow!("RSA keys must be at least {MIN_BITS} bits, got {bits}"));
    }

    let public_path = public_key_path(path)?;
    for target in [path, public_path.as_path()] {
        if target.exists() {
            return Err(anyhow!("refusing to overwrite {}", target.display()));
        }
    }

    let private_key = RsaPrivateKey::new(&mut OsRng, bits).context("Failed to generate RSA key")?;
    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .context("Failed to encode private key")?;
    let public_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .context("Failed to encode public key")?;

    fs::write(path, private_pem.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    fs::write(&public_path, public_pem.as_bytes())
        .with_context(|| format!("Failed to write {}", public_path.display()))?;

    info!(
        private = %path.display(),
        public = %public_path.display(),
        bits,
        "generated RSA key pair"
    );
    Ok(GeneratedKey {
        private_path: path.to_path_buf(),
        public_path,
    })
}

fn public_key_path(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| anyhow!("invalid key file name {}", path.display()))?;
    Ok(path.with_file_name(format!("{stem}.pub.pem")))
}
