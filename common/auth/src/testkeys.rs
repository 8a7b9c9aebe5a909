//! Shared RSA material for unit tests. Key generation is slow, so one key is
//! generated per test binary.

use std::sync::OnceLock;

use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;

pub(crate) fn rsa_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate rsa key"))
}

pub(crate) fn rsa_private_pem() -> String {
    rsa_private_key()
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encode pkcs8 pem")
        .to_string()
}

pub(crate) fn rsa_private_pkcs1_pem() -> String {
    rsa_private_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("encode pkcs1 pem")
        .to_string()
}
