//! RSA key handling and the Minecraft login digest.
//!
//! The login handshake needs exactly three primitives: a 1024-bit RSA
//! keypair whose public half travels as DER, PKCS#1 v1.5 decryption of the
//! client's shared secret and verify token, and the game's signed-hex
//! SHA-1 digest of `sharedSecret ‖ publicKeyDER`.

use num_bigint::BigInt;
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use rsa::traits::PublicKeyParts;
use sha1::{Digest, Sha1};
use std::fmt::{Display, Formatter};

pub type ServerPrivateKey = RsaPrivateKey;
pub type ServerPublicKey = RsaPublicKey;

#[derive(Debug)]
pub enum Error {
    RsaError(rsa::errors::Error),
    RsaDerError(rsa_der::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RsaError(rsa_err) => rsa_err.fmt(f),
            Self::RsaDerError(rsa_der_err) => rsa_der_err.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<rsa::errors::Error> for Error {
    fn from(error: rsa::errors::Error) -> Self {
        Error::RsaError(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Generates the per-process 1024-bit server key. The protocol has used
/// this size since encryption was introduced; clients reject nothing else
/// and nothing larger is exchanged.
pub fn new_key() -> Result<ServerPrivateKey> {
    let mut rng = OsRng;
    Ok(RsaPrivateKey::new(&mut rng, 1024)?)
}

/// DER-encodes the public half of the server key, the exact byte string
/// both the `hello` packet and the login digest consume.
pub fn public_key_to_der(key: &ServerPrivateKey) -> Vec<u8> {
    let public = RsaPublicKey::from(key);
    rsa_der::public_key_to_der(&public.n().to_bytes_be(), &public.e().to_bytes_be())
}

pub fn public_key_from_der(der: &[u8]) -> Result<ServerPublicKey> {
    let (n, e) = rsa_der::public_key_from_der(der).map_err(Error::RsaDerError)?;
    Ok(RsaPublicKey::new(
        rsa::BigUint::from_bytes_be(&n),
        rsa::BigUint::from_bytes_be(&e),
    )?)
}

/// PKCS#1 v1.5 decryption of a login-phase blob (shared secret or verify
/// token).
pub fn decrypt(key: &ServerPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    Ok(key.decrypt(Pkcs1v15Encrypt, data)?)
}

/// Minecraft's session digest: SHA-1 over `shared_secret ‖ public_key_der`,
/// read as a signed big-endian integer and printed in lowercase hex.
/// Negative digests render as `-` plus the hex of the absolute value;
/// leading zeros drop out of the integer formatting in either case.
pub fn login_digest(shared_secret: &[u8], public_key_der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(shared_secret);
    hasher.update(public_key_der);
    let digest = hasher.finalize();
    let bigint = BigInt::from_signed_bytes_be(digest.as_slice());
    format!("{:x}", bigint)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The three vanilla vectors every server implementation checks
    // against: one positive digest, one negative, one with a stripped
    // leading zero.
    #[test]
    fn digest_matches_the_vanilla_vectors() {
        assert_eq!(
            login_digest(b"Notch", b""),
            "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48"
        );
        assert_eq!(
            login_digest(b"jeb_", b""),
            "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1"
        );
        assert_eq!(
            login_digest(b"simon", b""),
            "88e16a1019277b15d58faf0541e11910eb756f6"
        );
    }

    #[test]
    fn digest_concatenates_secret_and_key() {
        assert_eq!(login_digest(b"No", b"tch"), login_digest(b"Notch", b""));
    }

    #[test]
    fn keypair_decrypts_what_the_public_half_encrypted() {
        use rand::rngs::OsRng;
        use rsa::Pkcs1v15Encrypt;

        let key = new_key().unwrap();
        let der = public_key_to_der(&key);
        let public = public_key_from_der(&der).unwrap();

        let secret = [0x42u8; 16];
        let encrypted = public
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, &secret)
            .unwrap();
        assert_eq!(decrypt(&key, &encrypted).unwrap(), secret);
    }
}
