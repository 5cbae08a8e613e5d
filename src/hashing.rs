//! Password and text digests.
//!
//! Stored credentials are SHA-256 over a per-user random salt followed by the
//! password. This is a general-purpose digest, not a slow password hash.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::Secret;

/// Length of the per-user salt in bytes.
pub const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Salt and digest of a stored password, encoded as `salt_hex$digest_hex`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    salt: [u8; SALT_LEN],
    digest: [u8; DIGEST_LEN],
}

impl PasswordDigest {
    /// Encodes the digest for storage.
    pub fn encode(&self) -> String {
        format!("{}${}", hex::encode(self.salt), hex::encode(self.digest))
    }

    /// Parses a stored `salt_hex$digest_hex` value.
    ///
    /// Returns `None` for anything that is not exactly that shape.
    pub fn parse(encoded: &str) -> Option<Self> {
        let (salt_hex, digest_hex) = encoded.split_once('$')?;
        let mut salt = [0u8; SALT_LEN];
        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(salt_hex, &mut salt).ok()?;
        hex::decode_to_slice(digest_hex, &mut digest).ok()?;
        Some(Self { salt, digest })
    }

    /// The 64-character hex digest without the salt.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// Computes and checks salted password digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Creates a hasher.
    pub fn new() -> Self {
        Self
    }

    /// Hashes a password under a fresh random salt.
    pub fn hash(&self, password: &Secret<String>) -> PasswordDigest {
        self.hash_with_salt(password, rand::random())
    }

    /// Hashes a password under the given salt.
    pub fn hash_with_salt(&self, password: &Secret<String>, salt: [u8; SALT_LEN]) -> PasswordDigest {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.expose_secret().as_bytes());
        PasswordDigest {
            salt,
            digest: hasher.finalize().into(),
        }
    }

    /// Checks a password against a stored digest in constant time.
    pub fn verify(&self, password: &Secret<String>, stored: &PasswordDigest) -> bool {
        let candidate = self.hash_with_salt(password, stored.salt);
        constant_time_eq(&candidate.digest, &stored.digest)
    }
}

/// Hex-encoded SHA-256 of `text`, used by `GET /encrypt`.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
