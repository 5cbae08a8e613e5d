//! HS256 bearer tokens for `POST /login`.
//!
//! Compact JWS: `base64url(header).base64url(claims).base64url(hmac)`, with
//! the HMAC-SHA256 key taken from `JWT_SECRET`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::Secret;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Token lifetime.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Token signing or verification failure.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The signing key was rejected by the MAC.
    #[error("signing key rejected")]
    InvalidKey,
    /// Claims could not be encoded or decoded.
    #[error("claims encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    /// The token is not three base64url segments with a known header.
    #[error("malformed token")]
    Malformed,
    /// The signature does not match.
    #[error("bad signature")]
    BadSignature,
    /// The token is past its expiry.
    #[error("token expired")]
    Expired,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Signs and checks tokens with one key.
pub struct TokenSigner {
    key: Secret<Vec<u8>>,
}

impl TokenSigner {
    /// Creates a signer keyed by `secret`.
    pub fn new(secret: &Secret<String>) -> Self {
        Self {
            key: Secret::new(secret.expose_secret().as_bytes().to_vec()),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.key.expose_secret()).map_err(|_| TokenError::InvalidKey)
    }

    /// Issues a token for `user_id` valid for [`TOKEN_TTL_SECS`] from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the key or claims cannot be used.
    pub fn sign(&self, user_id: i64, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Checks signature and expiry, returning the claims. No endpoint accepts
    /// bearer tokens, so only the tests check what `sign` produced.
    #[cfg(test)]
    pub(crate) fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, payload) = signing_input
            .split_once('.')
            .ok_or(TokenError::Malformed)?;

        let header = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| TokenError::Malformed)?;
        if header != HEADER.as_bytes() {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(key: &str) -> TokenSigner {
        TokenSigner::new(&Secret::new(key.to_string()))
    }

    #[test]
    fn sign_then_verify() {
        let now = Utc::now();
        let token = signer("k1").sign(7, now).unwrap();

        assert_eq!(token.split('.').count(), 3);
        let claims = signer("k1").verify(&token, now).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn wrong_key_is_bad_signature() {
        let now = Utc::now();
        let token = signer("k1").sign(1, now).unwrap();
        assert!(matches!(
            signer("k2").verify(&token, now),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn tampered_claims_fail() {
        let now = Utc::now();
        let token = signer("k1").sign(1, now).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(r#"{"userId":2,"iat":0,"exp":9999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

        assert!(matches!(
            signer("k1").verify(&forged, now),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn expires_after_one_hour() {
        let now = Utc::now();
        let token = signer("k1").sign(1, now).unwrap();
        let later = now + Duration::seconds(TOKEN_TTL_SECS + 1);

        assert!(matches!(signer("k1").verify(&token, later), Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_is_malformed() {
        let now = Utc::now();
        for token in ["", "abc", "a.b", "!!.??.##"] {
            assert!(matches!(signer("k").verify(token, now), Err(TokenError::Malformed)));
        }
    }

    #[test]
    fn debug_hides_key() {
        let debug = format!("{:?}", signer("very-secret-key"));
        assert!(!debug.contains("very-secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
