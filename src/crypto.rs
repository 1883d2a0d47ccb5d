//! Keyed HMAC-SHA256 signing for redemption codes and session tokens.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies byte payloads with a shared secret.
///
/// Signatures are lowercase hex. Verification uses the constant-time
/// comparison provided by [`Mac::verify_slice`].
#[derive(Clone)]
pub struct Signer {
    keyed: HmacSha256,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    /// Creates a signer keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the key is rejected by HMAC.
    pub fn new(secret: &str) -> Result<Self, GatewayError> {
        Self::from_key(secret.as_bytes())
    }

    /// Creates a signer keyed with `secret` plus a random value drawn once
    /// per call.
    ///
    /// Anything signed by a previous process fails verification, which is
    /// what an in-memory gateway wants after a restart.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the key is rejected by HMAC.
    pub fn with_boot_nonce(secret: &str) -> Result<Self, GatewayError> {
        let mut key = secret.as_bytes().to_vec();
        key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self::from_key(&key)
    }

    fn from_key(key: &[u8]) -> Result<Self, GatewayError> {
        let keyed = HmacSha256::new_from_slice(key)
            .map_err(|e| GatewayError::Internal(format!("invalid signing key: {e}")))?;
        Ok(Self { keyed })
    }

    /// Returns the hex-encoded signature of `payload`.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.keyed.clone();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Returns `true` when `signature_hex` is a valid signature of `payload`.
    #[must_use]
    pub fn verify(&self, payload: &[u8], signature_hex: &str) -> bool {
        let Ok(sig_bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let mut mac = self.keyed.clone();
        mac.update(payload);
        mac.verify_slice(&sig_bytes).is_ok()
    }

    /// Issues the session token a user presents when authenticating a
    /// realtime connection.
    #[must_use]
    pub fn session_token(&self, user_id: i64) -> String {
        self.sign(format!("session:{user_id}").as_bytes())
    }

    /// Checks a session token previously issued by [`Self::session_token`].
    #[must_use]
    pub fn verify_session(&self, user_id: i64, token: &str) -> bool {
        self.verify(format!("session:{user_id}").as_bytes(), token)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn signer(secret: &str) -> Signer {
        let Ok(signer) = Signer::new(secret) else {
            panic!("signer rejected key");
        };
        signer
    }

    #[test]
    fn signature_verifies() {
        let signer = signer("secret");
        let sig = signer.sign(b"payload");
        assert!(signer.verify(b"payload", &sig));
        assert!(!signer.verify(b"payload2", &sig));
    }

    #[test]
    fn different_keys_disagree() {
        let a = signer("a");
        let b = signer("b");
        let sig = a.sign(b"payload");
        assert!(!b.verify(b"payload", &sig));
    }

    #[test]
    fn empty_secret_is_accepted() {
        let empty = signer("");
        let sig = empty.sign(b"payload");
        assert!(empty.verify(b"payload", &sig));
    }

    #[test]
    fn boot_nonce_keys_differ_between_instances() {
        let (Ok(first), Ok(second)) = (
            Signer::with_boot_nonce("secret"),
            Signer::with_boot_nonce("secret"),
        ) else {
            panic!("signer rejected key");
        };
        let sig = first.sign(b"payload");
        assert!(first.verify(b"payload", &sig));
        assert!(!second.verify(b"payload", &sig));
        assert!(!signer("secret").verify(b"payload", &sig));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let signer = signer("secret");
        assert!(!signer.verify(b"payload", "not-hex"));
    }

    #[test]
    fn session_tokens_are_bound_to_user() {
        let signer = signer("secret");
        let token = signer.session_token(7);
        assert!(signer.verify_session(7, &token));
        assert!(!signer.verify_session(8, &token));
    }
}
