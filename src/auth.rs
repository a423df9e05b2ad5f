//! Admin credentials
//!
//! A game's admin secret is kept only as a SHA-256 digest and compared in constant time.
//! Privileged events re-present the secret on every call, either explicitly in the payload
//! or through the connection's [`CredentialStore`].

use sha2::{Digest, Sha256};
use std::sync::Mutex;

use crate::types::GameId;

/// Digest of a game's admin secret
#[derive(Clone)]
pub struct AdminSecret {
    digest: [u8; 32],
}

impl AdminSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Check a presented secret against the stored digest
    pub fn verify(&self, presented: &str) -> bool {
        let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        constant_time_eq(&self.digest, &presented)
    }

    /// Short fingerprint for logs (never the secret itself)
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.digest[..4])
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminSecret({})", self.fingerprint())
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Where a connection keeps the secret it presents for privileged events.
///
/// The store only supplies a candidate secret. The engine verifies it again on each call.
pub trait CredentialStore: Send + Sync {
    fn remember(&self, game_id: &str, secret: &str);

    fn recall(&self, game_id: &str) -> Option<String>;

    fn forget(&self);
}

/// Remembers the secret from the last successful `admin_login` on this connection
#[derive(Default)]
pub struct SessionCredentials {
    slot: Mutex<Option<(GameId, String)>>,
}

impl CredentialStore for SessionCredentials {
    fn remember(&self, game_id: &str, secret: &str) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some((game_id.to_string(), secret.to_string()));
        }
    }

    fn recall(&self, game_id: &str) -> Option<String> {
        let slot = self.slot.lock().ok()?;
        match slot.as_ref() {
            Some((g, secret)) if g == game_id => Some(secret.clone()),
            _ => None,
        }
    }

    fn forget(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// Never remembers anything; every privileged event must carry `password`
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    fn remember(&self, _game_id: &str, _secret: &str) {}

    fn recall(&self, _game_id: &str) -> Option<String> {
        None
    }

    fn forget(&self) {}
}

/// Build the credential store a new connection should use
pub fn credential_store(remember_admin_secret: bool) -> Box<dyn CredentialStore> {
    if remember_admin_secret {
        Box::new(SessionCredentials::default())
    } else {
        Box::new(NoCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_secret_verify() {
        let secret = AdminSecret::new("hunter2");
        assert!(secret.verify("hunter2"));
        assert!(!secret.verify("hunter3"));
        assert!(!secret.verify(""));
    }

    #[test]
    fn test_admin_secret_debug_hides_secret() {
        let secret = AdminSecret::new("hunter2");
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("hunter2"));
        assert!(printed.starts_with("AdminSecret("));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_session_credentials_scoped_to_game() {
        let store = SessionCredentials::default();
        assert_eq!(store.recall("g1"), None);

        store.remember("g1", "pw");
        assert_eq!(store.recall("g1"), Some("pw".to_string()));
        assert_eq!(store.recall("g2"), None);

        store.forget();
        assert_eq!(store.recall("g1"), None);
    }

    #[test]
    fn test_no_credentials_never_recalls() {
        let store = credential_store(false);
        store.remember("g1", "pw");
        assert_eq!(store.recall("g1"), None);
    }
}
