//! Authentication of request owners.
//!
//! The engine only needs an owner id per request. [`TokenAuthenticator`]
//! provides one from HMAC-SHA256 bearer tokens.
//!
//! ## Token Format
//!
//! - 16 bytes: owner id
//! - 8 bytes: issue time (Unix millis, big-endian)
//! - 32 bytes: HMAC-SHA256 over the first 24 bytes
//!
//! Total: 56 bytes, base64-encoded by the transport.

use crate::error::{SyncError, SyncResult};
use chatsync_protocol::UserId;
use chatsync_storage::{Clock, SystemClock};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SIGNED_LEN: usize = 24;
const TOKEN_LEN: usize = SIGNED_LEN + 32;

/// Yields the authenticated owner of a request.
pub trait Authenticator: Send + Sync {
    /// Checks a credential and returns the owner it was issued to.
    fn authenticate(&self, token: &[u8]) -> SyncResult<UserId>;
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token lifetime.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a configuration with a 24 hour token lifetime.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_expiry: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Sets the token lifetime.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

/// Issues and checks HMAC-SHA256 owner tokens.
#[derive(Clone)]
pub struct TokenAuthenticator {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
}

impl TokenAuthenticator {
    /// Creates an authenticator on the system clock.
    pub fn new(config: AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an authenticator that checks expiry against `clock`.
    pub fn with_clock(config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Issues a token for `owner`.
    pub fn issue(&self, owner: &UserId) -> SyncResult<Vec<u8>> {
        let mut token = Vec::with_capacity(TOKEN_LEN);
        token.extend_from_slice(owner.as_bytes());
        token.extend_from_slice(&self.clock.now_millis().to_be_bytes());

        let mac = self.mac(&token)?.finalize().into_bytes();
        token.extend_from_slice(&mac);
        Ok(token)
    }

    fn mac(&self, data: &[u8]) -> SyncResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| SyncError::Internal(format!("hmac key: {e}")))?;
        mac.update(data);
        Ok(mac)
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, token: &[u8]) -> SyncResult<UserId> {
        if token.len() != TOKEN_LEN {
            return Err(SyncError::NotAuthenticated("invalid token length".into()));
        }
        let (signed, signature) = token.split_at(SIGNED_LEN);

        self.mac(signed)?
            .verify_slice(signature)
            .map_err(|_| SyncError::NotAuthenticated("invalid signature".into()))?;

        let (owner, issued) = signed.split_at(16);
        let owner = Uuid::from_slice(owner)
            .map_err(|_| SyncError::NotAuthenticated("invalid owner".into()))?;
        let issued: [u8; 8] = issued
            .try_into()
            .map_err(|_| SyncError::NotAuthenticated("invalid issue time".into()))?;
        let issued = i64::from_be_bytes(issued);

        let expiry = i64::try_from(self.config.token_expiry.as_millis()).unwrap_or(i64::MAX);
        if self.clock.now_millis() > issued.saturating_add(expiry) {
            return Err(SyncError::NotAuthenticated("token expired".into()));
        }
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_storage::ManualClock;

    fn authenticator(clock: Arc<ManualClock>) -> TokenAuthenticator {
        let config = AuthConfig::new(b"test-secret-key-32-bytes-long!!".to_vec())
            .with_expiry(Duration::from_secs(60));
        TokenAuthenticator::with_clock(config, clock)
    }

    #[test]
    fn issue_and_authenticate() {
        let auth = authenticator(Arc::new(ManualClock::new(1_000)));
        let owner = Uuid::new_v4();

        let token = auth.issue(&owner).unwrap();
        assert_eq!(token.len(), 56);
        assert_eq!(auth.authenticate(&token).unwrap(), owner);
    }

    #[test]
    fn reject_tampered_token() {
        let auth = authenticator(Arc::new(ManualClock::new(1_000)));
        let mut token = auth.issue(&Uuid::new_v4()).unwrap();
        token[0] ^= 0xff;

        let result = auth.authenticate(&token);
        assert!(matches!(result, Err(SyncError::NotAuthenticated(_))));
    }

    #[test]
    fn reject_wrong_secret() {
        let clock = Arc::new(ManualClock::new(1_000));
        let token = authenticator(clock.clone()).issue(&Uuid::new_v4()).unwrap();
        let other = TokenAuthenticator::with_clock(AuthConfig::new(b"another".to_vec()), clock);
        assert!(other.authenticate(&token).is_err());
    }

    #[test]
    fn reject_expired_token() {
        let clock = Arc::new(ManualClock::new(1_000));
        let auth = authenticator(clock.clone());
        let token = auth.issue(&Uuid::new_v4()).unwrap();

        clock.advance(60_000);
        assert!(auth.authenticate(&token).is_ok());
        clock.advance(1);
        let result = auth.authenticate(&token);
        assert!(matches!(result, Err(SyncError::NotAuthenticated(msg)) if msg.contains("expired")));
    }

    #[test]
    fn reject_invalid_length() {
        let auth = authenticator(Arc::new(ManualClock::new(0)));
        assert!(auth.authenticate(b"short").is_err());
        assert_eq!(auth.authenticate(&[]).unwrap_err().status_code(), 401);
    }
}
