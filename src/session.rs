//! Anti-forgery tokens for relay calls.
//!
//! A token is an HMAC-SHA256 of the action name and a time tick, keyed by a
//! server secret. The tick advances every half lifetime and a token stays
//! valid for the current and the previous tick, so a freshly minted token
//! lives between one half and one full lifetime. Nothing is stored.

use crate::config::SessionConfig;
use crate::error::RelayError;
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const TOKEN_LEN: usize = 20;

pub struct SessionGuard {
    secret: SecretString,
    lifetime: Duration,
}

impl SessionGuard {
    pub fn new(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            // A zero lifetime would make every tick zero-width.
            lifetime: lifetime.max(Duration::from_secs(2)),
        }
    }

    /// Use the configured secret, or a random one that dies with the process.
    pub fn from_config(cfg: &SessionConfig) -> Self {
        let secret = match &cfg.secret {
            Some(s) if !s.is_empty() => s.clone(),
            _ => hex::encode(rand::random::<[u8; 32]>()),
        };
        Self::new(secret, Duration::from_secs(cfg.lifetime_secs))
    }

    pub fn mint(&self, action: &str) -> String {
        self.mint_at(action, now_secs())
    }

    pub fn mint_at(&self, action: &str, now: u64) -> String {
        self.compute(action, self.tick(now))
    }

    pub fn verify(&self, action: &str, token: &str) -> Result<(), RelayError> {
        self.verify_at(action, token, now_secs())
    }

    pub fn verify_at(&self, action: &str, token: &str, now: u64) -> Result<(), RelayError> {
        if token.is_empty() {
            warn!(action, "missing session token");
            return Err(RelayError::Authorization);
        }

        let tick = self.tick(now);
        for (age, t) in [(0, tick), (1, tick.saturating_sub(1))] {
            let expected = self.compute(action, t);
            if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
                debug!(action, age, "session token verified");
                return Ok(());
            }
        }

        warn!(action, "session token verification failed");
        Err(RelayError::Authorization)
    }

    fn tick(&self, now: u64) -> u64 {
        let half = (self.lifetime.as_secs() / 2).max(1);
        now.div_ceil(half)
    }

    fn compute(&self, action: &str, tick: u64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{tick}|{action}").as_bytes());
        let mut out = hex::encode(mac.finalize().into_bytes());
        out.truncate(TOKEN_LEN);
        out
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("secret", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn guard() -> SessionGuard {
        SessionGuard::new("test-secret", Duration::from_secs(DAY))
    }

    #[test]
    fn minted_token_verifies() {
        let g = guard();
        let tok = g.mint("generate_content");
        assert_eq!(tok.len(), TOKEN_LEN);
        assert!(g.verify("generate_content", &tok).is_ok());
    }

    #[test]
    fn token_is_bound_to_action() {
        let g = guard();
        let tok = g.mint_at("generate_content", 1_000_000);
        assert_eq!(
            g.verify_at("delete_everything", &tok, 1_000_000),
            Err(RelayError::Authorization)
        );
    }

    #[test]
    fn token_is_bound_to_secret() {
        let tok = guard().mint_at("generate_content", 1_000_000);
        let other = SessionGuard::new("other-secret", Duration::from_secs(DAY));
        assert!(other.verify_at("generate_content", &tok, 1_000_000).is_err());
    }

    #[test]
    fn token_survives_one_tick_then_expires() {
        let g = guard();
        let now = 10 * DAY;
        let tok = g.mint_at("generate_content", now);
        assert!(g.verify_at("generate_content", &tok, now + DAY / 2).is_ok());
        assert!(g.verify_at("generate_content", &tok, now + DAY + 1).is_err());
    }

    #[test]
    fn empty_or_garbage_token_is_rejected() {
        let g = guard();
        assert!(g.verify("generate_content", "").is_err());
        assert!(g.verify("generate_content", "not-a-token").is_err());
    }

    #[test]
    fn random_secrets_differ() {
        let a = SessionGuard::from_config(&SessionConfig::default());
        let b = SessionGuard::from_config(&SessionConfig::default());
        assert_ne!(a.mint_at("x", 42), b.mint_at("x", 42));
    }
}
