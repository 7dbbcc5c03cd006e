//! In-memory sessions and pending OAuth logins.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::AuthConfig;
use crate::core::errors::{HubError, HubResult};
use crate::core::ids::SessionId;
use crate::core::provider::Provider;

const STATE_LEN: usize = 32;

/// Who signed in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider-side user id.
    pub id: String,
    /// Display name (falls back to the login or email).
    pub name: String,
    /// Email, when the provider shares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A signed-in user and their provider access token.
#[derive(Clone, Debug)]
pub struct Session {
    /// Session id, carried by the session cookie.
    pub id: SessionId,
    /// Provider the user signed in with.
    pub provider: Provider,
    /// User profile.
    pub user: UserProfile,
    /// Provider access token.
    pub access_token: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is past its expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Public view without the access token.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            provider: self.provider,
            user: self.user.clone(),
            expires: self.expires_at,
        }
    }
}

/// What `GET /api/auth/session` returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionView {
    /// Provider the user signed in with.
    pub provider: Provider,
    /// User profile.
    pub user: UserProfile,
    /// Expiry time.
    pub expires: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct PendingLogin {
    provider: Provider,
    expires_at: Instant,
}

/// Counts from one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Expired sessions removed.
    pub sessions: usize,
    /// Expired login states removed.
    pub logins: usize,
}

/// Thread-safe session and login-state registry.
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
    pending: DashMap<String, PendingLogin>,
    session_ttl: chrono::Duration,
    login_ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let ttl_seconds = i64::try_from(config.session_ttl_seconds).unwrap_or(i64::MAX);
        Self {
            sessions: DashMap::new(),
            pending: DashMap::new(),
            session_ttl: chrono::Duration::try_seconds(ttl_seconds)
                .unwrap_or_else(|| chrono::Duration::days(30)),
            login_ttl: Duration::from_secs(config.login_ttl_seconds),
            max_sessions: config.max_sessions.max(1),
        }
    }

    /// Register a fresh random `state` for a login redirect.
    #[must_use]
    pub fn begin_login(&self, provider: Provider) -> String {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();
        self.pending.insert(
            state.clone(),
            PendingLogin {
                provider,
                expires_at: Instant::now() + self.login_ttl,
            },
        );
        state
    }

    /// Consume a login `state`. Each state is usable once.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidInput`] if the state is unknown, expired,
    /// or was issued for another provider.
    pub fn complete_login(&self, state: &str, provider: Provider) -> HubResult<()> {
        let Some((_, pending)) = self.pending.remove(state) else {
            return Err(HubError::InvalidInput("unknown login state".to_string()));
        };
        if Instant::now() > pending.expires_at {
            return Err(HubError::InvalidInput("login state expired".to_string()));
        }
        if pending.provider != provider {
            return Err(HubError::InvalidInput(
                "login state was issued for another provider".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a session. `expires_in` (seconds, from the token response)
    /// shortens the configured lifetime when given.
    pub fn create(
        &self,
        provider: Provider,
        user: UserProfile,
        access_token: String,
        expires_in: Option<u64>,
    ) -> Session {
        let created_at = Utc::now();
        let ttl = expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
            .map_or(self.session_ttl, |token_ttl| token_ttl.min(self.session_ttl));

        let session = Session {
            id: SessionId::new(),
            provider,
            user,
            access_token,
            created_at,
            expires_at: created_at + ttl,
        };

        self.enforce_max_sessions();
        self.sessions.insert(session.id, session.clone());
        debug!(session = %session.id, provider = %provider, "Created session");
        session
    }

    /// Look up a live session; expired sessions are dropped on access.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions.get(&id).and_then(|entry| {
            if entry.is_expired_at(Utc::now()) {
                drop(entry);
                self.sessions.remove(&id);
                None
            } else {
                Some(entry.clone())
            }
        })
    }

    /// Remove a session. Returns whether it existed.
    pub fn remove(&self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Number of stored sessions, expired ones included until the next sweep.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop expired sessions and login states.
    pub fn cleanup_expired(&self) -> SweepStats {
        let now = Utc::now();
        let before_sessions = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));

        let instant = Instant::now();
        let before_logins = self.pending.len();
        self.pending.retain(|_, login| instant <= login.expires_at);

        SweepStats {
            sessions: before_sessions.saturating_sub(self.sessions.len()),
            logins: before_logins.saturating_sub(self.pending.len()),
        }
    }

    /// Make room for one more session, oldest first.
    fn enforce_max_sessions(&self) {
        if self.sessions.len() < self.max_sessions {
            return;
        }
        self.cleanup_expired();

        let excess = (self.sessions.len() + 1).saturating_sub(self.max_sessions);
        if excess == 0 {
            return;
        }
        let mut by_age: Vec<(DateTime<Utc>, SessionId)> = self
            .sessions
            .iter()
            .map(|entry| (entry.created_at, *entry.key()))
            .collect();
        by_age.sort_unstable();
        for (_, id) in by_age.into_iter().take(excess) {
            self.sessions.remove(&id);
        }
    }

    #[cfg(test)]
    fn insert_raw(&self, session: Session) {
        self.sessions.insert(session.id, session);
    }
}
