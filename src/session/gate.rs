use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    clock::{Clock, SystemClock},
    store::{SessionStore, EXPIRATION_KEY, SESSION_KEYS, TOKEN_KEY, USERNAME_KEY},
    token::{generate_token, tokens_match},
};
use crate::{config::AdminConfig, error::AuthError};

pub const SESSION_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// What the gate currently believes about the admin session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AuthState {
    /// The persisted record has not been read yet.
    Loading,
    Authorized { username: String },
    Unauthorized,
}

/// What a protected page should do with the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    Loading,
    RedirectToLogin,
}

/// Navigation the caller should perform after a login or logout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Redirect {
    AdminRoot(String),
    PublicRoot,
}

impl Redirect {
    pub fn path(&self) -> String {
        match self {
            Redirect::AdminRoot(segment) => format!("/{}", segment),
            Redirect::PublicRoot => "/".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub token: String,
    pub username: String,
    pub expires_at: i64,
}

enum Stored {
    Missing,
    Corrupt,
    Present(SessionRecord),
}

/// The admin session gate.
///
/// Credentials are checked against the configured admin pair. A successful
/// login persists a record that expires after 24 hours; expiry is only
/// noticed the next time the record is checked.
pub struct SessionGate<S, C = SystemClock> {
    admin: AdminConfig,
    store: S,
    clock: C,
    state: AuthState,
}

impl<S: SessionStore> SessionGate<S> {
    pub fn new(admin: AdminConfig, store: S) -> Self {
        Self::with_clock(admin, store, SystemClock)
    }
}

impl<S: SessionStore, C: Clock> SessionGate<S, C> {
    pub fn with_clock(admin: AdminConfig, store: S, clock: C) -> Self {
        Self {
            admin,
            store,
            clock,
            state: AuthState::Loading,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn admin_path(&self) -> &str {
        &self.admin.path
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self.state, AuthState::Authorized { .. })
    }

    pub fn route_decision(&self) -> RouteDecision {
        match self.state {
            AuthState::Loading => RouteDecision::Loading,
            AuthState::Authorized { .. } => RouteDecision::Render,
            AuthState::Unauthorized => RouteDecision::RedirectToLogin,
        }
    }

    /// Reads the persisted record and settles the state.
    ///
    /// Expired, partial or unreadable records are purged.
    pub fn check_session(&mut self) -> &AuthState {
        self.settle();
        &self.state
    }

    /// Settles the state from one read of the store and returns the live
    /// record, if there is one.
    fn settle(&mut self) -> Option<SessionRecord> {
        let (state, live) = match self.load() {
            Stored::Missing => (AuthState::Unauthorized, None),
            Stored::Corrupt => {
                warn!("Discarding corrupted admin session");
                self.purge();
                (AuthState::Unauthorized, None)
            }
            Stored::Present(record) if self.clock.now_millis() < record.expires_at => (
                AuthState::Authorized {
                    username: record.username.clone(),
                },
                Some(record),
            ),
            Stored::Present(record) => {
                info!("Admin session for {} expired", record.username);
                self.purge();
                (AuthState::Unauthorized, None)
            }
        };
        self.state = state;
        live
    }

    /// Checks the credentials and, on success, tells the caller to go to the
    /// admin root.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Redirect, AuthError> {
        self.sign_in(username, password)?;
        Ok(Redirect::AdminRoot(self.admin.path.clone()))
    }

    /// Like `login`, but hands back the freshly issued record.
    pub fn sign_in(&mut self, username: &str, password: &str) -> Result<SessionRecord, AuthError> {
        if username != self.admin.username || password != self.admin.password {
            warn!("Rejected admin login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let record = SessionRecord {
            token: generate_token(),
            username: username.to_owned(),
            expires_at: self.clock.now_millis() + SESSION_TTL_MILLIS,
        };
        self.persist(&record);
        info!("Admin {} logged in", record.username);

        self.state = AuthState::Authorized {
            username: record.username.clone(),
        };
        Ok(record)
    }

    pub fn logout(&mut self) -> Redirect {
        self.purge();
        if let AuthState::Authorized { username } = &self.state {
            info!("Admin {} logged out", username);
        }
        self.state = AuthState::Unauthorized;
        Redirect::PublicRoot
    }

    /// The live persisted record, if any. Runs the same expiry check as
    /// `check_session`.
    pub fn session(&mut self) -> Option<SessionRecord> {
        self.settle()
    }

    /// True when `token` is the token of the live session.
    pub fn verify_token(&mut self, token: &str) -> bool {
        self.session()
            .map(|record| tokens_match(&record.token, token))
            .unwrap_or(false)
    }

    fn load(&self) -> Stored {
        let read = |key: &str| match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("Could not read {key}: {err}");
                None
            }
        };
        let (token, username, expiration) = (read(TOKEN_KEY), read(USERNAME_KEY), read(EXPIRATION_KEY));

        match (token, username, expiration) {
            (None, None, None) => Stored::Missing,
            (Some(token), Some(username), Some(expiration)) => {
                match expiration.trim().parse::<i64>() {
                    Ok(expires_at) if !token.is_empty() && !username.is_empty() => {
                        Stored::Present(SessionRecord {
                            token,
                            username,
                            expires_at,
                        })
                    }
                    _ => Stored::Corrupt,
                }
            }
            _ => Stored::Corrupt,
        }
    }

    fn persist(&self, record: &SessionRecord) {
        let entries = [
            (TOKEN_KEY, record.token.clone()),
            (USERNAME_KEY, record.username.clone()),
            (EXPIRATION_KEY, record.expires_at.to_string()),
        ];
        for (key, value) in entries {
            if let Err(err) = self.store.set(key, &value) {
                warn!("Could not persist {key}: {err}");
            }
        }
    }

    fn purge(&self) {
        for key in SESSION_KEYS {
            if let Err(err) = self.store.remove(key) {
                warn!("Could not remove {key}: {err}");
            }
        }
        debug!("Admin session record purged");
    }
}
