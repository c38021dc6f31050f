//! Session manager
//!
//! Single source of truth for who is signed in, with which role, and whether
//! that still holds. One [`SessionManager`] is built at the composition root
//! and cloned into whatever needs it; clones share the same session.
//!
//! Every authentication attempt and every sign-out bumps a generation counter.
//! Results arriving for an older generation are dropped, so a `logout()` issued
//! while `login()` is in flight stays signed out.
//!
//! Verification of a restored token is tracked separately and only reset by
//! `restore()` and `logout()`. A login that fails while `auth/me` is pending
//! leaves the verdict to `auth/me`; one that succeeds replaces the token and
//! the verdict is dropped.

mod state;

pub use state::{SessionSnapshot, SessionStatus};

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use shared::client::{first_validation_message, AuthSession};
use shared::{
    LoginRequest, PasswordUpdate, ProfileUpdate, RegisterRequest, Role, RoleQuery, UserRecord,
};
use tokio::sync::watch;
use validator::Validate;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{AuthApi, NetworkHttpClient};
use crate::storage::{
    FileStore, KeyValueStore, MemoryStore, SESSION_KEYS, TOKEN_KEY, USER_KEY,
};
use state::{Pending, SessionState};

/// File name of the persisted session inside the storage directory
pub const SESSION_FILE: &str = "session.json";

const LOGIN_FAILED: &str = "Login failed. Please try again.";
const REGISTER_FAILED: &str = "Registration failed. Please try again.";
const PROFILE_FAILED: &str = "Failed to update profile.";
const PASSWORD_FAILED: &str = "Failed to update password.";

/// Shared handle on the process session
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<SessionState>,
    events: watch::Sender<SessionSnapshot>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("SessionManager")
            .field("status", &snapshot.status)
            .field("user_id", &snapshot.current_user.as_ref().map(|u| &u.id))
            .finish()
    }
}

impl SessionManager {
    /// Build a manager over an API and a storage backend.
    ///
    /// The session starts in [`SessionStatus::Restoring`]; call
    /// [`restore`](Self::restore) once at startup.
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        let state = SessionState::initial();
        let (events, _) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(Inner {
                api,
                storage,
                state: Mutex::new(state),
                events,
            }),
        }
    }

    /// Build the network client and storage described by `config`.
    ///
    /// Returns the HTTP client too so other components can share the
    /// credential the session maintains.
    pub fn from_config(config: &ClientConfig) -> ClientResult<(Self, NetworkHttpClient)> {
        let http = NetworkHttpClient::new(config)?;
        let storage: Arc<dyn KeyValueStore> = match &config.storage_dir {
            Some(dir) => Arc::new(FileStore::new(dir, SESSION_FILE)),
            None => Arc::new(MemoryStore::new()),
        };
        let manager = Self::new(Arc::new(http.clone()), storage);
        Ok((manager, http))
    }

    // ========== State plumbing ==========

    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state);
        self.inner.events.send_replace(state.snapshot());
        result
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Drop token, user and every persisted key. Never fails.
    fn clear(&self, state: &mut SessionState) {
        if let Err(e) = self.inner.storage.remove_all(&SESSION_KEYS) {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
        self.inner.api.set_credential(None);

        state.generation += 1;
        state.verification += 1;
        state.unverified = false;
        state.token = None;
        state.user = None;
        state.pending = None;
        state.error = None;
        state.has_user_snapshot = false;
    }

    /// Drop a restored token that `auth/me` refused. A login or register
    /// started meanwhile keeps running.
    fn discard_unverified(&self, state: &mut SessionState) {
        if let Err(e) = self.inner.storage.remove_all(&SESSION_KEYS) {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
        self.inner.api.set_credential(None);

        state.unverified = false;
        state.token = None;
        state.user = None;
        state.has_user_snapshot = false;
        if state.pending == Some(Pending::Verifying) {
            state.pending = None;
        }
    }

    /// Loading state left behind when an attempt ends without a new session
    fn settled_pending(state: &SessionState) -> Option<Pending> {
        state.unverified.then_some(Pending::Verifying)
    }

    fn persist_session(&self, session: &AuthSession) -> ClientResult<()> {
        let user_json = serde_json::to_string(&session.user)?;
        self.inner.storage.write_batch(vec![
            (TOKEN_KEY, Some(session.token.clone())),
            (USER_KEY, Some(user_json)),
        ])?;
        Ok(())
    }

    fn persist_user(&self, user: &UserRecord) -> ClientResult<()> {
        let user_json = serde_json::to_string(user)?;
        self.inner.storage.set(USER_KEY, user_json)?;
        Ok(())
    }

    fn read_user_snapshot(&self) -> Option<UserRecord> {
        let raw = match self.inner.storage.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted user");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(error = %e, "Ignoring unreadable user snapshot"))
            .ok()
    }

    fn record_error(&self, err: &ClientError, fallback: &str) {
        let message = err.user_message(fallback);
        self.update(|s| s.error = Some(message));
    }

    // ========== Lifecycle ==========

    /// Restore a persisted session. Never fails; returns the settled status.
    ///
    /// The persisted user snapshot is published immediately, then replaced by
    /// the server's record once `auth/me` accepts the token. If it does not,
    /// the session is cleared silently.
    pub async fn restore(&self) -> SessionStatus {
        let (generation, verification) = self.update(|s| {
            s.generation += 1;
            s.verification += 1;
            s.pending = Some(Pending::Restoring);
            (s.generation, s.verification)
        });

        let token = match self.inner.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let Some(token) = token else {
            self.update(|s| {
                if s.generation == generation {
                    s.pending = None;
                }
            });
            tracing::debug!("No persisted session");
            return self.status();
        };

        let snapshot = self.read_user_snapshot();
        let verifying = self.update(|s| {
            if s.generation != generation {
                return false;
            }
            self.inner.api.set_credential(Some(&token));
            s.has_user_snapshot = snapshot.is_some();
            s.token = Some(token);
            s.user = snapshot;
            s.unverified = true;
            s.pending = Some(Pending::Verifying);
            true
        });
        if !verifying {
            return self.status();
        }

        match self.inner.api.me().await {
            Ok(user) => {
                let user_id = user.id.clone();
                let role = user.role;
                let applied = self.update(|s| {
                    if s.verification != verification || !s.unverified {
                        return false;
                    }
                    match self.persist_user(&user) {
                        Ok(()) => s.has_user_snapshot = true,
                        Err(e) => tracing::warn!(error = %e, "Failed to refresh user snapshot"),
                    }
                    s.user = Some(user);
                    s.unverified = false;
                    if s.pending == Some(Pending::Verifying) {
                        s.pending = None;
                    }
                    true
                });
                if applied {
                    tracing::info!(user_id = %user_id, role = ?role, "Session restored");
                }
            }
            Err(e) => {
                tracing::info!(error = %e, "Persisted session rejected, signing out");
                self.update(|s| {
                    if s.verification == verification && s.unverified {
                        self.discard_unverified(s);
                    }
                });
            }
        }

        self.status()
    }

    /// Sign in with email and password.
    ///
    /// On failure the prior session is left as it was, `error` holds the
    /// message to display and the error is returned.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserRecord> {
        let request = LoginRequest::new(email, password);
        if let Err(errors) = request.validate() {
            let err = ClientError::Validation(first_validation_message(&errors));
            self.record_error(&err, LOGIN_FAILED);
            return Err(err);
        }

        let generation = self.begin_authenticating();
        let result = self.inner.api.login(&request).await;
        self.finish_authenticating("login", generation, result, LOGIN_FAILED)
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, data: &RegisterRequest) -> ClientResult<UserRecord> {
        if let Err(message) = data.check() {
            let err = ClientError::Validation(message);
            self.record_error(&err, REGISTER_FAILED);
            return Err(err);
        }

        let generation = self.begin_authenticating();
        let result = self.inner.api.register(data).await;
        self.finish_authenticating("register", generation, result, REGISTER_FAILED)
    }

    fn begin_authenticating(&self) -> u64 {
        self.update(|s| {
            s.generation += 1;
            s.pending = Some(Pending::Authenticating);
            s.error = None;
            s.generation
        })
    }

    fn finish_authenticating(
        &self,
        operation: &'static str,
        generation: u64,
        result: ClientResult<AuthSession>,
        fallback: &str,
    ) -> ClientResult<UserRecord> {
        let session = match result {
            Ok(session) => session,
            Err(err) => {
                log_failure(operation, &err);
                self.update(|s| {
                    if s.generation == generation {
                        s.pending = Self::settled_pending(s);
                        s.error = Some(err.user_message(fallback));
                    }
                });
                return Err(err);
            }
        };

        let outcome = self.update(|s| {
            if s.generation != generation {
                return Err(ClientError::SessionChanged);
            }
            // Storage first: memory only changes once the batch is on disk
            if let Err(err) = self.persist_session(&session) {
                s.pending = Self::settled_pending(s);
                s.error = Some(err.user_message(fallback));
                return Err(err);
            }
            self.inner.api.set_credential(Some(&session.token));
            s.token = Some(session.token.clone());
            s.user = Some(session.user.clone());
            s.has_user_snapshot = true;
            s.unverified = false;
            s.pending = None;
            s.error = None;
            Ok(session.user.clone())
        });

        match &outcome {
            Ok(user) => {
                tracing::info!(operation, user_id = %user.id, role = ?user.role, "Signed in")
            }
            Err(ClientError::SessionChanged) => {
                tracing::info!(operation, "Session changed during request, discarding result")
            }
            Err(e) => tracing::error!(operation, error = %e, "Failed to persist session"),
        }
        outcome
    }

    /// Sign out. Synchronous, unconditional, idempotent.
    pub fn logout(&self) {
        self.update(|s| self.clear(s));
        tracing::info!("Signed out");
    }

    // ========== Profile ==========

    /// Send a partial profile update and adopt the server's record.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<UserRecord> {
        let generation = self.update(|s| {
            s.error = None;
            s.generation
        });

        let user = match self.inner.api.update_profile(update).await {
            Ok(user) => user,
            Err(err) => {
                log_failure("update_profile", &err);
                self.update(|s| {
                    if s.generation == generation {
                        s.error = Some(err.user_message(PROFILE_FAILED));
                    }
                });
                return Err(err);
            }
        };

        self.update(|s| {
            if s.generation != generation || s.token.is_none() {
                return Err(ClientError::SessionChanged);
            }
            if let Err(err) = self.persist_user(&user) {
                tracing::error!(error = %err, "Failed to persist updated profile");
                s.error = Some(err.user_message(PROFILE_FAILED));
                return Err(err);
            }
            s.user = Some(user.clone());
            s.has_user_snapshot = true;
            Ok(user)
        })
    }

    /// Change the account password. Leaves the session untouched.
    pub async fn update_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> ClientResult<()> {
        let generation = self.update(|s| {
            s.error = None;
            s.generation
        });

        let update = PasswordUpdate::new(current_password, new_password);
        match self.inner.api.update_password(&update).await {
            Ok(()) => {
                tracing::info!("Password updated");
                Ok(())
            }
            Err(err) => {
                log_failure("update_password", &err);
                self.update(|s| {
                    if s.generation == generation {
                        s.error = Some(err.user_message(PASSWORD_FAILED));
                    }
                });
                Err(err)
            }
        }
    }

    /// Dismiss the current error message
    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    // ========== Queries ==========

    /// Current snapshot of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(SessionState::snapshot)
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.events.subscribe()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.read(|s| s.visible_user().cloned())
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.token.clone())
    }

    pub fn loading(&self) -> bool {
        self.read(|s| s.pending.is_some())
    }

    pub fn error(&self) -> Option<String> {
        self.read(|s| s.error.clone())
    }

    pub fn status(&self) -> SessionStatus {
        self.read(SessionState::status)
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    /// Whether the signed-in user holds `query` (one role or any of a list)
    pub fn has_role(&self, query: impl RoleQuery) -> bool {
        self.read(|s| s.visible_user().is_some_and(|user| user.has_role(query)))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_seller(&self) -> bool {
        self.has_role(Role::Seller)
    }

    pub fn is_customer(&self) -> bool {
        self.has_role(Role::Customer)
    }
}

fn log_failure(operation: &'static str, err: &ClientError) {
    match err {
        ClientError::MalformedResponse(detail) => {
            tracing::error!(operation, detail = %detail, "Server returned a malformed response")
        }
        ClientError::Api { status, message } => tracing::warn!(
            operation,
            status,
            message = message.as_deref().unwrap_or(""),
            "Request rejected by server"
        ),
        ClientError::Network(e) => {
            tracing::warn!(operation, error = %e, "Server unreachable")
        }
        other => tracing::warn!(operation, error = %other, "Request failed"),
    }
}
