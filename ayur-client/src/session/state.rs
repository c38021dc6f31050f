//! Session state and the snapshots published to observers

use shared::{RoleQuery, UserRecord};

/// Where the session is in its lifecycle
///
/// ```text
/// restoring ──token──▶ verifying ──ok──▶ authenticated
///     │                    │                  │
///     └──none──▶ anonymous ◀──fail──┘     logout
///                  │   ▲                      │
///          login/  │   └──fail── authenticating
///          register└──────────▶ (ok ▶ authenticated)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Restoring,
    Verifying,
    Anonymous,
    Authenticating,
    Authenticated,
}

/// In-flight operation that owns the loading flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    Restoring,
    Verifying,
    Authenticating,
}

/// Mutable session, only touched under the manager's lock
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub token: Option<String>,
    pub user: Option<UserRecord>,
    pub pending: Option<Pending>,
    pub error: Option<String>,
    /// A user snapshot sits in persisted storage
    pub has_user_snapshot: bool,
    /// Bumped by every authentication attempt and every sign-out
    pub generation: u64,
    /// Bumped by restore and sign-out only; login and register leave it alone
    pub verification: u64,
    /// The current token came from storage and `auth/me` has not accepted it yet
    pub unverified: bool,
}

impl SessionState {
    /// Fresh process state: restore has not settled yet
    pub fn initial() -> Self {
        Self {
            token: None,
            user: None,
            pending: Some(Pending::Restoring),
            error: None,
            has_user_snapshot: false,
            generation: 0,
            verification: 0,
            unverified: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.pending {
            Some(Pending::Restoring) => SessionStatus::Restoring,
            Some(Pending::Verifying) => SessionStatus::Verifying,
            Some(Pending::Authenticating) => SessionStatus::Authenticating,
            None if self.token.is_some() && self.user.is_some() => SessionStatus::Authenticated,
            None => SessionStatus::Anonymous,
        }
    }

    /// User as consumers may see it: never without a token
    pub fn visible_user(&self) -> Option<&UserRecord> {
        self.token.as_ref().and(self.user.as_ref())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token.clone(),
            current_user: self.visible_user().cloned(),
            loading: self.pending.is_some(),
            error: self.error.clone(),
            status: self.status(),
            has_user_snapshot: self.has_user_snapshot,
        }
    }
}

/// Read-only view of the session at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub current_user: Option<UserRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub status: SessionStatus,
    pub has_user_snapshot: bool,
}

impl SessionSnapshot {
    /// Token present and either a resolved user or a persisted snapshot.
    ///
    /// The snapshot branch covers the window in which a restored session is
    /// still being verified.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && (self.current_user.is_some() || self.has_user_snapshot)
    }

    /// Role predicate over the visible user
    pub fn has_role(&self, query: impl RoleQuery) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|user| user.has_role(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Role;

    fn customer() -> UserRecord {
        UserRecord::new("u1", "Kamal", "k@example.com", Some(Role::Customer))
    }

    #[test]
    fn test_initial_state_is_restoring() {
        let state = SessionState::initial();
        assert_eq!(state.status(), SessionStatus::Restoring);
        let snap = state.snapshot();
        assert!(snap.loading);
        assert!(!snap.is_authenticated());
    }

    #[test]
    fn test_user_without_token_is_hidden() {
        let mut state = SessionState::initial();
        state.pending = None;
        state.user = Some(customer());
        assert!(state.visible_user().is_none());

        let snap = state.snapshot();
        assert!(snap.current_user.is_none());
        assert!(!snap.has_role(Role::Customer));
        assert_eq!(snap.status, SessionStatus::Anonymous);
    }

    #[test]
    fn test_authenticated_status() {
        let mut state = SessionState::initial();
        state.pending = None;
        state.token = Some("abc".into());
        state.user = Some(customer());
        let snap = state.snapshot();
        assert_eq!(snap.status, SessionStatus::Authenticated);
        assert!(snap.is_authenticated());
        assert!(snap.has_role(Role::Customer));
        assert!(!snap.has_role([Role::Admin, Role::Seller]));
    }

    #[test]
    fn test_token_with_persisted_snapshot_counts_as_authenticated() {
        let mut state = SessionState::initial();
        state.pending = Some(Pending::Verifying);
        state.token = Some("abc".into());
        state.has_user_snapshot = true;
        let snap = state.snapshot();
        assert_eq!(snap.status, SessionStatus::Verifying);
        assert!(snap.is_authenticated());

        state.has_user_snapshot = false;
        assert!(!state.snapshot().is_authenticated());
    }
}
