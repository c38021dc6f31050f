//! Route gating over a session snapshot
//!
//! Protected routes check the session before rendering. The session is the
//! only input; nothing here talks to the backend.
//!
//! # Usage
//!
//! ```ignore
//! let guard = RouteGuard::roles(&[Role::Seller]);
//! match guard.check(&session.snapshot()) {
//!     Access::Granted => render_dashboard(),
//!     Access::Pending => render_spinner(),
//!     Access::RedirectToLogin => navigate(LOGIN_ROUTE),
//!     Access::Unauthorized => navigate(UNAUTHORIZED_ROUTE),
//! }
//! ```

use shared::{Role, UserRecord};

use crate::session::SessionSnapshot;

pub const LOGIN_ROUTE: &str = "/login";
pub const UNAUTHORIZED_ROUTE: &str = "/unauthorized";

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session still restoring or authenticating, decide later
    Pending,
    Granted,
    /// No session
    RedirectToLogin,
    /// Signed in, but the role is missing, unknown or not allowed
    Unauthorized,
}

/// Requirement a route places on the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    allowed: Option<Vec<Role>>,
}

impl RouteGuard {
    /// Any signed-in user
    pub fn authenticated() -> Self {
        Self { allowed: None }
    }

    /// Signed-in user holding one of `roles`
    pub fn roles(roles: &[Role]) -> Self {
        Self {
            allowed: Some(roles.to_vec()),
        }
    }

    pub fn check(&self, session: &SessionSnapshot) -> Access {
        if session.loading {
            return Access::Pending;
        }
        if !session.is_authenticated() {
            return Access::RedirectToLogin;
        }
        match &self.allowed {
            None => Access::Granted,
            Some(roles) if session.has_role(roles) => Access::Granted,
            Some(roles) => {
                tracing::warn!(
                    user_id = ?session.current_user.as_ref().map(|u| &u.id),
                    required = ?roles,
                    "Route requires a different role"
                );
                Access::Unauthorized
            }
        }
    }
}

/// Where to send a user right after authenticating
pub fn landing_route(user: Option<&UserRecord>) -> &'static str {
    match user {
        None => LOGIN_ROUTE,
        Some(user) => user.role.map_or(UNAUTHORIZED_ROUTE, |role| role.landing_route()),
    }
}
