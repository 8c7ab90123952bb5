//! Route guard for authenticated and admin-only screens.
//!
//! The backend enforces row-level security on its own; this only decides
//! whether the client should render a screen or send the user elsewhere.

use tracing::debug;

use super::store::SessionStore;
use crate::navigation::{Screen, ROLE_ADMIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// No identity; send the user to the sign-in screen.
    RequiresLogin,
    /// Signed in but lacking the role.
    Forbidden,
}

/// Decides access to `path` for the current session. Unknown paths need an
/// identity, like every other non-public screen.
pub fn authorize(path: &str, store: &SessionStore) -> Access {
    let screen = Screen::from_path(path);
    if screen.is_some_and(Screen::is_public) {
        return Access::Allowed;
    }
    if store.identity().is_none() {
        debug!(path, "route needs a signed-in user");
        return Access::RequiresLogin;
    }
    if screen.is_some_and(Screen::is_admin) && !store.has_role(ROLE_ADMIN) {
        debug!(path, "route needs the admin role");
        return Access::Forbidden;
    }
    Access::Allowed
}
