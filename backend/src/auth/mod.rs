//! Authentication module for session state, role checks and access control.
//!
//! This module provides the session store, the role data loader, the
//! synchronizer that follows the provider's session events, the sign-in and
//! registration flows, and the route guard.

pub mod errors;
pub mod loader;
pub mod middleware;
pub mod models;
pub mod service;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use errors::*;
pub use loader::RoleDataLoader;
pub use middleware::{authorize, Access};
pub use models::*;
pub use service::AuthService;
pub use store::{RoleDataOutcome, SessionStore, SNAPSHOT_KEY};
pub use sync::{AuthSynchronizer, SyncHandle};
