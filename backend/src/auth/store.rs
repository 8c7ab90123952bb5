//! Session store: the single source of truth for who is logged in and what
//! they may do.
//!
//! Reads are synchronous and never touch the network. Every mutation writes
//! the full [`SessionState`] snapshot to tab storage so a reload can restore
//! it before the provider has revalidated the session.

use std::sync::Arc;

use eggo_adapters::{Identity, Role, RoleAssignment};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::models::SessionState;
use crate::storage::SessionStorage;

/// Storage key of the persisted snapshot.
pub const SNAPSHOT_KEY: &str = "auth-storage";

/// Result of handing fetched role data to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDataOutcome {
    Applied,
    /// The identity changed while the data was in flight; nothing was written.
    Superseded,
}

struct Inner {
    state: SessionState,
    /// Bumped on every identity change.
    epoch: u64,
}

pub struct SessionStore {
    inner: RwLock<Inner>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// An empty store that persists to `storage`.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_state(storage, SessionState::default())
    }

    /// Rebuilds the store from the snapshot left by a previous load of the
    /// same tab. A missing or unreadable snapshot gives an empty store.
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let state = match storage.get(SNAPSHOT_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<SessionState>(&raw) {
                Ok(state) => {
                    debug!(
                        identity = ?state.identity.as_ref().map(|i| i.id.as_str()),
                        roles = state.roles.len(),
                        assignments = state.assignments.len(),
                        "restored session snapshot"
                    );
                    state
                }
                Err(err) => {
                    warn!(error = %err, "discarding undecodable session snapshot");
                    SessionState::default()
                }
            },
            Ok(None) => SessionState::default(),
            Err(err) => {
                warn!(error = %err, "failed to read session snapshot");
                SessionState::default()
            }
        };
        Self::with_state(storage, state)
    }

    fn with_state(storage: Arc<dyn SessionStorage>, state: SessionState) -> Self {
        Self {
            inner: RwLock::new(Inner { state, epoch: 0 }),
            storage,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.read().state.identity.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Replaces the identity. Roles and assignments are left as they are;
    /// the caller decides whether to clear them. Returns the new epoch.
    pub fn set_identity(&self, identity: Option<Identity>) -> u64 {
        let mut inner = self.inner.write();
        inner.state.identity = identity;
        inner.epoch += 1;
        self.persist(&inner.state);
        inner.epoch
    }

    pub fn set_roles(&self, roles: Vec<Role>) {
        let mut inner = self.inner.write();
        inner.state.roles = roles;
        self.persist(&inner.state);
    }

    pub fn set_assignments(&self, assignments: Vec<RoleAssignment>) {
        let mut inner = self.inner.write();
        inner.state.assignments = assignments;
        self.persist(&inner.state);
    }

    /// Writes role data fetched for the identity that was current at `epoch`.
    /// `None` halves keep their previous value.
    pub fn apply_role_data(
        &self,
        epoch: u64,
        roles: Option<Vec<Role>>,
        assignments: Option<Vec<RoleAssignment>>,
    ) -> RoleDataOutcome {
        let mut inner = self.inner.write();
        if inner.epoch != epoch {
            return RoleDataOutcome::Superseded;
        }
        if let Some(roles) = roles {
            inner.state.roles = roles;
        }
        if let Some(assignments) = assignments {
            inner.state.assignments = assignments;
        }
        self.persist(&inner.state);
        RoleDataOutcome::Applied
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.inner.read().state.has_role(name)
    }

    /// Names of every role the current identity holds, in reference order.
    pub fn held_roles(&self) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .state
            .roles
            .iter()
            .filter(|r| inner.state.has_role(&r.name))
            .map(|r| r.name.clone())
            .collect()
    }

    // Called with the write lock held so snapshots land in mutation order.
    fn persist(&self, state: &SessionState) {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "failed to encode session snapshot");
                return;
            }
        };
        if let Err(err) = self.storage.set(SNAPSHOT_KEY, &raw) {
            warn!(error = %err, "failed to persist session snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemorySessionStorage, StorageError};

    fn roles() -> Vec<Role> {
        vec![Role::new("r1", "admin"), Role::new("r2", "customer")]
    }

    fn store_with(storage: &MemorySessionStorage) -> SessionStore {
        SessionStore::new(Arc::new(storage.clone()))
    }

    fn scenario(storage: &MemorySessionStorage) -> SessionStore {
        let store = store_with(storage);
        store.set_roles(roles());
        store.set_assignments(vec![RoleAssignment::new("u1", "r2")]);
        store.set_identity(Some(Identity::new("u1")));
        store
    }

    #[test]
    fn concrete_scenario() {
        let store = scenario(&MemorySessionStorage::new());
        assert!(store.has_role("customer"));
        assert!(!store.has_role("admin"));
        assert!(!store.has_role("driver"));
        assert_eq!(store.held_roles(), vec!["customer".to_string()]);
    }

    #[test]
    fn absent_identity_never_holds_a_role() {
        let store = store_with(&MemorySessionStorage::new());
        store.set_roles(roles());
        store.set_assignments(vec![
            RoleAssignment::new("u1", "r1"),
            RoleAssignment::new("u1", "r2"),
        ]);
        for name in ["admin", "customer", "driver", ""] {
            assert!(!store.has_role(name));
        }
    }

    #[test]
    fn removing_the_assignment_revokes_the_role() {
        let store = store_with(&MemorySessionStorage::new());
        store.set_identity(Some(Identity::new("u1")));
        store.set_roles(roles());
        store.set_assignments(vec![RoleAssignment::new("u1", "r1")]);
        assert!(store.has_role("admin"));

        store.set_assignments(Vec::new());
        assert!(!store.has_role("admin"));
    }

    #[test]
    fn setting_the_same_roles_twice_is_idempotent() {
        let store = scenario(&MemorySessionStorage::new());
        let before: Vec<bool> = ["admin", "customer"].iter().map(|n| store.has_role(n)).collect();
        store.set_roles(roles());
        store.set_roles(roles());
        let after: Vec<bool> = ["admin", "customer"].iter().map(|n| store.has_role(n)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn sign_out_flips_roles_without_touching_role_data() {
        let store = scenario(&MemorySessionStorage::new());
        assert!(store.has_role("customer"));
        store.set_identity(None);
        assert!(!store.has_role("customer"));
        assert_eq!(store.snapshot().assignments.len(), 1);
    }

    #[test]
    fn restore_reproduces_role_checks() {
        let storage = MemorySessionStorage::new();
        let before = scenario(&storage);

        let reloaded = SessionStore::restore(Arc::new(storage.clone()));
        assert_eq!(reloaded.snapshot(), before.snapshot());
        for name in ["admin", "customer", "driver"] {
            assert_eq!(reloaded.has_role(name), before.has_role(name));
        }
    }

    #[test]
    fn corrupt_snapshot_restores_empty() {
        let storage = MemorySessionStorage::new();
        storage.set(SNAPSHOT_KEY, "{not json").unwrap();
        let store = SessionStore::restore(Arc::new(storage));
        assert_eq!(store.snapshot(), SessionState::default());
    }

    #[test]
    fn stale_role_data_is_discarded() {
        let store = store_with(&MemorySessionStorage::new());
        let first = store.set_identity(Some(Identity::new("u1")));
        let second = store.set_identity(Some(Identity::new("u2")));
        assert!(second > first);

        let outcome = store.apply_role_data(
            first,
            Some(roles()),
            Some(vec![RoleAssignment::new("u1", "r1")]),
        );
        assert_eq!(outcome, RoleDataOutcome::Superseded);
        assert!(store.snapshot().roles.is_empty());

        let outcome = store.apply_role_data(
            second,
            Some(roles()),
            Some(vec![RoleAssignment::new("u2", "r1")]),
        );
        assert_eq!(outcome, RoleDataOutcome::Applied);
        assert!(store.has_role("admin"));
    }

    #[test]
    fn missing_half_keeps_previous_value() {
        let store = scenario(&MemorySessionStorage::new());
        let epoch = store.epoch();
        store.apply_role_data(epoch, None, Some(vec![RoleAssignment::new("u1", "r1")]));
        assert_eq!(store.snapshot().roles, roles());
        assert!(store.has_role("admin"));
        assert!(!store.has_role("customer"));
    }

    struct BrokenStorage;

    impl SessionStorage for BrokenStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::InvalidKey(key.to_string()))
        }
        fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::InvalidKey(key.to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
        fn clear(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn storage_failures_never_reach_callers() {
        let store = SessionStore::restore(Arc::new(BrokenStorage));
        store.set_identity(Some(Identity::new("u1")));
        store.set_roles(roles());
        store.set_assignments(vec![RoleAssignment::new("u1", "r1")]);
        assert!(store.has_role("admin"));
    }
}
