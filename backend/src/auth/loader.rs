//! Loads the role reference set and the current identity's assignments into
//! the session store.

use std::sync::Arc;

use eggo_adapters::{DataAdapter, Role, RoleAssignment};
use tracing::{debug, error};

use super::store::{RoleDataOutcome, SessionStore};
use crate::database::{fetch, queries};

#[derive(Clone)]
pub struct RoleDataLoader {
    data: Arc<dyn DataAdapter>,
}

impl RoleDataLoader {
    pub fn new(data: Arc<dyn DataAdapter>) -> Self {
        Self { data }
    }

    /// Fetches all roles and the assignments of `user_id`, then hands both to
    /// the store tagged with the epoch current when the load started.
    ///
    /// Either read may fail on its own; the failure is logged and that half
    /// keeps its prior value. A load overtaken by an identity change is
    /// dropped.
    pub async fn load(&self, store: &SessionStore, user_id: &str) -> RoleDataOutcome {
        let epoch = store.epoch();

        let roles = fetch::<Role>(self.data.as_ref(), &queries::all_roles())
            .await
            .map_err(|err| error!(error = %err, "error loading roles"))
            .ok();
        let assignments =
            fetch::<RoleAssignment>(self.data.as_ref(), &queries::assignments_for(user_id))
                .await
                .map_err(|err| error!(error = %err, user_id, "error loading role assignments"))
                .ok();

        let outcome = store.apply_role_data(epoch, roles, assignments);
        if outcome == RoleDataOutcome::Superseded {
            debug!(user_id, epoch, "discarding role data for a superseded identity");
        }
        outcome
    }
}
