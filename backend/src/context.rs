//! Application context.
//!
//! Everything a screen or command needs is built once here and passed
//! around explicitly: the session store, the router, the provider adapters
//! and the services layered on top of them.

use std::sync::Arc;

use eggo_adapters::{AuthAdapter, DataAdapter};

use crate::auth::{
    authorize, Access, AuthService, AuthSynchronizer, RoleDataLoader, SessionStore, SyncHandle,
};
use crate::navigation::{visible_entries, NavEntry, Router, SIDEBAR};
use crate::services::{AdminService, DashboardService};

pub struct AppContext {
    pub store: Arc<SessionStore>,
    pub router: Arc<Router>,
    pub auth: AuthService,
    pub admin: AdminService,
    pub dashboard: DashboardService,
    auth_adapter: Arc<dyn AuthAdapter>,
    data_adapter: Arc<dyn DataAdapter>,
}

impl AppContext {
    pub fn new(
        auth_adapter: Arc<dyn AuthAdapter>,
        data_adapter: Arc<dyn DataAdapter>,
        store: Arc<SessionStore>,
        admin_code: Option<String>,
    ) -> Self {
        Self {
            store,
            router: Arc::new(Router::new()),
            auth: AuthService::new(auth_adapter.clone(), data_adapter.clone(), admin_code),
            admin: AdminService::new(auth_adapter.clone(), data_adapter.clone()),
            dashboard: DashboardService::new(data_adapter.clone()),
            auth_adapter,
            data_adapter,
        }
    }

    /// Starts the auth synchronizer against this context's store and router.
    pub async fn mount(&self) -> SyncHandle {
        AuthSynchronizer::new(
            self.auth_adapter.clone(),
            RoleDataLoader::new(self.data_adapter.clone()),
            self.store.clone(),
            self.router.clone(),
        )
        .mount()
        .await
    }

    pub fn sidebar(&self) -> Vec<&'static NavEntry> {
        visible_entries(SIDEBAR, &self.store)
    }

    pub fn authorize(&self, path: &str) -> Access {
        authorize(path, &self.store)
    }
}
