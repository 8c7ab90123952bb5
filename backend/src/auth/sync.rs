//! Auth synchronizer: keeps the session store in step with the provider's
//! session lifecycle and drives navigation on sign-in and sign-out.
//!
//! Lifecycle:
//! - **Init**: on mount, read the current session once. With a user, set the
//!   identity and load role data; without one, clear the identity. No
//!   navigation happens here.
//! - **Subscribed**: every provider event carries a session or not. With a
//!   session: set identity, load role data (awaited), then go to the
//!   authenticated landing route. Without: clear identity and assignments,
//!   then go to the public landing route.
//! - **Teardown**: the subscription is cancelled. A handler already running
//!   completes first; once [`SyncHandle::teardown`] returns nothing else is
//!   written to the store.

use std::sync::Arc;

use eggo_adapters::{AuthAdapter, AuthEvent, AuthSubscription, Identity};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::loader::RoleDataLoader;
use super::store::SessionStore;
use crate::navigation::routes::{AUTHENTICATED_LANDING, PUBLIC_LANDING};
use crate::navigation::Navigator;

pub struct AuthSynchronizer {
    auth: Arc<dyn AuthAdapter>,
    loader: RoleDataLoader,
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl AuthSynchronizer {
    pub fn new(
        auth: Arc<dyn AuthAdapter>,
        loader: RoleDataLoader,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            auth,
            loader,
            store,
            navigator,
        }
    }

    /// Reads the provider's current session into the store.
    ///
    /// A provider error leaves the restored snapshot in place; the next
    /// auth event revalidates it.
    pub async fn init(&self) {
        match self.auth.current_session().await {
            Ok(Some(session)) => {
                debug!(user_id = %session.user.id, "initial session present");
                self.sign_in(session.user).await;
            }
            Ok(None) => {
                debug!("no initial session");
                self.store.set_identity(None);
            }
            Err(err) => {
                warn!(error = %err, "failed to read the initial session");
            }
        }
    }

    /// Applies one session transition.
    pub async fn handle(&self, event: AuthEvent) {
        info!(
            kind = ?event.kind,
            user_id = ?event.identity().map(|i| i.id.as_str()),
            "auth state changed"
        );
        match event.session {
            Some(session) => {
                self.sign_in(session.user).await;
                self.navigator.navigate(AUTHENTICATED_LANDING);
            }
            None => {
                self.store.set_identity(None);
                self.store.set_assignments(Vec::new());
                self.navigator.navigate(PUBLIC_LANDING);
            }
        }
    }

    async fn sign_in(&self, identity: Identity) {
        let user_id = identity.id.clone();
        self.store.set_identity(Some(identity));
        self.loader.load(&self.store, &user_id).await;
    }

    /// Subscribes, runs Init, then keeps handling events on a background
    /// task until the returned handle is torn down or dropped.
    ///
    /// The subscription is taken before Init so transitions that happen
    /// while the initial session is being read are still delivered.
    pub async fn mount(self) -> SyncHandle {
        let subscription = self.auth.subscribe();
        self.init().await;

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(subscription, stop_rx));
        SyncHandle {
            stop: Some(stop_tx),
            task,
        }
    }

    async fn run(self, mut subscription: AuthSubscription, mut stop: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                // A dropped handle counts as teardown too.
                _ = &mut stop => break,
                event = subscription.next() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        debug!("auth provider closed the subscription");
                        break;
                    }
                },
            }
        }
        drop(subscription);
        debug!("auth synchronizer stopped");
    }
}

/// Handle to a mounted synchronizer.
pub struct SyncHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Cancels the subscription and waits for the event task to exit.
    pub async fn teardown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = self.task.await {
            warn!(error = %err, "auth synchronizer task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Router;
    use crate::storage::MemorySessionStorage;
    use eggo_adapters::{AuthEventKind, Credentials, InMemoryBackend, Session};
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        store: Arc<SessionStore>,
        router: Arc<Router>,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = Arc::new(InMemoryBackend::new());
            backend.seed(
                "roles",
                vec![
                    json!({"id": "r1", "name": "admin"}),
                    json!({"id": "r2", "name": "customer"}),
                ],
            );
            backend.seed(
                "user_roles",
                vec![
                    json!({"user_id": "u1", "role_id": "r2"}),
                    json!({"user_id": "u2", "role_id": "r1"}),
                ],
            );
            backend.add_account("ana@example.com", "secret-pass", Identity::new("u1"));
            Self {
                backend,
                store: Arc::new(SessionStore::new(Arc::new(MemorySessionStorage::new()))),
                router: Arc::new(Router::new()),
            }
        }

        fn synchronizer(&self) -> AuthSynchronizer {
            AuthSynchronizer::new(
                self.backend.clone(),
                RoleDataLoader::new(self.backend.clone()),
                self.store.clone(),
                self.router.clone(),
            )
        }
    }

    fn session_for(id: &str) -> Session {
        Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
            user: Identity::new(id),
        }
    }

    #[tokio::test]
    async fn init_with_session_loads_roles_without_navigating() {
        let fx = Fixture::new();
        fx.backend.restore_session(Identity::new("u1"));

        fx.synchronizer().init().await;

        assert_eq!(fx.store.identity().unwrap().id, "u1");
        assert!(fx.store.has_role("customer"));
        assert!(fx.router.history().is_empty());
    }

    #[tokio::test]
    async fn init_without_session_clears_a_restored_identity() {
        let fx = Fixture::new();
        fx.store.set_identity(Some(Identity::new("u1")));

        fx.synchronizer().init().await;

        assert!(fx.store.identity().is_none());
        assert!(fx.router.history().is_empty());
    }

    #[tokio::test]
    async fn signed_in_event_loads_roles_before_navigating() {
        let fx = Fixture::new();
        let sync = fx.synchronizer();

        sync.handle(AuthEvent::new(AuthEventKind::SignedIn, Some(session_for("u2"))))
            .await;

        assert!(fx.store.has_role("admin"));
        assert_eq!(fx.router.history(), vec!["/dashboard"]);
    }

    #[tokio::test]
    async fn signed_out_event_clears_identity_and_goes_home() {
        let fx = Fixture::new();
        let sync = fx.synchronizer();
        sync.handle(AuthEvent::new(AuthEventKind::SignedIn, Some(session_for("u1"))))
            .await;
        assert!(fx.store.has_role("customer"));

        sync.handle(AuthEvent::new(AuthEventKind::SignedOut, None)).await;

        assert!(!fx.store.has_role("customer"));
        assert!(fx.store.snapshot().assignments.is_empty());
        assert_eq!(fx.router.current(), "/");
    }

    #[tokio::test]
    async fn role_load_failure_still_navigates() {
        let fx = Fixture::new();
        fx.backend.fail_table("roles");
        fx.backend.fail_table("user_roles");
        let sync = fx.synchronizer();

        sync.handle(AuthEvent::new(AuthEventKind::TokenRefreshed, Some(session_for("u1"))))
            .await;

        assert_eq!(fx.store.identity().unwrap().id, "u1");
        assert!(!fx.store.has_role("customer"));
        assert_eq!(fx.router.current(), "/dashboard");
    }

    async fn wait_for_route(router: &Router, path: &str) {
        let mut rx = router.watch();
        tokio::time::timeout(Duration::from_secs(5), async {
            while *rx.borrow_and_update() != path {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("route change");
    }

    #[tokio::test]
    async fn mounted_synchronizer_follows_provider_events_until_teardown() {
        let fx = Fixture::new();
        let handle = fx.synchronizer().mount().await;

        fx.backend
            .sign_in_with_password(&Credentials {
                email: "ana@example.com".into(),
                password: "secret-pass".into(),
            })
            .await
            .unwrap();
        wait_for_route(&fx.router, "/dashboard").await;
        assert!(fx.store.has_role("customer"));

        handle.teardown().await;
        assert_eq!(fx.backend.subscriber_count(), 0);

        fx.backend.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fx.store.identity().unwrap().id, "u1");
        assert_eq!(fx.router.history(), vec!["/dashboard"]);
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_task() {
        let fx = Fixture::new();
        let handle = fx.synchronizer().mount().await;
        drop(handle);

        tokio::time::timeout(Duration::from_secs(5), async {
            while fx.backend.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscription released");
    }
}
