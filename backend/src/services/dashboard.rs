//! Recent orders on the dashboard, scoped by role.

use std::sync::Arc;

use eggo_adapters::{DataAdapter, TableQuery};
use tracing::debug;

use super::or_empty;
use crate::auth::store::SessionStore;
use crate::database::models::Order;
use crate::database::{fetch, queries};
use crate::navigation::{ROLE_CUSTOMER, ROLE_DELIVERY};

/// Status name of orders currently out for delivery.
pub const IN_DELIVERY: &str = "in_delivery";

/// Which orders a session may see on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    /// Only the customer's own orders.
    Customer(String),
    /// Orders out for delivery.
    Delivery,
    All,
}

impl OrderScope {
    /// Customer wins over delivery; any other signed-in session sees
    /// everything. `None` without an identity.
    pub fn for_session(store: &SessionStore) -> Option<Self> {
        let identity = store.identity()?;
        let scope = if store.has_role(ROLE_CUSTOMER) {
            Self::Customer(identity.id)
        } else if store.has_role(ROLE_DELIVERY) {
            Self::Delivery
        } else {
            Self::All
        };
        Some(scope)
    }

    fn apply(&self, query: TableQuery) -> TableQuery {
        match self {
            Self::Customer(user_id) => query.eq("customer_id", user_id.as_str()),
            Self::Delivery => query.eq("status.name", IN_DELIVERY),
            Self::All => query,
        }
    }
}

pub struct DashboardService {
    data: Arc<dyn DataAdapter>,
}

impl DashboardService {
    pub fn new(data: Arc<dyn DataAdapter>) -> Self {
        Self { data }
    }

    pub async fn recent_orders(&self, store: &SessionStore) -> Vec<Order> {
        let Some(scope) = OrderScope::for_session(store) else {
            debug!("no identity; skipping recent orders");
            return Vec::new();
        };
        let query = scope
            .apply(queries::orders())
            .limit(queries::RECENT_ORDERS_LIMIT);
        or_empty(fetch(self.data.as_ref(), &query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySessionStorage;
    use eggo_adapters::{Identity, InMemoryBackend, Role, RoleAssignment};
    use serde_json::{json, Value};

    fn order(id: &str, customer: &str, status: &str, day: u32) -> Value {
        json!({
            "id": id,
            "customer_id": customer,
            "total_amount": 12.0,
            "created_at": format!("2024-03-{:02}T10:00:00Z", day),
            "status": {"id": status, "name": status}
        })
    }

    fn backend() -> Arc<InMemoryBackend> {
        let backend = Arc::new(InMemoryBackend::new());
        let mut rows: Vec<Value> = (1..=6)
            .map(|day| order(&format!("o{}", day), "u1", "pending", day))
            .collect();
        rows.push(order("o7", "u2", IN_DELIVERY, 7));
        rows.push(order("o8", "u2", "delivered", 8));
        backend.seed("orders", rows);
        backend
    }

    fn store_with(user: Option<&str>, role: Option<&str>) -> SessionStore {
        let store = SessionStore::new(Arc::new(MemorySessionStorage::new()));
        store.set_roles(vec![
            Role::new("r1", "admin"),
            Role::new("r2", "customer"),
            Role::new("r3", "delivery"),
        ]);
        store.set_identity(user.map(Identity::new));
        if let (Some(user), Some(role)) = (user, role) {
            store.set_assignments(vec![RoleAssignment::new(user, role)]);
        }
        store
    }

    fn ids(orders: &[Order]) -> Vec<&str> {
        orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn customer_role_takes_precedence() {
        let store = store_with(Some("u1"), Some("r2"));
        store.set_assignments(vec![
            RoleAssignment::new("u1", "r3"),
            RoleAssignment::new("u1", "r2"),
        ]);
        assert_eq!(
            OrderScope::for_session(&store),
            Some(OrderScope::Customer("u1".into()))
        );
    }

    #[test]
    fn scope_needs_an_identity() {
        assert_eq!(OrderScope::for_session(&store_with(None, None)), None);
        assert_eq!(
            OrderScope::for_session(&store_with(Some("u9"), Some("r1"))),
            Some(OrderScope::All)
        );
    }

    #[tokio::test]
    async fn customer_sees_own_five_newest() {
        let service = DashboardService::new(backend());
        let orders = service.recent_orders(&store_with(Some("u1"), Some("r2"))).await;
        assert_eq!(ids(&orders), vec!["o6", "o5", "o4", "o3", "o2"]);
    }

    #[tokio::test]
    async fn delivery_sees_orders_in_delivery() {
        let service = DashboardService::new(backend());
        let orders = service.recent_orders(&store_with(Some("d1"), Some("r3"))).await;
        assert_eq!(ids(&orders), vec!["o7"]);
        assert_eq!(orders[0].status_name(), Some(IN_DELIVERY));
    }

    #[tokio::test]
    async fn admin_sees_everything() {
        let service = DashboardService::new(backend());
        let orders = service.recent_orders(&store_with(Some("a1"), Some("r1"))).await;
        assert_eq!(ids(&orders), vec!["o8", "o7", "o6", "o5", "o4"]);
    }

    #[tokio::test]
    async fn signed_out_session_fetches_nothing() {
        let backend = backend();
        backend.fail_table("orders");
        let service = DashboardService::new(backend);
        assert!(service.recent_orders(&store_with(None, None)).await.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_empty() {
        let backend = backend();
        backend.fail_table("orders");
        let service = DashboardService::new(backend);
        assert!(service
            .recent_orders(&store_with(Some("u1"), Some("r2")))
            .await
            .is_empty());
    }
}
