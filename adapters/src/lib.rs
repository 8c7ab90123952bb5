//! Core `adapters` crate for abstracting the EggGo backend-as-a-service.
//!
//! This crate defines the `AuthAdapter` and `DataAdapter` traits, which outline
//! what the client needs from the hosted auth provider and the table query
//! API, and provides the concrete implementations (Supabase over HTTP and an
//! in-process backend).

pub mod errors;
pub mod events;
pub mod memory;
pub mod models;
pub mod supabase;

use async_trait::async_trait;

pub use errors::AdapterError;
pub use events::{AuthEventBus, AuthSubscription};
pub use memory::InMemoryBackend;
pub use models::*;
pub use supabase::SupabaseClient;

/// Session lifecycle of the external auth provider.
#[async_trait]
pub trait AuthAdapter: Send + Sync {
    /// The session the provider currently holds, if any.
    async fn current_session(&self) -> Result<Option<Session>, AdapterError>;

    /// Subscribes to session-change notifications.
    fn subscribe(&self) -> AuthSubscription;

    async fn sign_in_with_password(&self, credentials: &Credentials)
        -> Result<Session, AdapterError>;

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AdapterError>;

    async fn sign_out(&self) -> Result<(), AdapterError>;

    /// Admin listing of every registered user.
    async fn list_users(&self) -> Result<Vec<Identity>, AdapterError>;
}

/// Table-scoped reads and inserts.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    async fn select(&self, query: &TableQuery) -> Result<Vec<serde_json::Value>, AdapterError>;

    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), AdapterError>;
}

/// Runs `query` and decodes every row into `T`.
pub async fn select_as<T>(data: &dyn DataAdapter, query: &TableQuery) -> Result<Vec<T>, AdapterError>
where
    T: serde::de::DeserializeOwned,
{
    data.select(query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(AdapterError::from))
        .collect()
}
