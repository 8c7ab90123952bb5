//! Table access for the EggGo client.
//!
//! `queries` builds the table-scoped reads and inserts issued through the
//! data adapter, and `models` holds the typed rows they decode into.

pub mod models;
pub mod queries;

use eggo_adapters::{select_as, DataAdapter, TableQuery};
use serde::de::DeserializeOwned;

use crate::errors::DataLoadError;

/// Runs `query` and decodes the rows, tagging failures with the table name.
pub async fn fetch<T: DeserializeOwned>(
    data: &dyn DataAdapter,
    query: &TableQuery,
) -> Result<Vec<T>, DataLoadError> {
    select_as::<T>(data, query)
        .await
        .map_err(|err| DataLoadError::new(&query.table, err))
}

pub mod tables {
    pub const ROLES: &str = "roles";
    pub const USER_ROLES: &str = "user_roles";
    pub const CONDOMINIUMS: &str = "condominiums";
    pub const DELIVERY_WINDOWS: &str = "delivery_windows";
    pub const PAYMENT_METHODS: &str = "payment_methods";
    pub const EGG_SIZES: &str = "egg_sizes";
    pub const ORDERS: &str = "orders";
}
