//! Database query builders.
//!
//! Every read the client issues is built here so screens and services share
//! one definition of table, embedded relations and ordering.

use eggo_adapters::TableQuery;
use serde_json::{json, Value};

use super::tables;

/// How many recent orders the dashboard shows.
pub const RECENT_ORDERS_LIMIT: usize = 5;

pub fn all_roles() -> TableQuery {
    TableQuery::from(tables::ROLES)
}

pub fn role_by_name(name: &str) -> TableQuery {
    TableQuery::from(tables::ROLES).select("id").eq("name", name).limit(1)
}

pub fn assignments_for(user_id: &str) -> TableQuery {
    TableQuery::from(tables::USER_ROLES).eq("user_id", user_id)
}

pub fn assign_role_row(user_id: &str, role_id: &str) -> Value {
    json!({ "user_id": user_id, "role_id": role_id })
}

pub fn condominiums() -> TableQuery {
    TableQuery::from(tables::CONDOMINIUMS)
        .select(
            "*,
            type:condominium_types(*),
            distribution_type:distribution_types(*)",
        )
        .order("name", true)
}

pub fn delivery_windows() -> TableQuery {
    TableQuery::from(tables::DELIVERY_WINDOWS)
        .select("*, condominium:condominiums(*)")
        .order("day_of_week", true)
        .order("start_time", true)
}

pub fn payment_methods() -> TableQuery {
    TableQuery::from(tables::PAYMENT_METHODS).order("name", true)
}

pub fn egg_sizes() -> TableQuery {
    TableQuery::from(tables::EGG_SIZES).order("price", true)
}

/// Orders with their status and delivery address embedded, newest first.
pub fn orders() -> TableQuery {
    TableQuery::from(tables::ORDERS)
        .select(
            "*,
            status:order_statuses(*),
            customer_address:customer_addresses(*)",
        )
        .order("created_at", false)
}
