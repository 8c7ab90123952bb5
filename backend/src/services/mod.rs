//! Screen-level services.
//!
//! Each loader here follows the same policy: a failed read is logged and the
//! screen gets an empty list. Nothing is surfaced to the user.

pub mod admin;
pub mod dashboard;

pub use admin::AdminService;
pub use dashboard::{DashboardService, OrderScope};

use tracing::error;

use crate::errors::DataLoadError;

pub(crate) fn or_empty<T>(result: Result<Vec<T>, DataLoadError>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        error!(table = %err.table, error = %err.source, "error fetching rows");
        Vec::new()
    })
}
