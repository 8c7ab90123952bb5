//! Global application error types.
//!
//! `AppError` is what the binary reports. Auth and validation failures are
//! user-visible with fixed wording; data-load failures are operator-visible
//! only and normally never reach here because loaders degrade to empty data.

use eggo_adapters::AdapterError;
use thiserror::Error;

use crate::auth::errors::AuthError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// A table read that failed. Logged and swallowed by every loader.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to load `{table}`: {source}")]
pub struct DataLoadError {
    pub table: String,
    #[source]
    pub source: AdapterError,
}

impl DataLoadError {
    pub fn new(table: &str, source: AdapterError) -> Self {
        Self {
            table: table.to_string(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("provider setup failed: {0}")]
    Provider(#[from] AdapterError),

    #[error("usage: {0}")]
    Usage(String),
}

impl AppError {
    /// Text safe to show to the person at the keyboard.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(AuthError::Validation(errors)) => errors.to_string(),
            AppError::Auth(err) => err.to_string(),
            AppError::Usage(msg) => msg.clone(),
            AppError::DataLoad(_) | AppError::Provider(_) => {
                "Something went wrong loading data. Please try again.".to_string()
            }
            AppError::Config(err) => err.to_string(),
            AppError::Storage(_) => "Local session storage is unavailable.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::errors::ValidationErrors;

    #[test]
    fn provider_detail_is_not_shown_to_users() {
        let err = AppError::from(DataLoadError::new(
            "roles",
            AdapterError::query("roles", "relation \"roles\" does not exist"),
        ));
        assert!(!err.user_message().contains("relation"));
        assert!(err.to_string().contains("relation"));
    }

    #[test]
    fn auth_errors_keep_their_generic_wording() {
        let err = AppError::from(AuthError::InvalidCredentials);
        assert_eq!(
            err.user_message(),
            "Invalid credentials. Please check your email and password."
        );
    }

    #[test]
    fn validation_failures_list_each_field() {
        let mut errors = ValidationErrors::new();
        errors.push("email", "Invalid email address");
        let err = AppError::from(AuthError::from(errors));
        assert_eq!(err.user_message(), "email: Invalid email address");
    }
}
