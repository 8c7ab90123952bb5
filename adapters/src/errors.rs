//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur while talking to the auth
//! provider or the table query API, providing a unified error type for every
//! adapter implementation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The provider refused the credentials or the session call.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// A table read or write returned an error payload.
    #[error("query on `{table}` failed: {message}")]
    Query { table: String, message: String },

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("no active session")]
    NoSession,
}

impl AdapterError {
    pub fn query(table: &str, message: impl Into<String>) -> Self {
        AdapterError::Query {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdapterError::Decode(err.to_string())
        } else {
            AdapterError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Decode(err.to_string())
    }
}
