//! EggGo client core.
//!
//! Session state and role checks (`auth`), role-gated navigation
//! (`navigation`), and the admin and dashboard loaders (`services`), all
//! wired together by [`context::AppContext`].

pub mod auth;
pub mod config;
pub mod context;
pub mod database;
pub mod errors;
pub mod navigation;
pub mod services;
pub mod storage;

pub use context::AppContext;
