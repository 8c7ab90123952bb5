//! Data structures for authentication-related entities.
//!
//! This module defines the persisted session snapshot and the sign-in and
//! registration forms together with their field rules.

use eggo_adapters::{Credentials, Identity, Role, RoleAssignment, SignUpRequest, UserMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::ValidationErrors;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_FULL_NAME_LEN: usize = 2;
pub const MIN_USERNAME_LEN: usize = 3;

/// Snapshot of who is logged in and what they hold.
///
/// `roles` is the global reference set; `assignments` are the rows of
/// `user_roles` for `identity`. With no identity both may be stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub assignments: Vec<RoleAssignment>,
}

impl SessionState {
    /// True iff an identity is present, a role named `name` exists, and an
    /// assignment links it to that identity.
    pub fn has_role(&self, name: &str) -> bool {
        let Some(identity) = &self.identity else {
            return false;
        };
        let Some(role) = self.roles.iter().find(|r| r.name == name) else {
            return false;
        };
        self.assignments
            .iter()
            .any(|a| a.role_id == role.id && a.user_id == identity.id)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if !EMAIL_RE.is_match(email.trim()) {
        errors.push("email", "Invalid email address");
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("password", "Password must be at least 8 characters");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        errors.into_result()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: normalize_email(&self.email),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub username: String,
    /// Registering as administrator requires `admin_code`.
    pub as_admin: bool,
    pub admin_code: Option<String>,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.full_name.chars().count() < MIN_FULL_NAME_LEN {
            errors.push("full_name", "Full name must be at least 2 characters");
        }
        if self.username.chars().count() < MIN_USERNAME_LEN {
            errors.push("username", "Username must be at least 3 characters");
        }
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        errors.into_result()
    }

    pub fn sign_up_request(&self) -> SignUpRequest {
        SignUpRequest {
            email: normalize_email(&self.email),
            password: self.password.clone(),
            metadata: UserMetadata {
                full_name: Some(self.full_name.clone()),
                username: Some(self.username.clone()),
            },
        }
    }
}
