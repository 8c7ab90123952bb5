//! Core business logic for the authentication system.
//!
//! This service runs the sign-in, registration and sign-out flows: local
//! form validation first, then the provider call, then (for administrator
//! registration) the role grant. Session state is not touched here; the
//! provider's auth event drives the synchronizer.

use std::sync::Arc;

use eggo_adapters::{select_as, AuthAdapter, DataAdapter, Session, SignUpOutcome};
use serde::Deserialize;
use tracing::{error, info};

use super::errors::AuthError;
use super::models::{RegisterForm, SignInForm};
use crate::database::{queries, tables};
use crate::navigation::ROLE_ADMIN;

#[derive(Deserialize)]
struct RoleId {
    id: String,
}

pub struct AuthService {
    auth: Arc<dyn AuthAdapter>,
    data: Arc<dyn DataAdapter>,
    admin_code: Option<String>,
}

impl AuthService {
    pub fn new(
        auth: Arc<dyn AuthAdapter>,
        data: Arc<dyn DataAdapter>,
        admin_code: Option<String>,
    ) -> Self {
        Self {
            auth,
            data,
            admin_code,
        }
    }

    pub async fn sign_in(&self, form: &SignInForm) -> Result<Session, AuthError> {
        form.validate()?;
        let credentials = form.credentials();

        self.auth
            .sign_in_with_password(&credentials)
            .await
            .map_err(|err| {
                error!(error = %err, "auth error");
                AuthError::InvalidCredentials
            })
    }

    pub async fn sign_up(&self, form: &RegisterForm) -> Result<SignUpOutcome, AuthError> {
        form.validate()?;
        if form.as_admin && !self.admin_code_matches(form.admin_code.as_deref()) {
            return Err(AuthError::InvalidAdminCode);
        }

        let outcome = self
            .auth
            .sign_up(&form.sign_up_request())
            .await
            .map_err(|err| {
                error!(error = %err, "registration error");
                AuthError::RegistrationFailed
            })?;

        if form.as_admin {
            self.grant_admin(&outcome.user.id).await?;
        }
        info!(user_id = %outcome.user.id, admin = form.as_admin, "registered");
        Ok(outcome)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await.map_err(|err| {
            error!(error = %err, "sign-out error");
            AuthError::SignOutFailed
        })
    }

    fn admin_code_matches(&self, given: Option<&str>) -> bool {
        match (self.admin_code.as_deref(), given) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        }
    }

    async fn grant_admin(&self, user_id: &str) -> Result<(), AuthError> {
        let role = select_as::<RoleId>(self.data.as_ref(), &queries::role_by_name(ROLE_ADMIN))
            .await
            .map_err(|err| {
                error!(error = %err, "admin role lookup failed");
                AuthError::RegistrationFailed
            })?
            .into_iter()
            .next()
            .ok_or_else(|| {
                error!("admin role is missing from the roles table");
                AuthError::RegistrationFailed
            })?;

        self.data
            .insert(tables::USER_ROLES, queries::assign_role_row(user_id, &role.id))
            .await
            .map_err(|err| {
                error!(error = %err, user_id, "admin role grant failed");
                AuthError::RegistrationFailed
            })
    }
}
