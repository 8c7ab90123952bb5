//! In-process adapter implementation.
//!
//! `InMemoryBackend` implements both [`AuthAdapter`] and [`DataAdapter`] over
//! plain maps: registered users, one current session, and JSON rows per
//! table. It emits the same auth events a hosted provider would, and tables
//! can be told to fail so the degrade paths of the client are exercisable.

use std::collections::{HashMap, HashSet};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use serde_json::Value;

use crate::errors::AdapterError;
use crate::events::{AuthEventBus, AuthSubscription};
use crate::models::{
    AuthEvent, AuthEventKind, Credentials, Identity, Session, SignUpOutcome, SignUpRequest,
    TableQuery,
};
use crate::{AuthAdapter, DataAdapter};

struct Account {
    password: String,
    identity: Identity,
}

#[derive(Default)]
pub struct InMemoryBackend {
    accounts: RwLock<HashMap<String, Account>>,
    session: RwLock<Option<Session>>,
    tables: RwLock<HashMap<String, Vec<Value>>>,
    failing: RwLock<HashSet<String>>,
    events: AuthEventBus,
    issued: AtomicUsize,
    auth_calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account that can sign in with `email` / `password`.
    pub fn add_account(&self, email: &str, password: &str, identity: Identity) {
        self.accounts.write().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                identity,
            },
        );
    }

    /// Replaces the rows of `table`.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables.write().insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    /// Makes every subsequent read or insert on `table` fail.
    pub fn fail_table(&self, table: &str) {
        self.failing.write().insert(table.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        self.failing.write().remove(table);
    }

    /// Installs a session without going through sign-in, as if it had been
    /// restored by the provider from its own storage. No event is emitted.
    pub fn restore_session(&self, identity: Identity) -> Session {
        let session = self.issue(identity);
        *self.session.write() = Some(session.clone());
        session
    }

    /// Rotates the access token of the current session.
    pub fn refresh_session(&self) -> Result<Session, AdapterError> {
        let user = self
            .session
            .read()
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(AdapterError::NoSession)?;
        let session = self.issue(user);
        *self.session.write() = Some(session.clone());
        self.events.publish(AuthEvent::new(
            AuthEventKind::TokenRefreshed,
            Some(session.clone()),
        ));
        Ok(session)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    /// Number of credential calls (sign-in and sign-up) that reached the provider.
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(AtomicOrdering::SeqCst)
    }

    fn issue(&self, user: Identity) -> Session {
        let n = self.issued.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        Session {
            access_token: format!("access-{}", n),
            refresh_token: Some(format!("refresh-{}", n)),
            expires_at: None,
            user,
        }
    }

    fn check_table(&self, table: &str) -> Result<(), AdapterError> {
        if self.failing.read().contains(table) {
            return Err(AdapterError::query(table, "table unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthAdapter for InMemoryBackend {
    async fn current_session(&self) -> Result<Option<Session>, AdapterError> {
        Ok(self.session.read().clone())
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, AdapterError> {
        self.auth_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let identity = {
            let accounts = self.accounts.read();
            match accounts.get(&credentials.email) {
                Some(account) if account.password == credentials.password => {
                    account.identity.clone()
                }
                _ => {
                    return Err(AdapterError::AuthRejected(
                        "Invalid login credentials".to_string(),
                    ))
                }
            }
        };

        let session = self.issue(identity);
        *self.session.write() = Some(session.clone());
        info!("in-memory sign-in for {}", session.user.id);
        self.events
            .publish(AuthEvent::new(AuthEventKind::SignedIn, Some(session.clone())));
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AdapterError> {
        self.auth_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let identity = {
            let mut accounts = self.accounts.write();
            if accounts.contains_key(&request.email) {
                return Err(AdapterError::AuthRejected(
                    "User already registered".to_string(),
                ));
            }
            let identity = Identity {
                id: format!("user-{}", accounts.len() + 1),
                email: Some(request.email.clone()),
                user_metadata: request.metadata.clone(),
                created_at: None,
            };
            accounts.insert(
                request.email.clone(),
                Account {
                    password: request.password.clone(),
                    identity: identity.clone(),
                },
            );
            identity
        };

        let session = self.issue(identity.clone());
        *self.session.write() = Some(session.clone());
        self.events
            .publish(AuthEvent::new(AuthEventKind::SignedIn, Some(session.clone())));
        Ok(SignUpOutcome {
            user: identity,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), AdapterError> {
        let previous = self.session.write().take();
        if previous.is_none() {
            debug!("sign-out without an active session");
        }
        self.events
            .publish(AuthEvent::new(AuthEventKind::SignedOut, None));
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Identity>, AdapterError> {
        let mut users: Vec<Identity> = self
            .accounts
            .read()
            .values()
            .map(|a| a.identity.clone())
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}

#[async_trait]
impl DataAdapter for InMemoryBackend {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, AdapterError> {
        self.check_table(&query.table)?;

        let mut rows: Vec<Value> = self
            .tables
            .read()
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters
                            .iter()
                            .all(|f| matches_filter(row, &f.column, &f.value))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            for order in &query.order {
                let ord = compare_values(lookup(a, &order.column), lookup(b, &order.column));
                let ord = if order.ascending { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), AdapterError> {
        self.check_table(table)?;
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }
}

/// Resolves a possibly dotted column against a row.
fn lookup<'a>(row: &'a Value, column: &str) -> Option<&'a Value> {
    column
        .split('.')
        .try_fold(row, |value, key| value.get(key))
}

fn matches_filter(row: &Value, column: &str, expected: &str) -> bool {
    match lookup(row, column) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

// Nulls sort last, as PostgREST does for ascending order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
