//! Supabase-specific adapter implementation.
//!
//! This file contains the concrete implementation of [`AuthAdapter`] and
//! [`DataAdapter`] for a Supabase project: GoTrue under `/auth/v1` for the
//! session lifecycle and PostgREST under `/rest/v1` for table reads and
//! inserts, including the request building and payload conversions specific
//! to those APIs.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::RwLock;
use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AdapterError;
use crate::events::{AuthEventBus, AuthSubscription};
use crate::models::{
    AuthEvent, AuthEventKind, Credentials, Identity, Session, SignUpOutcome, SignUpRequest,
    TableQuery,
};
use crate::{AuthAdapter, DataAdapter};

pub struct SupabaseClient {
    base: Url,
    anon_key: String,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
    events: AuthEventBus,
}

/// GoTrue token grant payload.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Identity,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in.map(|secs| unix_now() + secs)
        });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserList {
    users: Vec<Identity>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, AdapterError> {
        let base = Url::parse(base_url)
            .map_err(|err| AdapterError::Transport(format!("invalid base URL: {}", err)))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base,
            anon_key: anon_key.to_string(),
            http,
            session: RwLock::new(None),
            events: AuthEventBus::new(),
        })
    }

    /// Seeds the client with a session persisted by a previous run.
    pub fn with_session(self, session: Option<Session>) -> Self {
        *self.session.write() = session;
        self
    }

    /// The session currently held by the client.
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Exchanges the refresh token for a new session.
    ///
    /// A rejected refresh token ends the session: it is dropped and
    /// subscribers see `SignedOut`.
    pub async fn refresh_session(&self) -> Result<Session, AdapterError> {
        let refresh_token = self
            .session()
            .and_then(|s| s.refresh_token)
            .ok_or(AdapterError::NoSession)?;

        let url = self.auth_url("token?grant_type=refresh_token")?;
        let resp = self
            .with_keys(self.http.post(url))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let session = match auth_response::<TokenResponse>(resp).await {
            Ok(body) => body.into_session(),
            Err(err @ AdapterError::AuthRejected(_)) => {
                warn!("refresh token rejected: {}", err);
                self.end_session();
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        self.install(AuthEventKind::TokenRefreshed, session.clone());
        Ok(session)
    }

    /// Drops the held session and tells subscribers it is gone.
    fn end_session(&self) {
        if self.session.write().take().is_some() {
            self.events
                .publish(AuthEvent::new(AuthEventKind::SignedOut, None));
        }
    }

    fn auth_url(&self, path: &str) -> Result<Url, AdapterError> {
        self.base
            .join(&format!("auth/v1/{}", path))
            .map_err(|err| AdapterError::Transport(err.to_string()))
    }

    fn bearer(&self) -> String {
        self.session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn with_keys(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    fn install(&self, kind: AuthEventKind, session: Session) {
        *self.session.write() = Some(session.clone());
        self.events.publish(AuthEvent::new(kind, Some(session)));
    }
}

#[async_trait]
impl AuthAdapter for SupabaseClient {
    /// The held session, refreshed first if its access token has expired.
    /// A session that cannot be refreshed is ended and reported as absent.
    async fn current_session(&self) -> Result<Option<Session>, AdapterError> {
        let Some(session) = self.session() else {
            return Ok(None);
        };
        if !session.is_expired(unix_now()) {
            return Ok(Some(session));
        }

        debug!("session for {} expired, refreshing", session.user.id);
        match self.refresh_session().await {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!("could not refresh expired session: {}", err);
                self.end_session();
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, AdapterError> {
        let url = self.auth_url("token?grant_type=password")?;
        let resp = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .send()
            .await?;

        let session = auth_response::<TokenResponse>(resp).await?.into_session();
        info!("signed in as {}", session.user.id);
        self.install(AuthEventKind::SignedIn, session.clone());
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AdapterError> {
        let url = self.auth_url("signup")?;
        let resp = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": request.metadata,
            }))
            .send()
            .await?;

        let outcome = parse_sign_up(auth_response::<Value>(resp).await?)?;
        if let Some(session) = &outcome.session {
            self.install(AuthEventKind::SignedIn, session.clone());
        } else {
            debug!("sign-up for {} awaits email confirmation", outcome.user.id);
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), AdapterError> {
        let Some(session) = self.session.write().take() else {
            self.events
                .publish(AuthEvent::new(AuthEventKind::SignedOut, None));
            return Ok(());
        };

        let url = self.auth_url("logout")?;
        let result = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;

        // The local session is gone either way.
        self.events
            .publish(AuthEvent::new(AuthEventKind::SignedOut, None));

        let resp = result?;
        if !resp.status().is_success() {
            let status = resp.status();
            warn!("remote logout returned HTTP {}", status);
            return Err(AdapterError::AuthRejected(format!("logout failed: HTTP {}", status)));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Identity>, AdapterError> {
        let url = self.auth_url("admin/users")?;
        let resp = self.with_keys(self.http.get(url)).send().await?;
        Ok(auth_response::<UserList>(resp).await?.users)
    }
}

#[async_trait]
impl DataAdapter for SupabaseClient {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, AdapterError> {
        let url = rest_url(&self.base, query)?;
        let resp = self.with_keys(self.http.get(url)).send().await?;
        if !resp.status().is_success() {
            return Err(AdapterError::query(&query.table, failure_message(resp).await));
        }
        Ok(resp.json::<Vec<Value>>().await?)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), AdapterError> {
        let url = self
            .base
            .join(&format!("rest/v1/{}", table))
            .map_err(|err| AdapterError::Transport(err.to_string()))?;
        let resp = self
            .with_keys(self.http.post(url))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AdapterError::query(table, failure_message(resp).await));
        }
        Ok(())
    }
}

/// Builds the PostgREST URL for a table query.
pub fn rest_url(base: &Url, query: &TableQuery) -> Result<Url, AdapterError> {
    let mut url = base
        .join(&format!("rest/v1/{}", query.table))
        .map_err(|err| AdapterError::Transport(err.to_string()))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("select", &query.select);
        for filter in &query.filters {
            pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
        }
        if !query.order.is_empty() {
            let order = query
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            pairs.append_pair("order", &order);
        }
        if let Some(limit) = query.limit {
            pairs.append_pair("limit", &limit.to_string());
        }
    }
    Ok(url)
}

/// Sign-up answers with a full token grant when auto-confirm is on, and with
/// the bare user (or `{ "user": ... }`) when confirmation is pending.
fn parse_sign_up(body: Value) -> Result<SignUpOutcome, AdapterError> {
    if body.get("access_token").is_some() {
        let session = serde_json::from_value::<TokenResponse>(body)?.into_session();
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }
    let user = match body.get("user") {
        Some(user) => serde_json::from_value::<Identity>(user.clone())?,
        None => serde_json::from_value::<Identity>(body)?,
    };
    Ok(SignUpOutcome {
        user,
        session: None,
    })
}

/// Decodes a GoTrue response, mapping client errors to `AuthRejected`.
async fn auth_response<T>(resp: Response) -> Result<T, AdapterError>
where
    T: serde::de::DeserializeOwned,
{
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    let message = failure_message(resp).await;
    if status.is_client_error() {
        Err(AdapterError::AuthRejected(message))
    } else {
        Err(AdapterError::Transport(format!("HTTP {}: {}", status, message)))
    }
}

async fn failure_message(resp: Response) -> String {
    let status = resp.status();
    match resp.json::<Value>().await {
        Ok(body) => error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
        Err(_) => format!("HTTP {}", status),
    }
}

/// Picks the human-readable part of a GoTrue or PostgREST error body.
fn error_message(body: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn base() -> Url {
        Url::parse("https://project.supabase.co/").unwrap()
    }

    fn held_session(expires_at: i64, refresh_token: Option<&str>) -> Session {
        Session {
            access_token: "old-access".into(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: Some(expires_at),
            user: Identity::new("u1"),
        }
    }

    /// Answers a single request on a local port with `status` and a JSON
    /// body. Returns the base URL to point the client at.
    async fn serve_once(status: &'static str, body: Value) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let body = body.to_string();
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/", addr)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    fn client(base_url: &str, session: Session) -> SupabaseClient {
        SupabaseClient::new(base_url, "anon", Duration::from_secs(5))
            .unwrap()
            .with_session(Some(session))
    }

    #[tokio::test]
    async fn live_session_is_returned_without_a_refresh() {
        // Nothing listens on port 9; any request would fail.
        let session = held_session(unix_now() + 3600, Some("r"));
        let client = client("http://127.0.0.1:9/", session.clone());
        assert_eq!(client.current_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_when_read() {
        let base = serve_once(
            "200 OK",
            json!({
                "access_token": "new-access",
                "refresh_token": "r2",
                "expires_in": 3600,
                "user": { "id": "u1" }
            }),
        )
        .await;
        let client = client(&base, held_session(1, Some("r")));
        let mut sub = client.subscribe();

        let session = client.current_session().await.unwrap().unwrap();

        assert_eq!(session.access_token, "new-access");
        assert!(!session.is_expired(unix_now()));
        assert_eq!(client.session(), Some(session));
        assert_eq!(sub.next().await.unwrap().kind, AuthEventKind::TokenRefreshed);
    }

    #[tokio::test]
    async fn expired_session_with_rejected_refresh_reads_as_absent() {
        let base = serve_once(
            "400 Bad Request",
            json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token" }),
        )
        .await;
        let client = client(&base, held_session(1, Some("revoked")));
        let mut sub = client.subscribe();

        assert_eq!(client.current_session().await.unwrap(), None);
        assert!(client.session().is_none());
        let event = sub.next().await.unwrap();
        assert_eq!(event.kind, AuthEventKind::SignedOut);
        assert!(event.session.is_none());
    }

    #[tokio::test]
    async fn expired_session_without_refresh_token_reads_as_absent() {
        let client = client("http://127.0.0.1:9/", held_session(1, None));
        let mut sub = client.subscribe();

        assert_eq!(client.current_session().await.unwrap(), None);
        assert!(client.session().is_none());
        assert_eq!(sub.next().await.unwrap().kind, AuthEventKind::SignedOut);
    }

    #[tokio::test]
    async fn rejected_refresh_ends_the_session() {
        let base = serve_once("401 Unauthorized", json!({ "msg": "refresh token expired" })).await;
        let client = client(&base, held_session(unix_now() + 3600, Some("stale")));
        let mut sub = client.subscribe();

        let err = client.refresh_session().await.unwrap_err();

        assert_eq!(err, AdapterError::AuthRejected("refresh token expired".into()));
        assert!(client.session().is_none());
        assert_eq!(sub.next().await.unwrap().kind, AuthEventKind::SignedOut);
    }

    #[test]
    fn rest_url_encodes_filters_and_order() {
        let query = TableQuery::from("delivery_windows")
            .select("*, condominium:condominiums(*)")
            .eq("is_active", "true")
            .order("day_of_week", true)
            .order("start_time", false)
            .limit(5);

        let url = rest_url(&base(), &query).unwrap();
        assert_eq!(url.path(), "/rest/v1/delivery_windows");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*,condominium:condominiums(*)".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("order".to_string(), "day_of_week.asc,start_time.desc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn sign_up_with_token_grant_yields_session() {
        let body = json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_at": 1700000000,
            "user": { "id": "u1", "email": "ana@example.com" }
        });
        let outcome = parse_sign_up(body).unwrap();
        assert_eq!(outcome.user.id, "u1");
        let session = outcome.session.unwrap();
        assert_eq!(session.expires_at, Some(1700000000));
    }

    #[test]
    fn sign_up_pending_confirmation_has_no_session() {
        let outcome = parse_sign_up(json!({ "id": "u2", "email": "bo@example.com" })).unwrap();
        assert_eq!(outcome.user.id, "u2");
        assert!(outcome.session.is_none());

        let wrapped = parse_sign_up(json!({ "user": { "id": "u3" } })).unwrap();
        assert_eq!(wrapped.user.id, "u3");
    }

    #[test]
    fn error_message_prefers_description() {
        let body = json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" });
        assert_eq!(error_message(&body).as_deref(), Some("Invalid login credentials"));
        assert_eq!(
            error_message(&json!({ "message": "permission denied" })).as_deref(),
            Some("permission denied")
        );
        assert!(error_message(&json!({})).is_none());
    }

    #[tokio::test]
    async fn sign_out_without_session_still_notifies() {
        let client =
            SupabaseClient::new("https://project.supabase.co/", "anon", Duration::from_secs(5))
                .unwrap();
        let mut sub = client.subscribe();
        client.sign_out().await.unwrap();
        assert_eq!(sub.next().await.unwrap().kind, AuthEventKind::SignedOut);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            SupabaseClient::new("not a url", "anon", Duration::from_secs(5)),
            Err(AdapterError::Transport(_))
        ));
    }
}
