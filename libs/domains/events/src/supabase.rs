//! Hosted backend over HTTP: PostgREST for tables, GoTrue for auth.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::auth::AuthProvider;
use crate::error::BackendError;
use crate::mapper::RawEventRow;
use crate::models::{AuthUser, EventStatus, NewEvent, Session};
use crate::repository::{AdminRepository, EventQuery, EventRepository, UserScoped};

const EVENTS_TABLE: &str = "events";
const ADMINS_TABLE: &str = "admins";

/// Client for a Supabase project.
///
/// Table requests run as the project key until [`UserScoped::as_user`] binds
/// a signed-in user's access token, after which row-level policies apply to
/// that user.
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("user_scoped", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Table request, authorized as the scoped user when there is one
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.request_as(method, url, bearer)
    }

    /// Request authorized as the holder of `bearer`
    fn request_as(&self, method: Method, url: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn rows(response: Response) -> Result<Vec<RawEventRow>, BackendError> {
        let response = ensure_success(response).await?;
        let body: Value = response.json().await?;
        match body {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(BackendError::Decode(format!(
                        "expected row object, got {}",
                        other
                    ))),
                })
                .collect(),
            other => Err(BackendError::Decode(format!("expected row array, got {}", other))),
        }
    }
}

/// PostgREST operators for an [`EventQuery`]
pub fn event_query_params(query: &EventQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    if let Some(status) = query.status {
        params.push(("status".into(), format!("eq.{}", status)));
    }
    if let Some(from) = query.start_from {
        params.push(("start".into(), format!("gte.{}", timestamp(from))));
    }
    if let Some(to) = query.start_to {
        params.push(("start".into(), format!("lte.{}", timestamp(to))));
    }
    if let Some((column, direction)) = query.order {
        params.push(("order".into(), format!("{}.{}", column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".into(), limit.to_string()));
    }
    params
}

fn status_update_params(id: Uuid, allowed_from: &[EventStatus]) -> Vec<(String, String)> {
    let allowed = allowed_from
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    vec![
        ("id".into(), format!("eq.{}", id)),
        ("status".into(), format!("in.({})", allowed)),
    ]
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Turn a non-2xx response into [`BackendError::Status`], keeping the
/// backend's own message when the body carries one.
async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "Backend request failed");
    Err(BackendError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl EventRepository for SupabaseClient {
    #[instrument(skip(self))]
    async fn select(&self, query: &EventQuery) -> Result<Vec<RawEventRow>, BackendError> {
        let response = self
            .request(Method::GET, &self.rest_url(EVENTS_TABLE))
            .query(&event_query_params(query))
            .send()
            .await?;
        let rows = Self::rows(response).await?;
        debug!(count = rows.len(), "Selected event rows");
        Ok(rows)
    }

    #[instrument(skip(self, event), fields(title = %event.title))]
    async fn insert(&self, event: NewEvent) -> Result<RawEventRow, BackendError> {
        let response = self
            .request(Method::POST, &self.rest_url(EVENTS_TABLE))
            .header("Prefer", "return=representation")
            .json(&event)
            .send()
            .await?;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no rows".to_string()))
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        allowed_from: Vec<EventStatus>,
        to: EventStatus,
    ) -> Result<u64, BackendError> {
        let response = self
            .request(Method::PATCH, &self.rest_url(EVENTS_TABLE))
            .query(&status_update_params(id, &allowed_from))
            .header("Prefer", "return=representation")
            .json(&json!({ "status": to }))
            .send()
            .await?;
        Ok(Self::rows(response).await?.len() as u64)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<u64, BackendError> {
        let response = self
            .request(Method::DELETE, &self.rest_url(EVENTS_TABLE))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        Ok(Self::rows(response).await?.len() as u64)
    }
}

#[async_trait]
impl AdminRepository for SupabaseClient {
    #[instrument(skip(self))]
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, BackendError> {
        let response = self
            .request(Method::GET, &self.rest_url(ADMINS_TABLE))
            .query(&[
                ("select", "user_id".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        Ok(!Self::rows(response).await?.is_empty())
    }
}

impl UserScoped for SupabaseClient {
    fn as_user(&self, access_token: &str) -> Self {
        Self {
            access_token: Some(access_token.to_string()),
            ..self.clone()
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    #[instrument(skip(self, access_token))]
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let response = self
            .request_as(Method::GET, &self.auth_url("user"), access_token)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let response = self
            .request_as(Method::POST, &self.auth_url("token"), &self.api_key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    #[instrument(skip(self, access_token))]
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .request_as(Method::POST, &self.auth_url("logout"), access_token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
