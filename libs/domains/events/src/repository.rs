//! Backend collaborator traits and the in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use strum::Display;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{AuthProvider, InMemoryAuthProvider};
use crate::error::BackendError;
use crate::mapper::RawEventRow;
use crate::models::{AuthUser, EventRecord, EventStatus, NewEvent, Session};

/// Sortable columns of the `events` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventColumn {
    Start,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Table-style select on `events`: equality on status, inclusive range on
/// start, single-column ordering and an optional limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub status: Option<EventStatus>,
    pub start_from: Option<DateTime<Utc>>,
    pub start_to: Option<DateTime<Utc>>,
    pub order: Option<(EventColumn, SortDirection)>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Both bounds inclusive
    pub fn start_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.start_from = Some(from);
        self.start_to = Some(to);
        self
    }

    pub fn order_by(mut self, column: EventColumn, direction: SortDirection) -> Self {
        self.order = Some((column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a stored record passes the filters (ordering and limit aside)
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self.start_from.is_none_or(|from| record.start >= from)
            && self.start_to.is_none_or(|to| record.start <= to)
    }
}

/// Read/write access to the `events` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Rows matching the query, unmapped
    async fn select(&self, query: &EventQuery) -> Result<Vec<RawEventRow>, BackendError>;

    /// Insert and return the stored row
    async fn insert(&self, event: NewEvent) -> Result<RawEventRow, BackendError>;

    /// Set `status = to` where `id` matches and the current status is one of
    /// `allowed_from`. Returns the number of rows changed.
    async fn update_status(
        &self,
        id: Uuid,
        allowed_from: Vec<EventStatus>,
        to: EventStatus,
    ) -> Result<u64, BackendError>;

    /// Returns the number of rows removed
    async fn delete(&self, id: Uuid) -> Result<u64, BackendError>;
}

/// Lookup in the `admins` allow-list
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, BackendError>;
}

/// Backends whose table access can run as a signed-in user, so row-level
/// policies see the caller rather than the project.
pub trait UserScoped: Sized {
    /// Handle whose table requests carry `access_token` as the caller identity
    fn as_user(&self, access_token: &str) -> Self;
}

pub(crate) fn record_to_row(record: &EventRecord) -> Result<RawEventRow, BackendError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(BackendError::Decode(format!("expected object, got {}", other))),
    }
}

/// Check constraint on `events.title`: `char_length(trim(title)) > 0`
pub const TITLE_NOT_BLANK: &str = "events_title_not_blank";

/// In-memory backend (for development/testing).
///
/// Holds the `events` and `admins` tables plus a small credential store, and
/// implements every backend trait so it can stand in for the hosted service.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    events: Arc<RwLock<Vec<EventRecord>>>,
    admins: Arc<RwLock<HashSet<Uuid>>>,
    auth: InMemoryAuthProvider,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing the pending-only submission path
    pub async fn seed(&self, record: EventRecord) {
        self.events.write().await.push(record);
    }

    pub async fn seed_all(&self, records: impl IntoIterator<Item = EventRecord>) {
        self.events.write().await.extend(records);
    }

    pub async fn grant_admin(&self, user_id: Uuid) {
        self.admins.write().await.insert(user_id);
    }

    pub async fn register_user(&self, email: &str, password: &str) -> AuthUser {
        self.auth.register(email, password).await
    }

    /// Snapshot of the stored records, in insertion order
    pub async fn records(&self) -> Vec<EventRecord> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventRepository for InMemoryBackend {
    async fn select(&self, query: &EventQuery) -> Result<Vec<RawEventRow>, BackendError> {
        let events = self.events.read().await;

        let mut matched: Vec<&EventRecord> = events.iter().filter(|r| query.matches(r)).collect();

        if let Some((column, direction)) = query.order {
            matched.sort_by(|a, b| {
                let ordering = match column {
                    EventColumn::Start => a.start.cmp(&b.start),
                    EventColumn::CreatedAt => a.created_at.cmp(&b.created_at),
                };
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        matched
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(record_to_row)
            .collect()
    }

    async fn insert(&self, event: NewEvent) -> Result<RawEventRow, BackendError> {
        if event.title.trim().is_empty() {
            return Err(BackendError::Constraint(format!(
                "new row for relation \"events\" violates check constraint \"{}\"",
                TITLE_NOT_BLANK
            )));
        }

        let record = EventRecord::from_new(event, Utc::now());
        let row = record_to_row(&record)?;
        let event_id = record.id;
        self.events.write().await.push(record);

        tracing::debug!(event_id = %event_id, "Inserted event");
        Ok(row)
    }

    async fn update_status(
        &self,
        id: Uuid,
        allowed_from: Vec<EventStatus>,
        to: EventStatus,
    ) -> Result<u64, BackendError> {
        let mut events = self.events.write().await;
        let mut affected = 0;
        for record in events
            .iter_mut()
            .filter(|r| r.id == id && allowed_from.contains(&r.status))
        {
            record.status = to;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, id: Uuid) -> Result<u64, BackendError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|r| r.id != id);
        Ok((before - events.len()) as u64)
    }
}

#[async_trait]
impl AdminRepository for InMemoryBackend {
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, BackendError> {
        Ok(self.admins.read().await.contains(&user_id))
    }
}

/// Row-level policies are not modeled here; every scope shares the same tables.
impl UserScoped for InMemoryBackend {
    fn as_user(&self, _access_token: &str) -> Self {
        self.clone()
    }
}

#[async_trait]
impl AuthProvider for InMemoryBackend {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.auth.get_user(access_token).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        self.auth.sign_in(email, password).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.auth.sign_out(access_token).await
    }
}
