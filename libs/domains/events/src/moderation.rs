//! Admin moderation: allow-list check, review listings and status changes.

use observability::EventMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthProvider;
use crate::error::{EventError, EventResult};
use crate::mapper::map_event_rows;
use crate::models::{Actor, EventItem, EventStatus};
use crate::repository::{
    AdminRepository, EventColumn, EventQuery, EventRepository, SortDirection,
};

/// Page size for the approved listing when the caller gives none
pub const DEFAULT_APPROVED_LIMIT: usize = 50;

/// Outcome of an admin check. Never an error: failures are reported inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdminCheck {
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminCheck {
    fn granted() -> Self {
        Self {
            is_admin: true,
            error: None,
        }
    }

    fn denied(error: Option<String>) -> Self {
        Self {
            is_admin: false,
            error,
        }
    }
}

/// A moderation listing. On backend failure `items` is empty and `error`
/// carries the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    pub items: Vec<EventItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status-changing admin actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn target(self) -> EventStatus {
        match self {
            Self::Approve => EventStatus::Approved,
            Self::Reject => EventStatus::Rejected,
        }
    }

    /// Statuses this action may be applied to
    pub fn allowed_from(self) -> Vec<EventStatus> {
        use strum::IntoEnumIterator;
        EventStatus::iter()
            .filter(|s| s.can_transition_to(self.target()))
            .collect()
    }

    fn metric_label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Admin moderation service
pub struct ModerationService<R: EventRepository, A: AdminRepository> {
    events: Arc<R>,
    admins: Arc<A>,
}

impl<R: EventRepository, A: AdminRepository> Clone for ModerationService<R, A> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            admins: Arc::clone(&self.admins),
        }
    }
}

impl<R: EventRepository, A: AdminRepository> ModerationService<R, A> {
    pub fn new(events: R, admins: A) -> Self {
        Self::from_shared(Arc::new(events), Arc::new(admins))
    }

    pub fn from_shared(events: Arc<R>, admins: Arc<A>) -> Self {
        Self { events, admins }
    }

    /// Whether `actor` is on the admin allow-list
    #[instrument(skip(self))]
    pub async fn is_admin(&self, actor: &Actor) -> AdminCheck {
        let Some(user) = actor.user() else {
            return AdminCheck::denied(Some("Not authenticated".to_string()));
        };

        match self.admins.is_admin(user.id).await {
            Ok(true) => AdminCheck::granted(),
            Ok(false) => {
                debug!(user_id = %user.id, "User is not an admin");
                AdminCheck::denied(None)
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Admin lookup failed");
                AdminCheck::denied(Some(e.message()))
            }
        }
    }

    /// Resolve the token's identity first, then check the allow-list.
    #[instrument(skip(self, auth, access_token))]
    pub async fn is_admin_token<P: AuthProvider + ?Sized>(
        &self,
        auth: &P,
        access_token: &str,
    ) -> AdminCheck {
        match auth.get_user(access_token).await {
            Ok(user) => self.is_admin(&Actor::Authenticated(user)).await,
            Err(e) => AdminCheck::denied(Some(e.message())),
        }
    }

    /// Pending submissions, oldest first
    #[instrument(skip(self))]
    pub async fn list_pending(&self) -> Listing {
        let query = EventQuery::new()
            .status(EventStatus::Pending)
            .order_by(EventColumn::CreatedAt, SortDirection::Asc);
        self.listing(query).await
    }

    /// Up to `limit` approved events, soonest first
    #[instrument(skip(self))]
    pub async fn list_approved(&self, limit: usize) -> Listing {
        let query = EventQuery::new()
            .status(EventStatus::Approved)
            .order_by(EventColumn::Start, SortDirection::Asc)
            .limit(limit);
        self.listing(query).await
    }

    async fn listing(&self, query: EventQuery) -> Listing {
        match self.events.select(&query).await {
            Ok(rows) => Listing {
                items: map_event_rows(rows),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Moderation listing failed");
                Listing {
                    items: Vec::new(),
                    error: Some(e.message()),
                }
            }
        }
    }

    pub async fn approve(&self, id: Uuid) -> EventResult<()> {
        self.transition(id, ModerationAction::Approve).await
    }

    pub async fn reject(&self, id: Uuid) -> EventResult<()> {
        self.transition(id, ModerationAction::Reject).await
    }

    /// Conditional update; a row that is absent or not in an allowed status is
    /// left untouched and the call still succeeds.
    #[instrument(skip(self, action), fields(action = %action))]
    async fn transition(&self, id: Uuid, action: ModerationAction) -> EventResult<()> {
        let result = self
            .events
            .update_status(id, action.allowed_from(), action.target())
            .await;
        EventMetrics::record_moderation(action.metric_label(), result.is_ok());

        match result? {
            0 => debug!(event_id = %id, "No pending event matched, nothing changed"),
            _ => info!(event_id = %id, status = %action.target(), "Event moderated"),
        }
        Ok(())
    }

    /// Remove the event regardless of status. Absent ids succeed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> EventResult<()> {
        let result = self.events.delete(id).await;
        EventMetrics::record_moderation("delete", result.is_ok());

        let removed = result.map_err(EventError::from)?;
        info!(event_id = %id, removed, "Event deleted");
        Ok(())
    }
}
