//! Public event queries and organizer submissions

use chrono::{DateTime, Duration, Utc};
use observability::EventMetrics;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::error::{EventError, EventResult};
use crate::mapper::{map_event_row, map_event_rows};
use crate::models::{Actor, CreateEventInput, EventItem, EventStatus, NewEvent};
use crate::repository::{EventColumn, EventQuery, EventRepository, SortDirection};

/// Length of the public "upcoming" window
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Inclusive `[now, now + 7 days]`
pub fn upcoming_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(UPCOMING_WINDOW_DAYS))
}

/// Event query service
pub struct EventService<R: EventRepository> {
    repository: Arc<R>,
}

impl<R: EventRepository> Clone for EventService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: EventRepository> EventService<R> {
    pub fn new(repository: R) -> Self {
        Self::from_shared(Arc::new(repository))
    }

    /// Build over a repository that other services also hold
    pub fn from_shared(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Approved events starting within the upcoming window, soonest first.
    ///
    /// Backend failures are logged and yield an empty list.
    #[instrument(skip(self))]
    pub async fn fetch_upcoming(&self, now: DateTime<Utc>) -> Vec<EventItem> {
        let (from, to) = upcoming_window(now);
        let query = EventQuery::new()
            .status(EventStatus::Approved)
            .start_between(from, to)
            .order_by(EventColumn::Start, SortDirection::Asc);

        match self.repository.select(&query).await {
            Ok(rows) => {
                let events = map_event_rows(rows);
                EventMetrics::record_fetch(events.len());
                info!(count = events.len(), "Fetched upcoming events");
                events
            }
            Err(e) => {
                EventMetrics::record_fetch_failure();
                error!(error = %e, "Failed to fetch upcoming events");
                Vec::new()
            }
        }
    }

    /// Submit a new event for moderation on behalf of `actor`.
    #[instrument(skip(self, input, actor), fields(title = %input.title))]
    pub async fn create_submission(
        &self,
        input: CreateEventInput,
        actor: &Actor,
    ) -> EventResult<EventItem> {
        let Some(user) = actor.user() else {
            EventMetrics::record_submission("unauthenticated");
            warn!("Submission attempted without a session");
            return Err(EventError::Unauthenticated);
        };

        input.validate()?;

        let row = self
            .repository
            .insert(NewEvent::from_input(input, user.id))
            .await
            .map_err(|e| {
                EventMetrics::record_submission("rejected");
                warn!(error = %e, "Backend rejected submission");
                EventError::Rejected(e.message())
            })?;

        let event = map_event_row(&row)?;
        EventMetrics::record_submission("accepted");
        info!(event_id = %event.id, organizer_id = %user.id, "Event submitted for review");
        Ok(event)
    }
}
