//! HTTP handlers for the community events API

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthProvider;
use crate::error::{ErrorResponse, EventError, EventResult};
use crate::filter::EventFilter;
use crate::map::MapView;
use crate::models::{Actor, CreateEventInput, EventItem, Session, SignInRequest};
use crate::moderation::{AdminCheck, DEFAULT_APPROVED_LIMIT, Listing, ModerationService};
use crate::repository::{AdminRepository, EventRepository, UserScoped};
use crate::service::EventService;

/// Everything a backend must provide to serve the API
pub trait Backend:
    EventRepository + AdminRepository + AuthProvider + UserScoped + 'static
{
}

impl<T> Backend for T where
    T: EventRepository + AdminRepository + AuthProvider + UserScoped + 'static
{
}

/// Services shared by all handlers.
///
/// The shared services run as the project and serve public reads. Work done
/// for a signed-in caller goes through a scope bound to their access token.
pub struct EventsContext<B: Backend> {
    pub events: EventService<B>,
    pub moderation: ModerationService<B, B>,
    pub backend: Arc<B>,
}

impl<B: Backend> EventsContext<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            events: EventService::from_shared(Arc::clone(&backend)),
            moderation: ModerationService::from_shared(Arc::clone(&backend), Arc::clone(&backend)),
            backend,
        }
    }

    /// Event service whose table requests run as the holder of `access_token`
    pub fn events_as(&self, access_token: &str) -> EventService<B> {
        EventService::new(self.backend.as_user(access_token))
    }

    /// Moderation service whose table requests run as the holder of `access_token`
    pub fn moderation_as(&self, access_token: &str) -> ModerationService<B, B> {
        let scoped = Arc::new(self.backend.as_user(access_token));
        ModerationService::from_shared(Arc::clone(&scoped), scoped)
    }
}

/// Events router state
pub type EventsState<B> = Arc<EventsContext<B>>;

/// Create the events router over `backend`
pub fn events_router<B: Backend>(backend: Arc<B>) -> Router {
    Router::new()
        .route("/events", post(create_event::<B>))
        .route("/events/upcoming", get(list_upcoming::<B>))
        .route("/events/map", get(map_view::<B>))
        .route("/auth/sign-in", post(sign_in::<B>))
        .route("/auth/sign-out", post(sign_out::<B>))
        .route("/admin/check", get(admin_check::<B>))
        .route("/admin/events/pending", get(list_pending::<B>))
        .route("/admin/events/approved", get(list_approved::<B>))
        .route("/admin/events/{id}/approve", post(approve_event::<B>))
        .route("/admin/events/{id}/reject", post(reject_event::<B>))
        .route("/admin/events/{id}", delete(delete_event::<B>))
        .with_state(Arc::new(EventsContext::new(backend)))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Anonymous unless the bearer token resolves to a user
async fn resolve_actor<B: Backend>(state: &EventsContext<B>, headers: &HeaderMap) -> Actor {
    let Some(token) = bearer_token(headers) else {
        return Actor::Anonymous;
    };
    match state.backend.get_user(token).await {
        Ok(user) => Actor::Authenticated(user),
        Err(e) => {
            debug!(error = %e, "Bearer token did not resolve to a user");
            Actor::Anonymous
        }
    }
}

/// The caller's moderation scope, once their token resolves to an admin
async fn require_admin<B: Backend>(
    state: &EventsContext<B>,
    headers: &HeaderMap,
) -> EventResult<ModerationService<B, B>> {
    let token = bearer_token(headers).ok_or(EventError::Unauthenticated)?;
    let moderation = state.moderation_as(token);
    let check = moderation.is_admin_token(state.backend.as_ref(), token).await;
    if check.is_admin {
        Ok(moderation)
    } else {
        warn!(reason = ?check.error, "Admin route refused");
        Err(EventError::Forbidden)
    }
}

/// Approved events in the next seven days, filtered
#[utoipa::path(
    get,
    path = "/events/upcoming",
    params(EventFilter),
    responses(
        (status = 200, description = "Upcoming approved events, soonest first", body = Vec<EventItem>),
        (status = 400, description = "Unknown category")
    ),
    tag = "events"
)]
#[instrument(skip(state))]
pub async fn list_upcoming<B: Backend>(
    State(state): State<EventsState<B>>,
    Query(filter): Query<EventFilter>,
) -> Json<Vec<EventItem>> {
    let events = state.events.fetch_upcoming(Utc::now()).await;
    Json(filter.apply(&events))
}

/// Markers and viewport for the filtered upcoming events
#[utoipa::path(
    get,
    path = "/events/map",
    params(EventFilter),
    responses(
        (status = 200, description = "Map markers with the initial viewport", body = MapView)
    ),
    tag = "events"
)]
#[instrument(skip(state))]
pub async fn map_view<B: Backend>(
    State(state): State<EventsState<B>>,
    Query(filter): Query<EventFilter>,
) -> Json<MapView> {
    let events = state.events.fetch_upcoming(Utc::now()).await;
    Json(MapView::from_events(&filter.apply(&events)))
}

/// Submit an event for review
#[utoipa::path(
    post,
    path = "/events",
    request_body = CreateEventInput,
    responses(
        (status = 201, description = "Submission stored as pending", body = EventItem),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 422, description = "Backend rejected the submission", body = ErrorResponse)
    ),
    tag = "events"
)]
#[instrument(skip(state, headers, input), fields(title = %input.title))]
pub async fn create_event<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
    Json(input): Json<CreateEventInput>,
) -> EventResult<impl IntoResponse> {
    let actor = resolve_actor(&state, &headers).await;
    let events = match bearer_token(&headers) {
        Some(token) if actor.is_authenticated() => state.events_as(token),
        _ => state.events.clone(),
    };
    let event = events.create_submission(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Exchange email and password for an access token
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = Session),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn sign_in<B: Backend>(
    State(state): State<EventsState<B>>,
    Json(request): Json<SignInRequest>,
) -> EventResult<Json<Session>> {
    request.validate()?;
    let session = state
        .backend
        .sign_in(&request.email, &request.password)
        .await
        .map_err(|e| EventError::Auth(e.message()))?;
    Ok(Json(session))
}

/// Revoke the bearer token
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "No bearer token", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers))]
pub async fn sign_out<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
) -> EventResult<StatusCode> {
    let token = bearer_token(&headers).ok_or(EventError::Unauthenticated)?;
    state
        .backend
        .sign_out(token)
        .await
        .map_err(|e| EventError::Auth(e.message()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Whether the bearer is an admin
#[utoipa::path(
    get,
    path = "/admin/check",
    responses(
        (status = 200, description = "Admin check result", body = AdminCheck)
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn admin_check<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
) -> Json<AdminCheck> {
    let check = match bearer_token(&headers) {
        Some(token) => {
            state
                .moderation_as(token)
                .is_admin_token(state.backend.as_ref(), token)
                .await
        }
        None => state.moderation.is_admin(&Actor::Anonymous).await,
    };
    Json(check)
}

/// Pending submissions, oldest first
#[utoipa::path(
    get,
    path = "/admin/events/pending",
    responses(
        (status = 200, description = "Pending events", body = Listing),
        (status = 401, description = "No bearer token", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn list_pending<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
) -> EventResult<Json<Listing>> {
    let moderation = require_admin(&state, &headers).await?;
    Ok(Json(moderation.list_pending().await))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApprovedParams {
    /// Defaults to 50
    pub limit: Option<usize>,
}

/// Approved events, soonest first
#[utoipa::path(
    get,
    path = "/admin/events/approved",
    params(ApprovedParams),
    responses(
        (status = 200, description = "Approved events", body = Listing),
        (status = 401, description = "No bearer token", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn list_approved<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
    Query(params): Query<ApprovedParams>,
) -> EventResult<Json<Listing>> {
    let moderation = require_admin(&state, &headers).await?;
    let limit = params.limit.unwrap_or(DEFAULT_APPROVED_LIMIT);
    Ok(Json(moderation.list_approved(limit).await))
}

/// Approve a pending event
#[utoipa::path(
    post,
    path = "/admin/events/{id}/approve",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Approved, or nothing pending to approve"),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 502, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn approve_event<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> EventResult<StatusCode> {
    let moderation = require_admin(&state, &headers).await?;
    moderation.approve(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject a pending event
#[utoipa::path(
    post,
    path = "/admin/events/{id}/reject",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Rejected, or nothing pending to reject"),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 502, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn reject_event<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> EventResult<StatusCode> {
    let moderation = require_admin(&state, &headers).await?;
    moderation.reject(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete an event in any status
#[utoipa::path(
    delete,
    path = "/admin/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Deleted, or already absent"),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 502, description = "Backend failure", body = ErrorResponse)
    ),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn delete_event<B: Backend>(
    State(state): State<EventsState<B>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> EventResult<StatusCode> {
    let moderation = require_admin(&state, &headers).await?;
    moderation.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
