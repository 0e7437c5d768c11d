//! Community Events Domain
//!
//! Public listing of approved local events, organizer submissions and admin
//! moderation, backed by a hosted PostgREST/GoTrue service or an in-memory
//! store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Event Flow                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  GET /events/upcoming ─► EventService ─► EventRepository      │
//! │                              │              (rows)            │
//! │                              ▼                                │
//! │                           mapper ─► EventFilter ─► list / map │
//! │                                                               │
//! │  POST /events ─► AuthProvider (actor) ─► EventService         │
//! │                                          └─► insert pending   │
//! │                                                               │
//! │  /admin/* ─► ModerationService ─► AdminRepository (allow-list)│
//! │                        └─► guarded status update / delete     │
//! │                                                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use utoipa::OpenApi;

mod auth;
mod demo;
mod error;
mod filter;
mod handlers;
mod map;
mod mapper;
mod models;
mod moderation;
mod repository;
mod service;
mod supabase;

pub use auth::{AuthProvider, InMemoryAuthProvider, SessionHandle};
pub use demo::demo_events;
pub use error::{BackendError, ErrorResponse, EventError, EventResult};
pub use filter::{CategoryFilter, EventFilter, filter_events};
pub use handlers::{ApprovedParams, Backend, EventsContext, EventsState, events_router};
pub use map::{
    DEFAULT_CENTER, DEFAULT_ZOOM, FIT_PADDING, LatLng, LatLngBounds, MapPresenter, MapView,
    Marker, SINGLE_POINT_ZOOM, ViewportCommand, fit_view, initial_view,
};
pub use mapper::{MapError, RawEventRow, map_event_row, map_event_rows};
pub use models::{
    Actor, AuthUser, CreateEventInput, EventCategory, EventItem, EventRecord, EventStatus,
    NewEvent, Session, SignInRequest,
};
pub use moderation::{AdminCheck, DEFAULT_APPROVED_LIMIT, Listing, ModerationAction, ModerationService};
pub use repository::{
    AdminRepository, EventColumn, EventQuery, EventRepository, InMemoryBackend, SortDirection,
    TITLE_NOT_BLANK, UserScoped,
};
pub use service::{EventService, UPCOMING_WINDOW_DAYS, upcoming_window};
pub use supabase::{SupabaseClient, event_query_params};

/// OpenAPI documentation for the Events API
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_upcoming,
        handlers::map_view,
        handlers::create_event,
        handlers::sign_in,
        handlers::sign_out,
        handlers::admin_check,
        handlers::list_pending,
        handlers::list_approved,
        handlers::approve_event,
        handlers::reject_event,
        handlers::delete_event,
    ),
    components(schemas(
        EventItem,
        EventCategory,
        EventStatus,
        CreateEventInput,
        EventFilter,
        SignInRequest,
        Session,
        AuthUser,
        AdminCheck,
        Listing,
        MapView,
        Marker,
        LatLng,
        LatLngBounds,
        ViewportCommand,
        ErrorResponse,
    )),
    tags(
        (name = "events", description = "Public listing and organizer submissions"),
        (name = "auth", description = "Session management"),
        (name = "admin", description = "Moderation of submitted events")
    )
)]
pub struct ApiDoc;
