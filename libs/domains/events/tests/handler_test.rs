//! Handler tests for the events domain
//!
//! These exercise the router end to end over the in-memory backend:
//! - Bearer token resolution
//! - Status codes and error bodies
//! - Query-string filtering

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use domain_events::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

struct TestApp {
    backend: Arc<InMemoryBackend>,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_all(demo_events(Utc::now())).await;
        let router = events_router(Arc::clone(&backend));
        Self { backend, router }
    }

    async fn token_for(&self, email: &str, admin: bool) -> String {
        let user = self.backend.register_user(email, "pw").await;
        if admin {
            self.backend.grant_admin(user.id).await;
        }
        self.backend.sign_in(email, "pw").await.unwrap().access_token
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn submission_body() -> Value {
    json!({
        "title": "Downtown Book Swap",
        "description": "Bring a book, take a book. Coffee provided.",
        "category": "Family",
        "start": (Utc::now() + Duration::days(2)).to_rfc3339(),
        "address": "Lincoln Library, Springfield",
        "price": "Free",
        "website": "",
        "lat": 39.8003,
        "lng": -89.6498
    })
}

#[tokio::test]
async fn test_upcoming_returns_seeded_events() {
    let app = TestApp::new().await;

    let response = app.send(get("/events/upcoming", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let events: Vec<EventItem> = json_body(response.into_body()).await;
    assert_eq!(events.len(), 5);
}

#[tokio::test]
async fn test_upcoming_filters_by_category_and_query() {
    let app = TestApp::new().await;

    let response = app.send(get("/events/upcoming?category=Music", None)).await;
    let events: Vec<EventItem> = json_body(response.into_body()).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Live Jazz in the Park");

    let response = app.send(get("/events/upcoming?category=All&q=SPRINGFIELD", None)).await;
    let events: Vec<EventItem> = json_body(response.into_body()).await;
    assert_eq!(events.len(), 5);
}

#[tokio::test]
async fn test_upcoming_unknown_category_is_bad_request() {
    let app = TestApp::new().await;
    let response = app.send(get("/events/upcoming?category=Theatre", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_map_view_fits_bounds() {
    let app = TestApp::new().await;

    let response = app.send(get("/events/map", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let view: Value = json_body(response.into_body()).await;
    assert_eq!(view["viewport"]["kind"], "fit_bounds");
    assert_eq!(view["viewport"]["padding"], json!([24, 24]));
    assert_eq!(view["zoom"], 13);
    assert_eq!(view["markers"].as_array().unwrap().len(), 5);

    let response = app.send(get("/events/map?category=Sports", None)).await;
    let view: Value = json_body(response.into_body()).await;
    assert_eq!(view["viewport"]["kind"], "center");
    assert_eq!(view["viewport"]["zoom"], 14);
}

#[tokio::test]
async fn test_create_event_requires_session() {
    let app = TestApp::new().await;

    let response = app.send(post_json("/events", None, submission_body())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "UNAUTHORIZED");

    let response = app
        .send(post_json("/events", Some("not-a-token"), submission_body()))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_event_returns_201_and_stays_private() {
    let app = TestApp::new().await;
    let token = app.token_for("organizer@example.com", false).await;

    let response = app
        .send(post_json("/events", Some(&token), submission_body()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: EventItem = json_body(response.into_body()).await;
    assert_eq!(created.title, "Downtown Book Swap");
    assert_eq!(created.website, "");

    let response = app.send(get("/events/upcoming?q=book%20swap", None)).await;
    let events: Vec<EventItem> = json_body(response.into_body()).await;
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_create_event_validation_error() {
    let app = TestApp::new().await;
    let token = app.token_for("organizer@example.com", false).await;

    let mut body = submission_body();
    body["website"] = json!("not a url");
    body["price"] = json!("");

    let response = app.send(post_json("/events", Some(&token), body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_and_out() {
    let app = TestApp::new().await;
    app.backend.register_user("organizer@example.com", "pw").await;

    let response = app
        .send(post_json(
            "/auth/sign-in",
            None,
            json!({ "email": "organizer@example.com", "password": "wrong" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(post_json(
            "/auth/sign-in",
            None,
            json!({ "email": "organizer@example.com", "password": "pw" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let session: Session = json_body(response.into_body()).await;

    let response = app
        .send(empty("POST", "/auth/sign-out", &session.access_token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(app.backend.get_user(&session.access_token).await.is_err());
}

#[tokio::test]
async fn test_admin_check_endpoint() {
    let app = TestApp::new().await;

    let response = app.send(get("/admin/check", None)).await;
    let check: AdminCheck = json_body(response.into_body()).await;
    assert!(!check.is_admin);
    assert_eq!(check.error.as_deref(), Some("Not authenticated"));

    let token = app.token_for("admin@example.com", true).await;
    let response = app.send(get("/admin/check", Some(&token))).await;
    let check: AdminCheck = json_body(response.into_body()).await;
    assert!(check.is_admin);
}

#[tokio::test]
async fn test_admin_routes_refuse_non_admins() {
    let app = TestApp::new().await;
    let organizer = app.token_for("organizer@example.com", false).await;

    let response = app.send(get("/admin/events/pending", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(get("/admin/events/pending", Some(&organizer))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let id = Uuid::now_v7();
    let response = app
        .send(empty("POST", &format!("/admin/events/{}/approve", id), &organizer))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(empty("DELETE", &format!("/admin/events/{}", id), &organizer))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_moderation_flow() {
    let app = TestApp::new().await;
    let organizer = app.token_for("organizer@example.com", false).await;
    let admin = app.token_for("admin@example.com", true).await;

    let response = app
        .send(post_json("/events", Some(&organizer), submission_body()))
        .await;
    let created: EventItem = json_body(response.into_body()).await;

    let response = app.send(get("/admin/events/pending", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let pending: Listing = json_body(response.into_body()).await;
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].id, created.id);

    let response = app
        .send(empty("POST", &format!("/admin/events/{}/approve", created.id), &admin))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.send(get("/admin/events/pending", Some(&admin))).await;
    let pending: Listing = json_body(response.into_body()).await;
    assert!(pending.items.is_empty());

    let response = app
        .send(get("/admin/events/approved?limit=10", Some(&admin)))
        .await;
    let approved: Listing = json_body(response.into_body()).await;
    assert!(approved.items.iter().any(|e| e.id == created.id));

    let response = app.send(get("/events/upcoming?q=book%20swap", None)).await;
    let events: Vec<EventItem> = json_body(response.into_body()).await;
    assert_eq!(events.len(), 1);

    let response = app
        .send(empty("DELETE", &format!("/admin/events/{}", created.id), &admin))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(empty("DELETE", &format!("/admin/events/{}", created.id), &admin))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_approved_listing_respects_limit() {
    let app = TestApp::new().await;
    let admin = app.token_for("admin@example.com", true).await;

    let response = app
        .send(get("/admin/events/approved?limit=2", Some(&admin)))
        .await;
    let approved: Listing = json_body(response.into_body()).await;
    assert_eq!(approved.items.len(), 2);
    assert!(approved.items[0].start <= approved.items[1].start);
}
