//! Event domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError};

/// Closed set of event categories, serialized with their capitalized names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum EventCategory {
    Food,
    Music,
    Arts,
    Sports,
    Family,
}

/// Moderation status of a stored event
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    /// Only pending events can be moderated. Approved and rejected are terminal.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Pending, EventStatus::Approved)
                | (EventStatus::Pending, EventStatus::Rejected)
        )
    }
}

/// Public event record, produced from a backend row by the mapper.
///
/// Status is deliberately absent: it decides which query surfaces a row,
/// not how the row is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub address: String,
    /// Free text such as "Free" or "$10"
    pub price: String,
    /// Empty when the organizer gave none
    pub website: String,
    pub lat: f64,
    pub lng: f64,
}

/// A full stored row, as the in-memory backend keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub address: String,
    pub price: String,
    pub website: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub status: EventStatus,
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Materialize an insert payload the way the store does: fresh id and
    /// creation timestamp, everything else from the payload.
    pub fn from_new(event: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: event.title,
            description: event.description,
            category: event.category,
            start: event.start,
            end: event.end,
            address: event.address,
            price: event.price,
            website: event.website,
            lat: event.lat,
            lng: event.lng,
            status: event.status,
            organizer_id: event.organizer_id,
            created_at: now,
        }
    }
}

/// Insert payload handed to the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub start: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    pub address: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub status: EventStatus,
    pub organizer_id: Uuid,
}

impl NewEvent {
    /// Build a pending submission owned by `organizer_id`.
    ///
    /// Text fields are trimmed and a blank website is dropped.
    pub fn from_input(input: CreateEventInput, organizer_id: Uuid) -> Self {
        let website = input
            .website
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        Self {
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            category: input.category,
            start: input.start,
            end: input.end,
            address: input.address.trim().to_string(),
            price: input.price.trim().to_string(),
            website,
            lat: input.lat,
            lng: input.lng,
            status: EventStatus::Pending,
            organizer_id,
        }
    }
}

/// Submission form payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_time_range"))]
pub struct CreateEventInput {
    #[validate(length(min = 3, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 10, message = "Description is required"))]
    pub description: String,

    pub category: EventCategory,

    pub start: DateTime<Utc>,

    #[serde(default)]
    pub end: Option<DateTime<Utc>>,

    #[validate(length(min = 3, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "Price is required"))]
    pub price: String,

    /// Empty string is accepted and treated as no website
    #[serde(default)]
    #[validate(custom(function = "validate_website"))]
    pub website: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude is required"))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude is required"))]
    pub lng: f64,
}

fn validate_website(website: &str) -> Result<(), ValidationError> {
    let trimmed = website.trim();
    if trimmed.is_empty() || trimmed.validate_url() {
        return Ok(());
    }
    let mut err = ValidationError::new("url");
    err.message = Some("Must be a valid URL".into());
    Err(err)
}

fn validate_time_range(input: &CreateEventInput) -> Result<(), ValidationError> {
    match input.end {
        Some(end) if end < input.start => {
            let mut err = ValidationError::new("time_range");
            err.message = Some("End must not be before start".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Authenticated identity as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Access token issued on sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
}

/// Caller identity, passed explicitly into every operation that needs one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Actor {
    #[default]
    Anonymous,
    Authenticated(AuthUser),
}

impl Actor {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Actor::Anonymous => None,
            Actor::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

impl From<Option<AuthUser>> for Actor {
    fn from(user: Option<AuthUser>) -> Self {
        user.map(Actor::Authenticated).unwrap_or_default()
    }
}

/// Sign-in request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn valid_input() -> CreateEventInput {
        CreateEventInput {
            title: "Live Jazz in the Park".to_string(),
            description: "An evening of smooth jazz with local artists.".to_string(),
            category: EventCategory::Music,
            start: Utc.with_ymd_and_hms(2026, 6, 1, 19, 0, 0).unwrap(),
            end: None,
            address: "Riverside Park, Springfield".to_string(),
            price: "$10".to_string(),
            website: None,
            lat: 39.7969,
            lng: -89.6502,
        }
    }

    #[test]
    fn test_category_names() {
        let names: Vec<String> = EventCategory::iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["Food", "Music", "Arts", "Sports", "Family"]);

        for category in EventCategory::iter() {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category));
            assert_eq!(EventCategory::from_str(&category.to_string()).unwrap(), category);
        }
        assert!(EventCategory::from_str("food").is_err());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&EventStatus::Approved).unwrap(), "\"approved\"");
        assert_eq!(EventStatus::from_str("pending").unwrap(), EventStatus::Pending);
    }

    #[test]
    fn test_status_transitions() {
        assert!(EventStatus::Pending.can_transition_to(EventStatus::Approved));
        assert!(EventStatus::Pending.can_transition_to(EventStatus::Rejected));
        assert!(!EventStatus::Approved.can_transition_to(EventStatus::Rejected));
        assert!(!EventStatus::Rejected.can_transition_to(EventStatus::Approved));
        assert!(!EventStatus::Approved.can_transition_to(EventStatus::Pending));
    }

    #[test]
    fn test_create_input_valid() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn test_create_input_short_fields() {
        let mut input = valid_input();
        input.title = "ab".to_string();
        input.description = "too short".to_string();
        input.price = String::new();

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("price"));
    }

    #[test]
    fn test_create_input_website_rules() {
        let mut input = valid_input();
        input.website = Some(String::new());
        assert!(input.validate().is_ok());

        input.website = Some("https://example.com/jazz-park".to_string());
        assert!(input.validate().is_ok());

        input.website = Some("not a url".to_string());
        assert!(input.validate().unwrap_err().field_errors().contains_key("website"));
    }

    #[test]
    fn test_create_input_coordinates_out_of_range() {
        let mut input = valid_input();
        input.lat = 91.0;
        input.lng = -181.0;
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("lat"));
        assert!(errors.field_errors().contains_key("lng"));
    }

    #[test]
    fn test_create_input_end_before_start() {
        let mut input = valid_input();
        input.end = Some(input.start - Duration::hours(1));
        assert!(input.validate().is_err());

        input.end = Some(input.start + Duration::hours(2));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_new_event_from_input_is_pending_and_trimmed() {
        let organizer = Uuid::new_v4();
        let mut input = valid_input();
        input.title = "  Live Jazz ".to_string();
        input.price = " Free ".to_string();
        input.website = Some("   ".to_string());

        let event = NewEvent::from_input(input, organizer);
        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.organizer_id, organizer);
        assert_eq!(event.title, "Live Jazz");
        assert_eq!(event.price, "Free");
        assert_eq!(event.website, None);
    }

    #[test]
    fn test_actor_from_option() {
        assert_eq!(Actor::from(None), Actor::Anonymous);
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
        };
        assert!(Actor::from(Some(user)).is_authenticated());
    }
}
