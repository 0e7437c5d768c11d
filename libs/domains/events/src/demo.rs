//! Sample events around Springfield, IL for local development.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::models::{EventCategory, EventRecord, EventStatus};

struct DemoEvent {
    title: &'static str,
    description: &'static str,
    category: EventCategory,
    /// Whole days after today
    day: i64,
    start_hour: i64,
    duration_hours: i64,
    address: &'static str,
    price: &'static str,
    website: &'static str,
    lat: f64,
    lng: f64,
}

const DEMO_EVENTS: [DemoEvent; 5] = [
    DemoEvent {
        title: "Downtown Farmers' Market",
        description: "Local produce, baked goods, and handmade crafts from Springfield vendors.",
        category: EventCategory::Food,
        day: 1,
        start_hour: 9,
        duration_hours: 4,
        address: "100 Main St, Springfield",
        price: "Free",
        website: "https://example.com/farmers-market",
        lat: 39.8015,
        lng: -89.6437,
    },
    DemoEvent {
        title: "Live Jazz in the Park",
        description: "An evening of smooth jazz with local artists. Bring a blanket!",
        category: EventCategory::Music,
        day: 2,
        start_hour: 23,
        duration_hours: 2,
        address: "Riverside Park, Springfield",
        price: "$10",
        website: "https://example.com/jazz-park",
        lat: 39.7969,
        lng: -89.6502,
    },
    DemoEvent {
        title: "Family Art Workshop",
        description: "Hands-on art activities for kids and parents. Materials provided.",
        category: EventCategory::Family,
        day: 3,
        start_hour: 16,
        duration_hours: 2,
        address: "Community Arts Center, Springfield",
        price: "Free (RSVP)",
        website: "https://example.com/art-workshop",
        lat: 39.7988,
        lng: -89.6369,
    },
    DemoEvent {
        title: "Local Makers Pop-up",
        description: "Discover crafts, jewelry, and design goods from Springfield makers.",
        category: EventCategory::Arts,
        day: 4,
        start_hour: 15,
        duration_hours: 6,
        address: "Warehouse District, Springfield",
        price: "Free",
        website: "https://example.com/makers",
        lat: 39.8032,
        lng: -89.6481,
    },
    DemoEvent {
        title: "Community 5K Run",
        description: "A friendly 5K through the historic district. All levels welcome.",
        category: EventCategory::Sports,
        day: 5,
        start_hour: 14,
        duration_hours: 1,
        address: "Heritage Square, Springfield",
        price: "$25",
        website: "https://example.com/5k",
        lat: 39.7951,
        lng: -89.6408,
    },
];

/// Five approved events spread over the days after `now`, all inside the
/// upcoming window.
pub fn demo_events(now: DateTime<Utc>) -> Vec<EventRecord> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();

    DEMO_EVENTS
        .iter()
        .map(|demo| {
            let start = midnight + Duration::days(demo.day) + Duration::hours(demo.start_hour);
            EventRecord {
                id: Uuid::now_v7(),
                title: demo.title.to_string(),
                description: demo.description.to_string(),
                category: demo.category,
                start,
                end: Some(start + Duration::hours(demo.duration_hours)),
                address: demo.address.to_string(),
                price: demo.price.to_string(),
                website: Some(demo.website.to_string()),
                lat: demo.lat,
                lng: demo.lng,
                status: EventStatus::Approved,
                organizer_id: Uuid::nil(),
                created_at: now,
            }
        })
        .collect()
}
