//! Map viewport computation and marker projection.
//!
//! The tile renderer is external; this module only decides what it should
//! be told to do for a given set of events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::EventItem;

/// Springfield, IL
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 39.799,
    lng: -89.644,
};
pub const DEFAULT_ZOOM: u8 = 13;
pub const SINGLE_POINT_ZOOM: u8 = 14;
/// Pixel padding applied when fitting bounds
pub const FIT_PADDING: [u32; 2] = [24, 24];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Smallest box containing every point; `None` for an empty slice
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            south_west: *first,
            north_east: *first,
        };
        for point in rest {
            bounds.extend(*point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }
}

/// What the map should do after the visible events change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewportCommand {
    /// Leave the view as it is
    Keep,
    Center {
        point: LatLng,
        zoom: u8,
    },
    FitBounds {
        bounds: LatLngBounds,
        #[schema(value_type = Vec<u32>)]
        padding: [u32; 2],
    },
}

pub fn fit_view(points: &[LatLng]) -> ViewportCommand {
    match points {
        [] => ViewportCommand::Keep,
        [point] => ViewportCommand::Center {
            point: *point,
            zoom: SINGLE_POINT_ZOOM,
        },
        _ => match LatLngBounds::from_points(points) {
            Some(bounds) => ViewportCommand::FitBounds {
                bounds,
                padding: FIT_PADDING,
            },
            None => ViewportCommand::Keep,
        },
    }
}

/// Starting view before any fit: the first point, or the default center
pub fn initial_view(points: &[LatLng]) -> (LatLng, u8) {
    (points.first().copied().unwrap_or(DEFAULT_CENTER), DEFAULT_ZOOM)
}

/// A clickable pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Marker {
    pub id: Uuid,
    pub title: String,
    pub address: String,
    pub start: DateTime<Utc>,
    pub position: LatLng,
}

/// Viewport state for one map instance.
///
/// Only the last point set is remembered; selection belongs to the caller.
#[derive(Debug, Default)]
pub struct MapPresenter {
    last_points: Option<Vec<LatLng>>,
}

impl MapPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(events: &[EventItem]) -> Vec<LatLng> {
        events.iter().map(|e| LatLng::new(e.lat, e.lng)).collect()
    }

    /// Returns a command only when the ordered point sequence differs from
    /// the previous call.
    pub fn update(&mut self, events: &[EventItem]) -> Option<ViewportCommand> {
        let points = Self::points(events);
        if self.last_points.as_ref() == Some(&points) {
            return None;
        }
        let command = fit_view(&points);
        self.last_points = Some(points);
        Some(command)
    }

    pub fn markers(events: &[EventItem]) -> Vec<Marker> {
        events
            .iter()
            .map(|e| Marker {
                id: e.id,
                title: e.title.clone(),
                address: e.address.clone(),
                start: e.start,
                position: LatLng::new(e.lat, e.lng),
            })
            .collect()
    }

    /// Report the clicked event to `on_select`. Returns whether one matched.
    pub fn click<'a, F>(events: &'a [EventItem], id: Uuid, on_select: F) -> bool
    where
        F: FnOnce(&'a EventItem),
    {
        match events.iter().find(|e| e.id == id) {
            Some(event) => {
                on_select(event);
                true
            }
            None => false,
        }
    }
}

/// Map payload served to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
    pub viewport: ViewportCommand,
    pub markers: Vec<Marker>,
}

impl MapView {
    pub fn from_events(events: &[EventItem]) -> Self {
        let points = MapPresenter::points(events);
        let (center, zoom) = initial_view(&points);
        Self {
            center,
            zoom,
            viewport: fit_view(&points),
            markers: MapPresenter::markers(events),
        }
    }
}
