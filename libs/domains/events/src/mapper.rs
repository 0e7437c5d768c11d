//! Backend row → [`EventItem`] mapping.
//!
//! Rows arrive as loosely typed JSON objects. Coordinates may be numbers or
//! numeric strings depending on the column type, so they are coerced here
//! and nowhere else.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::models::{EventCategory, EventItem};

/// A backend row before mapping
pub type RawEventRow = Map<String, Value>;

/// Why a single row could not be mapped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid id '{0}'")]
    InvalidId(String),

    #[error("unknown category '{0}'")]
    InvalidCategory(String),

    #[error("invalid timestamp in '{field}': {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("non-numeric coordinate in '{field}': {value}")]
    InvalidCoordinate { field: &'static str, value: String },
}

/// Map one backend row. Pure.
pub fn map_event_row(row: &RawEventRow) -> Result<EventItem, MapError> {
    let id = required_str(row, "id")?;
    let id = Uuid::parse_str(id.trim()).map_err(|_| MapError::InvalidId(id.to_string()))?;

    let title = required_str(row, "title")?.to_string();

    let category = required_str(row, "category")?;
    let category = EventCategory::from_str(category)
        .map_err(|_| MapError::InvalidCategory(category.to_string()))?;

    let start = parse_instant("start", required_str(row, "start")?)?;
    let end = match row.get("end") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(parse_instant("end", s)?),
        Some(other) => {
            return Err(MapError::InvalidTimestamp {
                field: "end",
                value: other.to_string(),
            });
        }
    };

    Ok(EventItem {
        id,
        title,
        description: text(row, "description"),
        category,
        start,
        end,
        address: text(row, "address"),
        price: text(row, "price"),
        website: text(row, "website"),
        lat: coordinate(row, "lat")?,
        lng: coordinate(row, "lng")?,
    })
}

/// Map a batch, skipping (and logging) rows that fail.
pub fn map_event_rows(rows: Vec<RawEventRow>) -> Vec<EventItem> {
    rows.iter()
        .filter_map(|row| match map_event_row(row) {
            Ok(item) => Some(item),
            Err(e) => {
                let row_id = row.get("id").map(Value::to_string).unwrap_or_default();
                warn!(row_id = %row_id, error = %e, "Skipping malformed event row");
                None
            }
        })
        .collect()
}

fn required_str<'a>(row: &'a RawEventRow, field: &'static str) -> Result<&'a str, MapError> {
    match row.get(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(MapError::MissingField(field)),
    }
}

/// Verbatim text; absent or null becomes empty.
fn text(row: &RawEventRow, field: &str) -> String {
    match row.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn coordinate(row: &RawEventRow, field: &'static str) -> Result<f64, MapError> {
    let invalid = |value: String| MapError::InvalidCoordinate { field, value };

    let value = match row.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        None => return Err(MapError::MissingField(field)),
        Some(other) => return Err(invalid(other.to_string())),
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(row.get(field).map(Value::to_string).unwrap_or_default())),
    }
}

/// RFC 3339, or a zone-less timestamp taken as UTC.
fn parse_instant(field: &'static str, value: &str) -> Result<DateTime<Utc>, MapError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MapError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(value: Value) -> RawEventRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    fn full_row() -> Value {
        json!({
            "id": "0194b1a2-8f3c-7d4e-9a1b-2c3d4e5f6a7b",
            "title": "Downtown Farmers' Market",
            "description": "Local produce",
            "category": "Food",
            "start": "2026-02-17T09:00:00Z",
            "end": "2026-02-17T13:00:00Z",
            "address": "100 Main St, Springfield",
            "price": "Free",
            "website": "https://example.com/farmers-market",
            "lat": 39.8015,
            "lng": -89.6437,
            "status": "approved",
            "organizer_id": "0194b1a2-0000-7000-8000-000000000001",
            "created_at": "2026-02-01T10:00:00Z"
        })
    }

    #[test]
    fn test_maps_full_row() {
        let item = map_event_row(&row(full_row())).unwrap();
        assert_eq!(item.title, "Downtown Farmers' Market");
        assert_eq!(item.category, EventCategory::Food);
        assert_eq!(item.start, Utc.with_ymd_and_hms(2026, 2, 17, 9, 0, 0).unwrap());
        assert_eq!(item.end, Some(Utc.with_ymd_and_hms(2026, 2, 17, 13, 0, 0).unwrap()));
        assert_eq!(item.price, "Free");
        assert_eq!(item.lat, 39.8015);
    }

    #[test]
    fn test_coerces_numeric_strings() {
        let mut value = full_row();
        value["lat"] = json!("39.8");
        value["lng"] = json!(" -89.6 ");
        let item = map_event_row(&row(value)).unwrap();
        assert_eq!(item.lat, 39.8);
        assert_eq!(item.lng, -89.6);
    }

    #[test]
    fn test_rejects_non_numeric_coordinate() {
        let mut value = full_row();
        value["lat"] = json!("north-ish");
        assert!(matches!(
            map_event_row(&row(value)),
            Err(MapError::InvalidCoordinate { field: "lat", .. })
        ));

        let mut value = full_row();
        value["lng"] = Value::Null;
        assert!(matches!(
            map_event_row(&row(value)),
            Err(MapError::InvalidCoordinate { field: "lng", .. })
        ));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let mut value = full_row();
        let obj = value.as_object_mut().unwrap();
        obj.remove("end");
        obj.remove("website");
        obj.insert("description".into(), Value::Null);

        let item = map_event_row(&row(value)).unwrap();
        assert_eq!(item.end, None);
        assert_eq!(item.website, "");
        assert_eq!(item.description, "");
    }

    #[test]
    fn test_offset_timestamps_are_normalized_to_utc() {
        let mut value = full_row();
        value["start"] = json!("2026-02-17T04:00:00-05:00");
        value["end"] = json!("2026-02-17 13:00:00");
        let item = map_event_row(&row(value)).unwrap();
        assert_eq!(item.start, Utc.with_ymd_and_hms(2026, 2, 17, 9, 0, 0).unwrap());
        assert_eq!(item.end, Some(Utc.with_ymd_and_hms(2026, 2, 17, 13, 0, 0).unwrap()));
    }

    #[test]
    fn test_rejects_unknown_category_and_missing_id() {
        let mut value = full_row();
        value["category"] = json!("Theatre");
        assert_eq!(
            map_event_row(&row(value)),
            Err(MapError::InvalidCategory("Theatre".to_string()))
        );

        let mut value = full_row();
        value.as_object_mut().unwrap().remove("id");
        assert_eq!(map_event_row(&row(value)), Err(MapError::MissingField("id")));
    }

    #[test]
    fn test_batch_skips_bad_rows() {
        let mut bad = full_row();
        bad["lat"] = json!("n/a");
        let rows = vec![row(full_row()), row(bad)];
        assert_eq!(map_event_rows(rows).len(), 1);
    }
}
