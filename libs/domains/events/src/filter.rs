//! Category, date and free-text filtering over an already-fetched list.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

use crate::models::{EventCategory, EventItem};

const ALL: &str = "All";

/// `"All"` or a single category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(EventCategory),
}

impl CategoryFilter {
    pub fn matches(&self, category: EventCategory) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == ALL {
            return Ok(Self::All);
        }
        EventCategory::from_str(trimmed)
            .map(Self::Only)
            .map_err(|_| format!("unknown category '{}'", trimmed))
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(category) => write!(f, "{}", category),
        }
    }
}

impl Serialize for CategoryFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CategoryFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Filter criteria, combined with AND. Empty criteria pass everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    /// `All` or one category name
    #[serde(default)]
    #[param(value_type = Option<String>, example = "Music")]
    #[schema(value_type = String)]
    pub category: CategoryFilter,

    /// `YYYY-MM-DD`, matched against the UTC date of the start
    #[serde(default)]
    #[param(example = "2026-02-18")]
    pub date: String,

    /// Case-insensitive substring of title, description or address
    #[serde(default, rename = "q")]
    pub query: String,
}

impl EventFilter {
    pub fn matches(&self, event: &EventItem) -> bool {
        self.category.matches(event.category) && self.date_matches(event) && self.query_matches(event)
    }

    /// Visible subset, in input order
    pub fn apply(&self, events: &[EventItem]) -> Vec<EventItem> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }

    /// Blank passes; anything else is compared verbatim, surrounding spaces included
    fn date_matches(&self, event: &EventItem) -> bool {
        self.date.trim().is_empty() || event.start.format("%Y-%m-%d").to_string() == self.date
    }

    fn query_matches(&self, event: &EventItem) -> bool {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&event.title, &event.description, &event.address]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Free-function form of [`EventFilter::apply`]
pub fn filter_events(events: &[EventItem], filter: &EventFilter) -> Vec<EventItem> {
    filter.apply(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn event(title: &str, category: EventCategory, day: u32, hour: u32) -> EventItem {
        EventItem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "Bring a blanket!".to_string(),
            category,
            start: Utc.with_ymd_and_hms(2026, 2, day, hour, 0, 0).unwrap(),
            end: None,
            address: "Riverside Park, Springfield".to_string(),
            price: "Free".to_string(),
            website: String::new(),
            lat: 39.79,
            lng: -89.65,
        }
    }

    fn sample() -> Vec<EventItem> {
        vec![
            event("Farmers' Market", EventCategory::Food, 17, 9),
            event("Live Jazz", EventCategory::Music, 18, 23),
            event("Art Workshop", EventCategory::Family, 20, 16),
        ]
    }

    #[test]
    fn test_empty_criteria_pass_everything() {
        let events = sample();
        assert_eq!(EventFilter::default().apply(&events), events);
    }

    #[test]
    fn test_category_filter() {
        let filter = EventFilter {
            category: CategoryFilter::Only(EventCategory::Music),
            ..Default::default()
        };
        let result = filter.apply(&sample());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Live Jazz");
    }

    #[test]
    fn test_date_uses_utc_calendar_day() {
        let filter = EventFilter {
            date: "2026-02-18".into(),
            ..Default::default()
        };
        let result = filter.apply(&sample());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Live Jazz");

        let filter = EventFilter {
            date: "2026-2-18".into(),
            ..Default::default()
        };
        assert!(filter.apply(&sample()).is_empty());
    }

    #[test]
    fn test_date_is_compared_without_trimming() {
        let padded = EventFilter {
            date: " 2026-02-18 ".into(),
            ..Default::default()
        };
        assert!(padded.apply(&sample()).is_empty());

        let blank = EventFilter {
            date: "   ".into(),
            ..Default::default()
        };
        assert_eq!(blank.apply(&sample()).len(), 3);
    }

    #[test]
    fn test_query_is_trimmed_and_case_insensitive() {
        let filter = EventFilter {
            query: "  WORKSHOP ".into(),
            ..Default::default()
        };
        assert_eq!(filter.apply(&sample()).len(), 1);

        let filter = EventFilter {
            query: "riverside".into(),
            ..Default::default()
        };
        assert_eq!(filter.apply(&sample()).len(), 3);
    }

    #[test]
    fn test_criteria_combine_and_filter_is_idempotent() {
        let filter = EventFilter {
            category: CategoryFilter::Only(EventCategory::Food),
            date: "2026-02-17".into(),
            query: "market".into(),
        };
        let once = filter_events(&sample(), &filter);
        let twice = filter_events(&once, &filter);
        assert_eq!(once.len(), 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_category_filter_parse() {
        assert_eq!("All".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Sports".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(EventCategory::Sports)
        );
        assert!("Theatre".parse::<CategoryFilter>().is_err());
        assert_eq!(CategoryFilter::Only(EventCategory::Arts).to_string(), "Arts");
    }

    #[test]
    fn test_filter_deserializes_from_query_names() {
        let filter: EventFilter =
            serde_json::from_str(r#"{"category":"Food","q":"market"}"#).unwrap();
        assert_eq!(filter.category, CategoryFilter::Only(EventCategory::Food));
        assert_eq!(filter.query, "market");
        assert!(filter.date.is_empty());
    }
}
