//! Destination catalog types and the listing filter.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::api::DestinationId;

/// Number of destinations per catalog page.
pub const PAGE_SIZE: u32 = 15;

/// A travel destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub dest_id: DestinationId,
    pub name: String,
    pub state: Option<String>,
    pub description: Option<String>,
    pub activities: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub price_min: Option<i32>,
    pub price_max: Option<i32>,
    pub latitude: Option<f64>,
    #[serde(alias = "longtitude")]
    pub longitude: Option<f64>,
    pub maps_place_id: Option<String>,
    pub images: Option<String>,
}

impl Destination {
    /// True when the entry is missing any of the fields the catalog page needs.
    pub fn is_incomplete(&self) -> bool {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map(str::trim).unwrap_or("").is_empty()
        }
        blank(&self.description) || blank(&self.images) || blank(&self.kind)
    }
}

/// Create-or-update payload for a destination.
///
/// Every spelling of the identifier the web client has used (`dest_id`,
/// `destinationId`, `destination_id`, `id`) lands in `dest_id`. Numeric fields
/// accept numbers, numeric strings, or empty strings (treated as unset).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationInput {
    #[serde(
        default,
        alias = "destinationId",
        alias = "destination_id",
        alias = "id",
        deserialize_with = "lenient"
    )]
    pub dest_id: Option<DestinationId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub activities: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub price_min: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub price_max: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "longtitude", deserialize_with = "lenient")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub maps_place_id: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub images: Option<String>,
}

impl DestinationInput {
    /// Build the stored record for `dest_id`, trimming empty strings to `None`.
    pub fn into_destination(self, dest_id: DestinationId) -> Destination {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Destination {
            dest_id,
            name: self.name.trim().to_string(),
            state: clean(self.state),
            description: clean(self.description),
            activities: clean(self.activities),
            kind: clean(self.kind),
            price_min: self.price_min,
            price_max: self.price_max,
            latitude: self.latitude,
            longitude: self.longitude,
            maps_place_id: clean(self.maps_place_id),
            images: clean(self.images),
        }
    }
}

/// Accepts a number, a numeric string, an empty string or null.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid number: {}", s))),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

/// Filter and pagination for the catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationQuery {
    /// 1-based page number.
    pub page: u32,
    pub search: Option<String>,
    pub kind: Option<String>,
    pub max_price: Option<i32>,
    pub incomplete: bool,
}

impl Default for DestinationQuery {
    fn default() -> Self {
        Self {
            page: 1,
            search: None,
            kind: None,
            max_price: None,
            incomplete: false,
        }
    }
}

impl DestinationQuery {
    /// Search text with surrounding whitespace removed, if any remains.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn kind_filter(&self) -> Option<&str> {
        self.kind.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Whether `dest` passes every active filter.
    ///
    /// Search is a case-insensitive substring match on name, state, or the
    /// decimal form of the id. A destination without `price_min` never passes
    /// a price filter.
    pub fn matches(&self, dest: &Destination) -> bool {
        if let Some(term) = self.search_term() {
            let needle = term.to_lowercase();
            let hit = dest.name.to_lowercase().contains(&needle)
                || dest
                    .state
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
                || dest.dest_id.to_string().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(kind) = self.kind_filter() {
            if dest.kind.as_deref() != Some(kind) {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            match dest.price_min {
                Some(min) if min <= max => {}
                _ => return false,
            }
        }

        if self.incomplete && !dest.is_incomplete() {
            return false;
        }

        true
    }

    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Rows to skip. Widened so any requested page is representable.
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(PAGE_SIZE)
    }

    pub fn total_pages(total: u64) -> u32 {
        total.div_ceil(PAGE_SIZE as u64) as u32
    }
}

/// A catalog row annotated with the viewer's favourite flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationListing {
    #[serde(flatten)]
    pub destination: Destination,
    pub is_liked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationPage {
    pub data: Vec<DestinationListing>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dest(id: i64, name: &str, state: Option<&str>) -> Destination {
        Destination {
            dest_id: DestinationId(id),
            name: name.to_string(),
            state: state.map(str::to_string),
            description: Some("Quiet beach".to_string()),
            activities: None,
            kind: Some("beach".to_string()),
            price_min: Some(1200),
            price_max: Some(3000),
            latitude: None,
            longitude: None,
            maps_place_id: None,
            images: Some("https://img.example/1.jpg".to_string()),
        }
    }

    #[test]
    fn test_input_accepts_every_id_spelling() {
        for key in ["dest_id", "destinationId", "destination_id", "id"] {
            let input: DestinationInput =
                serde_json::from_value(json!({ key: 7, "name": "Krabi" })).unwrap();
            assert_eq!(input.dest_id, Some(DestinationId(7)), "key {}", key);
        }
    }

    #[test]
    fn test_input_lenient_numbers_and_legacy_longitude() {
        let input: DestinationInput = serde_json::from_value(json!({
            "dest_id": "12",
            "name": "Pai",
            "price_min": "",
            "price_max": "4500",
            "latitude": 19.35,
            "longtitude": "98.44"
        }))
        .unwrap();
        assert_eq!(input.dest_id, Some(DestinationId(12)));
        assert_eq!(input.price_min, None);
        assert_eq!(input.price_max, Some(4500));
        assert_eq!(input.longitude, Some(98.44));
    }

    #[test]
    fn test_input_rejects_non_numeric_price() {
        let result: Result<DestinationInput, _> =
            serde_json::from_value(json!({ "name": "Pai", "price_min": "cheap" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_query_search_matches_name_state_and_id() {
        let d = dest(42, "Railay Beach", Some("Krabi"));
        let by = |s: &str| DestinationQuery {
            search: Some(s.to_string()),
            ..Default::default()
        };
        assert!(by("railay").matches(&d));
        assert!(by("KRABI").matches(&d));
        assert!(by("42").matches(&d));
        assert!(!by("chiang").matches(&d));
        assert!(by("   ").matches(&d));
    }

    #[test]
    fn test_query_price_and_incomplete_filters() {
        let mut d = dest(1, "Koh Tao", None);
        let cheap = DestinationQuery {
            max_price: Some(1000),
            ..Default::default()
        };
        assert!(!cheap.matches(&d));

        let incomplete = DestinationQuery {
            incomplete: true,
            ..Default::default()
        };
        assert!(!incomplete.matches(&d));
        d.images = Some("  ".to_string());
        assert!(incomplete.matches(&d));
    }

    #[test]
    fn test_paging_math() {
        assert_eq!(DestinationQuery::total_pages(0), 0);
        assert_eq!(DestinationQuery::total_pages(15), 1);
        assert_eq!(DestinationQuery::total_pages(16), 2);
        let q = DestinationQuery {
            page: 0,
            ..Default::default()
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.offset(), 0);
        let q3 = DestinationQuery {
            page: 3,
            ..Default::default()
        };
        assert_eq!(q3.offset(), 30);
    }

    #[test]
    fn test_huge_page_offset_does_not_overflow() {
        let q = DestinationQuery {
            page: u32::MAX,
            ..Default::default()
        };
        assert_eq!(q.offset(), (u32::MAX as u64 - 1) * PAGE_SIZE as u64);
        let q = DestinationQuery {
            page: 300_000_000,
            ..Default::default()
        };
        assert_eq!(q.offset(), 4_499_999_985);
    }

    #[test]
    fn test_listing_flattens_destination() {
        let listing = DestinationListing {
            destination: dest(3, "Ayutthaya", None),
            is_liked: true,
        };
        let v = serde_json::to_value(&listing).unwrap();
        assert_eq!(v["dest_id"], 3);
        assert_eq!(v["type"], "beach");
        assert_eq!(v["is_liked"], true);
    }
}
