//! Personal availability blocks and university schedules.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::api::{AvailabilityId, UniversityEventId, UniversityId, UserId};

/// Label attached to an availability block.
///
/// Only the exact label `"Busy"` blocks a day; every other label, including
/// free text, counts as available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AvailabilityStatus {
    #[default]
    Available,
    Busy,
    Other(String),
}

impl AvailabilityStatus {
    pub const AVAILABLE: &'static str = "Available";
    pub const BUSY: &'static str = "Busy";

    /// Map a stored note to a status. Blank notes mean available.
    pub fn from_note(note: &str) -> Self {
        match note.trim() {
            "" | Self::AVAILABLE => Self::Available,
            Self::BUSY => Self::Busy,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => Self::AVAILABLE,
            Self::Busy => Self::BUSY,
            Self::Other(label) => label,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AvailabilityStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AvailabilityStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let note = String::deserialize(deserializer)?;
        Ok(Self::from_note(&note))
    }
}

/// A stored availability block covering `[start_date, end_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEvent {
    pub id: AvailabilityId,
    pub owner_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub note: AvailabilityStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAvailability {
    pub owner_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub note: AvailabilityStatus,
}

/// Fixed institutional calendar entry (exam, break, holiday, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityScheduleEvent {
    pub event_id: UniversityEventId,
    pub university_id: UniversityId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUniversityEvent {
    pub university_id: UniversityId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: String,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_note() {
        assert_eq!(AvailabilityStatus::from_note("Busy"), AvailabilityStatus::Busy);
        assert_eq!(
            AvailabilityStatus::from_note("Available"),
            AvailabilityStatus::Available
        );
        assert_eq!(AvailabilityStatus::from_note(""), AvailabilityStatus::Available);
        // Case matters: only the exact label blocks a day.
        assert_eq!(
            AvailabilityStatus::from_note("busy"),
            AvailabilityStatus::Other("busy".to_string())
        );
    }

    #[test]
    fn test_status_serde_as_plain_string() {
        let json = serde_json::to_string(&AvailabilityStatus::Busy).unwrap();
        assert_eq!(json, "\"Busy\"");
        let other: AvailabilityStatus = serde_json::from_str("\"Maybe\"").unwrap();
        assert_eq!(other.as_str(), "Maybe");
        assert!(!other.is_busy());
    }
}
