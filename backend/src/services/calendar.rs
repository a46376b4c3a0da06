//! Calendar feed construction.
//!
//! Turns stored availability blocks and university schedules into the event
//! objects the calendar widget renders. Everything here is a pure function of
//! its input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::UserId;
use crate::models::{AvailabilityEvent, Member, UniversityScheduleEvent};
use crate::services::availability::{EventRecord, ExtendedProps as RecordProps};

pub const COLOR_RED: &str = "#ef4444";
pub const COLOR_GREEN: &str = "#22c55e";
pub const COLOR_ORANGE: &str = "#f59e0b";
pub const COLOR_BLUE: &str = "#3b82f6";

/// Source of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Availability,
    University,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryProps {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// One event in the calendar feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    pub display: String,
    pub background_color: String,
    pub all_day: bool,
    pub editable: bool,
    pub extended_props: EntryProps,
}

impl CalendarEntry {
    /// The entry as aggregator input.
    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            start: self.start.format("%Y-%m-%d").to_string(),
            end: self.end.format("%Y-%m-%d").to_string(),
            extended_props: RecordProps {
                note: self.extended_props.note.clone(),
            },
        }
    }
}

/// Background colour for a university schedule category. Keywords are
/// matched anywhere in the category, checked in order exam, break, holiday.
pub fn category_color(category: &str) -> &'static str {
    let category = category.to_lowercase();
    if category.contains("exam") {
        COLOR_RED
    } else if category.contains("break") {
        COLOR_GREEN
    } else if category.contains("holiday") {
        COLOR_ORANGE
    } else {
        COLOR_BLUE
    }
}

/// Feed entry for one availability block. `owner_name` prefixes the title
/// when the feed mixes several people.
pub fn availability_entry(event: &AvailabilityEvent, owner_name: Option<&str>) -> CalendarEntry {
    let note = event.note.as_str().to_string();
    let title = match owner_name {
        Some(name) => format!("{}: {}", name, note),
        None => note.clone(),
    };
    let color = if event.note.is_busy() {
        COLOR_RED
    } else {
        COLOR_GREEN
    };

    CalendarEntry {
        id: event.id.to_string(),
        title,
        start: event.start_date,
        end: event.end_date,
        display: "background".to_string(),
        background_color: color.to_string(),
        all_day: true,
        editable: owner_name.is_none(),
        extended_props: EntryProps {
            kind: EntryKind::Availability,
            note: Some(note),
            owner_id: Some(event.owner_id),
            category: None,
        },
    }
}

pub fn university_entry(index: usize, event: &UniversityScheduleEvent) -> CalendarEntry {
    CalendarEntry {
        id: format!("uni-{}", index),
        title: format!("{}: {}", event.category, event.label),
        start: event.start_date,
        end: event.end_date,
        display: "background".to_string(),
        background_color: category_color(&event.category).to_string(),
        all_day: true,
        editable: false,
        extended_props: EntryProps {
            kind: EntryKind::University,
            note: None,
            owner_id: None,
            category: Some(event.category.clone()),
        },
    }
}

/// A user's own calendar: their blocks first, then their university schedule.
pub fn personal_feed(
    blocks: &[AvailabilityEvent],
    university: &[UniversityScheduleEvent],
) -> Vec<CalendarEntry> {
    blocks
        .iter()
        .map(|event| availability_entry(event, None))
        .chain(
            university
                .iter()
                .enumerate()
                .map(|(index, event)| university_entry(index, event)),
        )
        .collect()
}

/// A group's calendar: every member's blocks, titled with the member's name.
pub fn group_feed(members: &[Member], blocks: &[AvailabilityEvent]) -> Vec<CalendarEntry> {
    blocks
        .iter()
        .map(|event| {
            let name = members
                .iter()
                .find(|m| m.user_id == event.owner_id)
                .map(|m| m.name.as_str())
                .unwrap_or("Member");
            availability_entry(event, Some(name))
        })
        .collect()
}
