//! Best-date aggregation over group availability.
//!
//! Each event covers the calendar days in `[start, end)`. Events labelled
//! `"Busy"` are dropped; every other event adds one to each day it covers.
//! The days sharing the highest count form the recommendation, provided that
//! count is at least two (a single free member is not a group window).
//!
//! Days are [`NaiveDate`]s, so enumeration never depends on a timezone.
//!
//! Expansion is bounded: a single span covers at most [`MAX_SPAN_DAYS`]
//! days and one request expands at most [`MAX_DAY_CELLS`] day-cells.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{AvailabilityEvent, AvailabilityStatus};

/// Smallest tally that yields a recommendation.
pub const MIN_RECOMMENDED_COUNT: u32 = 2;

/// Longest span, in days, accepted as aggregator input or stored.
pub const MAX_SPAN_DAYS: i64 = 366;

/// Total day-cells one call to [`best_dates`] may expand.
pub const MAX_DAY_CELLS: i64 = 20_000;

/// Errors raised while reading aggregator input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("event {index}: invalid {field} date '{value}'")]
    InvalidDate {
        /// Position of the offending record in the input.
        index: usize,
        /// `"start"` or `"end"`.
        field: &'static str,
        value: String,
    },
    #[error("event {index}: span of {days} days exceeds the {limit}-day limit")]
    SpanTooLong { index: usize, days: i64, limit: i64 },
    #[error("input covers {cells} day-cells, more than the {limit} allowed")]
    TooManyDays { cells: i64, limit: i64 },
}

/// Calendar event as delivered by the calendar feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub start: String,
    pub end: String,
    #[serde(rename = "extendedProps", default)]
    pub extended_props: ExtendedProps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedProps {
    #[serde(default)]
    pub note: Option<String>,
}

impl EventRecord {
    pub fn new(start: impl Into<String>, end: impl Into<String>, note: Option<&str>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            extended_props: ExtendedProps {
                note: note.map(str::to_string),
            },
        }
    }
}

/// A parsed, half-open run of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySpan {
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    pub busy: bool,
}

impl DaySpan {
    /// Number of days covered. Zero when `end <= start`.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }

    /// Days covered by the span, at most [`MAX_SPAN_DAYS`] of them.
    /// Empty when `end <= start`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start
            .iter_days()
            .take_while(move |day| *day < end)
            .take(MAX_SPAN_DAYS as usize)
    }
}

impl From<&AvailabilityEvent> for DaySpan {
    fn from(event: &AvailabilityEvent) -> Self {
        Self {
            start: event.start_date,
            end: event.end_date,
            busy: event.note.is_busy(),
        }
    }
}

/// Parse an ISO date, ignoring any time-of-day suffix (`2024-01-01T10:00:00Z`).
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let date = value.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Parse feed records into spans, failing on the first malformed date.
pub fn parse_records(records: &[EventRecord]) -> Result<Vec<DaySpan>, AvailabilityError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let start = parse_day(&record.start).ok_or_else(|| AvailabilityError::InvalidDate {
                index,
                field: "start",
                value: record.start.clone(),
            })?;
            let end = parse_day(&record.end).ok_or_else(|| AvailabilityError::InvalidDate {
                index,
                field: "end",
                value: record.end.clone(),
            })?;
            let busy = record
                .extended_props
                .note
                .as_deref()
                .map(AvailabilityStatus::from_note)
                .is_some_and(|status| status.is_busy());
            let span = DaySpan { start, end, busy };
            let days = span.len_days();
            if days > MAX_SPAN_DAYS {
                return Err(AvailabilityError::SpanTooLong {
                    index,
                    days,
                    limit: MAX_SPAN_DAYS,
                });
            }
            Ok(span)
        })
        .collect()
}

/// Per-day count of free members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateTally {
    counts: BTreeMap<NaiveDate, u32>,
}

impl DateTally {
    pub fn from_spans<'a>(spans: impl IntoIterator<Item = &'a DaySpan>) -> Self {
        let mut tally = Self::default();
        for span in spans {
            tally.add(span);
        }
        tally
    }

    /// Count every day of a non-busy span.
    pub fn add(&mut self, span: &DaySpan) {
        if span.busy {
            return;
        }
        for day in span.days() {
            *self.counts.entry(day).or_insert(0) += 1;
        }
    }

    pub fn count(&self, day: NaiveDate) -> u32 {
        self.counts.get(&day).copied().unwrap_or(0)
    }

    pub fn max_count(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.counts.iter().map(|(day, count)| (*day, *count))
    }

    /// Highest count and every day reaching it, ascending.
    pub fn recommend(&self) -> Recommendation {
        let best_day_count = self.max_count();
        if best_day_count < MIN_RECOMMENDED_COUNT {
            return Recommendation::none(best_day_count);
        }
        let best_days = self
            .iter()
            .filter(|(_, count)| *count == best_day_count)
            .map(|(day, _)| day)
            .collect();
        Recommendation {
            best_day_count,
            best_days,
        }
    }
}

/// Best travel window for a group.
///
/// An empty `best_days` means there is no recommendation; `best_day_count`
/// still reports the highest tally seen (0 or 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub best_day_count: u32,
    pub best_days: Vec<NaiveDate>,
}

impl Recommendation {
    pub fn none(best_day_count: u32) -> Self {
        Self {
            best_day_count,
            best_days: Vec::new(),
        }
    }

    pub fn has_recommendation(&self) -> bool {
        !self.best_days.is_empty()
    }

    /// One-line description for the calendar view, listing at most `limit` days.
    /// The count reported is the block tally, so overlapping blocks from one
    /// member inflate it.
    pub fn summary(&self, limit: usize) -> Option<String> {
        if !self.has_recommendation() {
            return None;
        }
        let shown: Vec<String> = self
            .best_days
            .iter()
            .take(limit)
            .map(|day| day.format("%Y-%m-%d").to_string())
            .collect();
        let more = if self.best_days.len() > limit { "..." } else { "" };
        Some(format!(
            "{} members are available on these dates: {}{}",
            self.best_day_count,
            shown.join(", "),
            more
        ))
    }
}

/// Best dates for raw feed records.
///
/// Busy spans are not expanded and do not count against [`MAX_DAY_CELLS`].
pub fn best_dates(records: &[EventRecord]) -> Result<Recommendation, AvailabilityError> {
    let spans = parse_records(records)?;
    let cells: i64 = spans
        .iter()
        .filter(|span| !span.busy)
        .map(DaySpan::len_days)
        .sum();
    if cells > MAX_DAY_CELLS {
        return Err(AvailabilityError::TooManyDays {
            cells,
            limit: MAX_DAY_CELLS,
        });
    }
    Ok(DateTally::from_spans(&spans).recommend())
}

/// Best dates for stored availability blocks.
pub fn best_dates_for_events(events: &[AvailabilityEvent]) -> Recommendation {
    let spans: Vec<DaySpan> = events.iter().map(DaySpan::from).collect();
    DateTally::from_spans(&spans).recommend()
}
