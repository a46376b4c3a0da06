use chrono::NaiveDate;
use proptest::prelude::*;

use crate::api::{AvailabilityId, UserId};
use crate::models::{AvailabilityEvent, AvailabilityStatus};
use crate::services::availability::*;

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn available(start: &str, end: &str) -> EventRecord {
    EventRecord::new(start, end, Some("Available"))
}

fn busy(start: &str, end: &str) -> EventRecord {
    EventRecord::new(start, end, Some("Busy"))
}

#[test]
fn test_overlapping_events_pick_busiest_day() {
    let events = vec![
        available("2024-01-01", "2024-01-03"),
        available("2024-01-02", "2024-01-04"),
        available("2024-01-02", "2024-01-03"),
    ];
    let spans = parse_records(&events).unwrap();
    let tally = DateTally::from_spans(&spans);
    assert_eq!(tally.count(day("2024-01-01")), 1);
    assert_eq!(tally.count(day("2024-01-02")), 3);
    assert_eq!(tally.count(day("2024-01-03")), 2);
    assert_eq!(tally.count(day("2024-01-04")), 0);

    let rec = best_dates(&events).unwrap();
    assert_eq!(rec.best_day_count, 3);
    assert_eq!(rec.best_days, vec![day("2024-01-02")]);
}

#[test]
fn test_busy_event_is_ignored() {
    let events = vec![
        busy("2024-01-01", "2024-01-02"),
        available("2024-01-01", "2024-01-02"),
    ];
    let rec = best_dates(&events).unwrap();
    assert!(!rec.has_recommendation());
    assert_eq!(rec.best_day_count, 1);
    assert!(rec.best_days.is_empty());
}

#[test]
fn test_two_identical_events() {
    let events = vec![
        available("2024-01-05", "2024-01-06"),
        available("2024-01-05", "2024-01-06"),
    ];
    let rec = best_dates(&events).unwrap();
    assert_eq!(rec.best_day_count, 2);
    assert_eq!(rec.best_days, vec![day("2024-01-05")]);
}

#[test]
fn test_empty_input_has_no_recommendation() {
    let rec = best_dates(&[]).unwrap();
    assert_eq!(rec, Recommendation::none(0));
}

#[test]
fn test_only_busy_events() {
    let events = vec![
        busy("2024-02-01", "2024-02-05"),
        busy("2024-02-01", "2024-02-05"),
        busy("2024-02-02", "2024-02-03"),
    ];
    let rec = best_dates(&events).unwrap();
    assert!(!rec.has_recommendation());
    assert_eq!(rec.best_day_count, 0);
}

#[test]
fn test_end_date_is_exclusive() {
    let spans = parse_records(&[available("2024-01-01", "2024-01-02")]).unwrap();
    let tally = DateTally::from_spans(&spans);
    let days: Vec<_> = tally.iter().collect();
    assert_eq!(days, vec![(day("2024-01-01"), 1)]);
}

#[test]
fn test_non_overlapping_events_never_recommend() {
    let events = vec![
        available("2024-03-01", "2024-03-02"),
        available("2024-03-03", "2024-03-05"),
        available("2024-03-10", "2024-03-11"),
    ];
    let rec = best_dates(&events).unwrap();
    assert!(!rec.has_recommendation());
    assert_eq!(rec.best_day_count, 1);
}

#[test]
fn test_ties_are_all_reported_in_order() {
    let events = vec![
        available("2024-05-03", "2024-05-05"),
        available("2024-05-01", "2024-05-02"),
        available("2024-05-03", "2024-05-05"),
        available("2024-05-01", "2024-05-02"),
    ];
    let rec = best_dates(&events).unwrap();
    assert_eq!(rec.best_day_count, 2);
    assert_eq!(
        rec.best_days,
        vec![day("2024-05-01"), day("2024-05-03"), day("2024-05-04")]
    );
}

#[test]
fn test_spans_crossing_month_and_leap_day() {
    let events = vec![
        available("2024-02-28", "2024-03-02"),
        available("2024-02-29", "2024-03-01"),
    ];
    let rec = best_dates(&events).unwrap();
    assert_eq!(rec.best_days, vec![day("2024-02-29")]);
}

#[test]
fn test_other_labels_and_missing_note_count_as_available() {
    let events = vec![
        EventRecord::new("2024-06-01", "2024-06-02", Some("Free after 5pm")),
        EventRecord::new("2024-06-01", "2024-06-02", None),
        EventRecord::new("2024-06-01", "2024-06-02", Some("busy")),
    ];
    let rec = best_dates(&events).unwrap();
    assert_eq!(rec.best_day_count, 3);
}

#[test]
fn test_time_suffix_is_ignored() {
    let events = vec![
        available("2024-01-01T23:30:00Z", "2024-01-02T00:00:00+07:00"),
        available("2024-01-01", "2024-01-02"),
    ];
    let rec = best_dates(&events).unwrap();
    assert_eq!(rec.best_days, vec![day("2024-01-01")]);
}

#[test]
fn test_inverted_span_contributes_nothing() {
    let events = vec![
        available("2024-01-05", "2024-01-05"),
        available("2024-01-07", "2024-01-04"),
    ];
    let rec = best_dates(&events).unwrap();
    assert_eq!(rec, Recommendation::none(0));
}

#[test]
fn test_malformed_date_names_the_record() {
    let events = vec![
        available("2024-01-01", "2024-01-02"),
        available("2024-13-01", "2024-01-02"),
    ];
    let err = best_dates(&events).unwrap_err();
    assert_eq!(
        err,
        AvailabilityError::InvalidDate {
            index: 1,
            field: "start",
            value: "2024-13-01".to_string(),
        }
    );
    assert!(err.to_string().contains("event 1"));

    let err = best_dates(&[available("2024-01-01", "soon")]).unwrap_err();
    assert!(matches!(
        err,
        AvailabilityError::InvalidDate { index: 0, field: "end", .. }
    ));
}

#[test]
fn test_span_longer_than_limit_is_rejected() {
    let events = vec![
        available("2024-01-01", "2024-12-31"),
        available("0001-01-01", "9999-12-31"),
    ];
    let err = best_dates(&events).unwrap_err();
    assert!(matches!(
        err,
        AvailabilityError::SpanTooLong { index: 1, limit: MAX_SPAN_DAYS, .. }
    ));

    // Exactly one leap year is still accepted.
    let rec = best_dates(&[
        available("2024-01-01", "2025-01-01"),
        available("2024-06-01", "2024-06-02"),
    ])
    .unwrap();
    assert_eq!(rec.best_days, vec![day("2024-06-01")]);
}

#[test]
fn test_total_day_cells_are_capped() {
    let per_record = MAX_SPAN_DAYS;
    let n = (MAX_DAY_CELLS / per_record + 1) as usize;
    let events: Vec<EventRecord> = (0..n)
        .map(|_| available("2024-01-01", "2025-01-01"))
        .collect();
    let err = best_dates(&events).unwrap_err();
    assert!(matches!(err, AvailabilityError::TooManyDays { limit: MAX_DAY_CELLS, .. }));

    // Busy spans are dropped before expansion and cost nothing.
    let mut mixed: Vec<EventRecord> = (0..n).map(|_| busy("2024-01-01", "2025-01-01")).collect();
    mixed.push(available("2024-02-01", "2024-02-02"));
    mixed.push(available("2024-02-01", "2024-02-02"));
    assert_eq!(best_dates(&mixed).unwrap().best_days, vec![day("2024-02-01")]);
}

#[test]
fn test_stored_span_expansion_is_bounded() {
    let span = DaySpan {
        start: day("0001-01-01"),
        end: day("9999-12-31"),
        busy: false,
    };
    assert_eq!(span.days().count(), MAX_SPAN_DAYS as usize);
    assert!(span.len_days() > MAX_SPAN_DAYS);
}

#[test]
fn test_stored_events_use_same_rules() {
    let event = |id: i64, owner: i64, note: AvailabilityStatus| AvailabilityEvent {
        id: AvailabilityId(id),
        owner_id: UserId(owner),
        start_date: day("2024-07-10"),
        end_date: day("2024-07-12"),
        note,
    };
    let events = vec![
        event(1, 1, AvailabilityStatus::Available),
        event(2, 2, AvailabilityStatus::Available),
        event(3, 3, AvailabilityStatus::Busy),
    ];
    let rec = best_dates_for_events(&events);
    assert_eq!(rec.best_day_count, 2);
    assert_eq!(rec.best_days, vec![day("2024-07-10"), day("2024-07-11")]);
}

#[test]
fn test_recommendation_json_shape() {
    let rec = Recommendation {
        best_day_count: 3,
        best_days: vec![day("2024-01-02")],
    };
    let json = serde_json::to_value(&rec).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "bestDayCount": 3, "bestDays": ["2024-01-02"] })
    );
}

#[test]
fn test_record_deserializes_from_feed_json() {
    let records: Vec<EventRecord> = serde_json::from_value(serde_json::json!([
        { "start": "2024-01-01", "end": "2024-01-02", "extendedProps": { "note": "Busy" } },
        { "start": "2024-01-01", "end": "2024-01-02" }
    ]))
    .unwrap();
    let spans = parse_records(&records).unwrap();
    assert!(spans[0].busy);
    assert!(!spans[1].busy);
}

#[test]
fn test_summary_truncates_day_list() {
    let rec = Recommendation {
        best_day_count: 4,
        best_days: vec![
            day("2024-01-02"),
            day("2024-01-03"),
            day("2024-01-04"),
            day("2024-01-05"),
        ],
    };
    assert_eq!(
        rec.summary(3).unwrap(),
        "4 members are available on these dates: 2024-01-02, 2024-01-03, 2024-01-04..."
    );
    assert_eq!(Recommendation::none(1).summary(3), None);
}

fn span_strategy() -> impl Strategy<Value = (u32, u32, bool)> {
    (0u32..60, 0u32..10, proptest::bool::weighted(0.2))
}

fn record_from((offset, len, is_busy): (u32, u32, bool)) -> EventRecord {
    let base = day("2024-01-01");
    let start = base + chrono::Duration::days(offset as i64);
    let end = start + chrono::Duration::days(len as i64);
    EventRecord::new(
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
        Some(if is_busy { "Busy" } else { "Available" }),
    )
}

proptest! {
    #[test]
    fn prop_aggregation_is_idempotent(spans in prop::collection::vec(span_strategy(), 0..20)) {
        let records: Vec<EventRecord> = spans.into_iter().map(record_from).collect();
        let first = best_dates(&records).unwrap();
        let second = best_dates(&records).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_busy_events_never_change_result(
        spans in prop::collection::vec(span_strategy(), 0..20),
        extra in prop::collection::vec((0u32..60, 1u32..10), 0..10),
    ) {
        let records: Vec<EventRecord> = spans.into_iter().map(record_from).collect();
        let mut with_busy = records.clone();
        with_busy.extend(extra.into_iter().map(|(o, l)| record_from((o, l, true))));
        prop_assert_eq!(best_dates(&records).unwrap(), best_dates(&with_busy).unwrap());
    }

    #[test]
    fn prop_n_identical_days_count_n(n in 1usize..12, offset in 0u32..300) {
        let records: Vec<EventRecord> = (0..n).map(|_| record_from((offset, 1, false))).collect();
        let rec = best_dates(&records).unwrap();
        prop_assert_eq!(rec.best_day_count as usize, n);
        if n >= 2 {
            prop_assert_eq!(rec.best_days.len(), 1);
        } else {
            prop_assert!(rec.best_days.is_empty());
        }
    }

    #[test]
    fn prop_best_days_sorted_and_at_max(spans in prop::collection::vec(span_strategy(), 0..20)) {
        let records: Vec<EventRecord> = spans.into_iter().map(record_from).collect();
        let parsed = parse_records(&records).unwrap();
        let tally = DateTally::from_spans(&parsed);
        let rec = tally.recommend();
        prop_assert!(rec.best_days.windows(2).all(|w| w[0] < w[1]));
        for d in &rec.best_days {
            prop_assert_eq!(tally.count(*d), rec.best_day_count);
        }
        prop_assert_eq!(rec.best_day_count, tally.max_count());
    }
}
