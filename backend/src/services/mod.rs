//! Service layer for domain logic that does not touch storage.
//!
//! These modules are pure computations (best-date aggregation, calendar feed
//! rendering, destination ranking) plus the invitation mail seam. Storage-aware
//! orchestration lives in [`crate::db::services`].

pub mod availability;
pub mod calendar;
pub mod invites;
pub mod recommend;

#[cfg(test)]
#[path = "availability_tests.rs"]
mod availability_tests;

pub use availability::{best_dates, best_dates_for_events, AvailabilityError, Recommendation};
pub use calendar::{group_feed, personal_feed, CalendarEntry};
pub use invites::{InviteMailer, InviteMessage, LogMailer};
pub use recommend::{rank_destinations, GroupProfile, ScoredDestination};
