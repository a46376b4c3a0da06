//! Public API surface for the backend.
//!
//! Identifier newtypes live here; the domain types they key are re-exported
//! from [`crate::models`] so callers can import everything from one place.

pub use crate::models::{
    Actor, AvailabilityEvent, AvailabilityStatus, Destination, DestinationInput,
    DestinationListing, DestinationPage, DestinationQuery, Group, GroupDetail, GroupRole,
    GroupSummary, Invite, InviteStatus, Member, NewAvailability, NewUniversityEvent, NewUser,
    ProfileUpdate, SharedTrip, TripSummary, University, UniversityScheduleEvent, User, UserRole,
    VoteAction,
};

use crate::define_id_type;

define_id_type!(i64, UserId);
define_id_type!(i64, UniversityId);
define_id_type!(i64, UniversityEventId);
define_id_type!(i64, DestinationId);
define_id_type!(i64, GroupId);
define_id_type!(i64, InviteId);
define_id_type!(i64, TripRefId);
define_id_type!(i64, AvailabilityId);
