use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use super::schema::{
    availability, destinations, favourites, group_invites, group_members, group_trips,
    travel_groups, universities, university_events, users,
};
use crate::api::*;
use crate::db::repository::{RepositoryError, RepositoryResult};

fn parse_enum<T: FromStr<Err = String>>(value: &str) -> RepositoryResult<T> {
    T::from_str(value).map_err(RepositoryError::internal)
}

// ==================== Users ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at is only used for ordering in SQL
pub struct UserRow {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: String,
    pub university_id: Option<i64>,
    pub budget_min: Option<i32>,
    pub budget_max: Option<i32>,
    pub preferred_types: Vec<String>,
    pub preferred_activities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> RepositoryResult<Self> {
        Ok(User {
            user_id: UserId(row.user_id),
            email: row.email,
            name: row.name,
            picture: row.picture,
            role: parse_enum(&row.role)?,
            university_id: row.university_id.map(UniversityId),
            budget_min: row.budget_min,
            budget_max: row.budget_max,
            preferred_types: row.preferred_types,
            preferred_activities: row.preferred_activities,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub struct ProfileChangeset {
    pub name: String,
    pub role: String,
    pub university_id: Option<i64>,
    pub budget_min: Option<i32>,
    pub budget_max: Option<i32>,
    pub preferred_types: Vec<String>,
    pub preferred_activities: Vec<String>,
}

impl From<&ProfileUpdate> for ProfileChangeset {
    fn from(update: &ProfileUpdate) -> Self {
        Self {
            name: update.name.clone(),
            role: update.role.as_str().to_string(),
            university_id: update.university_id.map(|id| id.value()),
            budget_min: update.budget_min,
            budget_max: update.budget_max,
            preferred_types: update.preferred_types.clone(),
            preferred_activities: update.preferred_activities.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = universities)]
pub struct UniversityRow {
    pub university_id: i64,
    pub name: String,
}

impl From<UniversityRow> for University {
    fn from(row: UniversityRow) -> Self {
        University {
            university_id: UniversityId(row.university_id),
            name: row.name,
        }
    }
}

// ==================== Calendar ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = university_events)]
pub struct UniversityEventRow {
    pub event_id: i64,
    pub university_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: String,
    pub label: String,
}

impl From<UniversityEventRow> for UniversityScheduleEvent {
    fn from(row: UniversityEventRow) -> Self {
        UniversityScheduleEvent {
            event_id: UniversityEventId(row.event_id),
            university_id: UniversityId(row.university_id),
            start_date: row.start_date,
            end_date: row.end_date,
            category: row.category,
            label: row.label,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = university_events)]
pub struct NewUniversityEventRow {
    pub university_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: String,
    pub label: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = availability)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct AvailabilityRow {
    pub id: i64,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl From<AvailabilityRow> for AvailabilityEvent {
    fn from(row: AvailabilityRow) -> Self {
        AvailabilityEvent {
            id: AvailabilityId(row.id),
            owner_id: UserId(row.user_id),
            start_date: row.start_date,
            end_date: row.end_date,
            note: AvailabilityStatus::from_note(&row.note),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = availability)]
pub struct NewAvailabilityRow {
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub note: String,
}

// ==================== Catalog ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = destinations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DestinationRow {
    pub dest_id: i64,
    pub name: String,
    pub state: Option<String>,
    pub description: Option<String>,
    pub activities: Option<String>,
    pub kind: Option<String>,
    pub price_min: Option<i32>,
    pub price_max: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub maps_place_id: Option<String>,
    pub images: Option<String>,
}

impl From<DestinationRow> for Destination {
    fn from(row: DestinationRow) -> Self {
        Destination {
            dest_id: DestinationId(row.dest_id),
            name: row.name,
            state: row.state,
            description: row.description,
            activities: row.activities,
            kind: row.kind,
            price_min: row.price_min,
            price_max: row.price_max,
            latitude: row.latitude,
            longitude: row.longitude,
            maps_place_id: row.maps_place_id,
            images: row.images,
        }
    }
}

/// Insert and update payload; `None` clears a column on update.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = destinations)]
#[diesel(treat_none_as_null = true)]
pub struct DestinationChangeset {
    pub name: String,
    pub state: Option<String>,
    pub description: Option<String>,
    pub activities: Option<String>,
    pub kind: Option<String>,
    pub price_min: Option<i32>,
    pub price_max: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub maps_place_id: Option<String>,
    pub images: Option<String>,
}

impl From<&DestinationInput> for DestinationChangeset {
    fn from(input: &DestinationInput) -> Self {
        // Reuse the domain cleaning rules; the placeholder id is discarded.
        let d = input.clone().into_destination(DestinationId(0));
        Self {
            name: d.name,
            state: d.state,
            description: d.description,
            activities: d.activities,
            kind: d.kind,
            price_min: d.price_min,
            price_max: d.price_max,
            latitude: d.latitude,
            longitude: d.longitude,
            maps_place_id: d.maps_place_id,
            images: d.images,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = favourites)]
pub struct NewFavouriteRow {
    pub user_id: i64,
    pub dest_id: i64,
}

// ==================== Groups ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = travel_groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GroupRow {
    pub group_id: i64,
    pub group_name: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            group_id: GroupId(row.group_id),
            group_name: row.group_name,
            created_by: UserId(row.created_by),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = travel_groups)]
pub struct NewGroupRow {
    pub group_name: String,
    pub created_by: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = group_members)]
pub struct NewMemberRow {
    pub group_id: i64,
    pub user_id: i64,
    pub role: String,
}

pub fn parse_group_role(value: &str) -> RepositoryResult<GroupRole> {
    parse_enum(value)
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = group_invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct InviteRow {
    pub invite_id: i64,
    pub group_id: i64,
    pub email: String,
    pub token: String,
    pub status: String,
    pub invited_by: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<InviteRow> for Invite {
    type Error = RepositoryError;

    fn try_from(row: InviteRow) -> RepositoryResult<Self> {
        Ok(Invite {
            invite_id: InviteId(row.invite_id),
            group_id: GroupId(row.group_id),
            email: row.email,
            token: row.token,
            status: parse_enum(&row.status)?,
            invited_by: UserId(row.invited_by),
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = group_invites)]
pub struct NewInviteRow {
    pub group_id: i64,
    pub email: String,
    pub token: String,
    pub status: String,
    pub invited_by: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = group_trips)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TripRow {
    pub trip_ref_id: i64,
    pub group_id: i64,
    pub dest_id: i64,
    pub shared_by: i64,
    pub shared_at: DateTime<Utc>,
}

impl From<TripRow> for SharedTrip {
    fn from(row: TripRow) -> Self {
        SharedTrip {
            trip_ref_id: TripRefId(row.trip_ref_id),
            group_id: GroupId(row.group_id),
            dest_id: DestinationId(row.dest_id),
            shared_by: UserId(row.shared_by),
            shared_at: row.shared_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = group_trips)]
pub struct NewTripRow {
    pub group_id: i64,
    pub dest_id: i64,
    pub shared_by: i64,
}
