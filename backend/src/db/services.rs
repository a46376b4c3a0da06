//! High-level service layer.
//!
//! Repository-agnostic operations behind every API endpoint. These functions
//! own the business rules (permissions, validation, defaults) so that they
//! hold the same way for every storage backend.
//!
//! Every function is generic over [`FullRepository`] and accepts trait
//! objects (`&dyn FullRepository`) as well as concrete repositories.
//!
//! # Usage
//!
//! ```no_run
//! use aroov::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let user = services::ensure_user(&repo, "nok@example.com", "Nok", None).await?;
//!     let groups = services::list_groups(&repo, user.user_id).await?;
//!     println!("{} is in {} groups", user.name, groups.len());
//!     Ok(())
//! }
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::api::*;
use crate::services::availability::{
    best_dates_for_events, parse_day, Recommendation, MAX_SPAN_DAYS,
};
use crate::services::calendar::{group_feed, personal_feed, CalendarEntry};
use crate::services::invites::{compose_invite, new_invite_token, InviteMailer};
use crate::services::recommend::{rank_destinations, GroupProfile, ScoredDestination, DEFAULT_LIMIT};

/// How many destinations the "random picks" endpoint returns.
pub const RANDOM_PICKS: usize = 10;

// ==================== Health ====================

/// Check if the database connection is healthy.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Permission helpers ====================

/// Role of `user_id` in the group, or `PermissionDenied` for outsiders.
pub async fn require_member<R: FullRepository + ?Sized>(
    repo: &R,
    group_id: GroupId,
    user_id: UserId,
) -> RepositoryResult<GroupRole> {
    repo.get_membership(group_id, user_id)
        .await?
        .ok_or_else(|| {
            RepositoryError::permission_denied_with_context(
                "Access denied",
                ErrorContext::new("require_member")
                    .with_entity("group")
                    .with_entity_id(group_id),
            )
        })
}

async fn require_leader<R: FullRepository + ?Sized>(
    repo: &R,
    group_id: GroupId,
    user_id: UserId,
    action: &str,
) -> RepositoryResult<()> {
    match require_member(repo, group_id, user_id).await? {
        GroupRole::Leader => Ok(()),
        GroupRole::Member => Err(RepositoryError::permission_denied(format!(
            "Only the group leader can {}",
            action
        ))),
    }
}

fn require_admin(actor: &Actor) -> RepositoryResult<()> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(RepositoryError::permission_denied(
            "Administrator role required",
        ))
    }
}

fn non_blank(value: &str, what: &str) -> RepositoryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation(format!("{} is required", what)));
    }
    Ok(trimmed.to_string())
}

fn normalize_email(email: &str) -> RepositoryResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(RepositoryError::validation(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

// ==================== Users & Profile ====================

/// Find a user by email, creating a student account on first sight.
///
/// This is the hook the external sign-in layer calls after authenticating.
pub async fn ensure_user<R: FullRepository + ?Sized>(
    repo: &R,
    email: &str,
    name: &str,
    picture: Option<&str>,
) -> RepositoryResult<User> {
    let email = normalize_email(email)?;
    if let Some(existing) = repo.find_user_by_email(&email).await? {
        return Ok(existing);
    }

    let name = match name.trim() {
        "" => email.split('@').next().unwrap_or_default().to_string(),
        given => given.to_string(),
    };
    info!("Service layer: registering new user {}", email);
    repo.create_user(&NewUser {
        email,
        name,
        picture: picture.map(str::to_string),
    })
    .await
}

pub async fn get_user<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
) -> RepositoryResult<User> {
    repo.get_user(user_id).await
}

pub async fn list_universities<R: FullRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Vec<University>> {
    repo.list_universities().await
}

/// Body of a profile update. The whole profile is replaced; omitted optional
/// fields are cleared and an omitted role keeps the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub name: String,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub university_id: Option<UniversityId>,
    #[serde(default)]
    pub budget_min: Option<i32>,
    #[serde(default)]
    pub budget_max: Option<i32>,
    #[serde(default)]
    pub preferred_types: Vec<String>,
    #[serde(default)]
    pub preferred_activities: Vec<String>,
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|seen| seen == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Apply a profile update for `actor`.
///
/// Users may switch between `student` and `general`; admins stay admins and
/// nobody can promote themselves. The university is kept only for students
/// and must exist.
pub async fn update_profile<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    changes: &ProfileChanges,
) -> RepositoryResult<User> {
    let current = repo.get_user(actor.user_id).await?;
    let name = non_blank(&changes.name, "Name")?;

    let role = if current.role.is_admin() {
        UserRole::Admin
    } else {
        match changes.role {
            Some(UserRole::Admin) => {
                return Err(RepositoryError::permission_denied(
                    "The admin role cannot be self-assigned",
                ))
            }
            Some(role) => role,
            None => current.role,
        }
    };

    let university_id = match (role, changes.university_id) {
        (UserRole::Student, Some(id)) => {
            if repo.get_university(id).await?.is_none() {
                return Err(RepositoryError::validation(format!(
                    "University {} does not exist",
                    id
                )));
            }
            Some(id)
        }
        _ => None,
    };

    for budget in [changes.budget_min, changes.budget_max].into_iter().flatten() {
        if budget < 0 {
            return Err(RepositoryError::validation("Budgets cannot be negative"));
        }
    }
    if let (Some(min), Some(max)) = (changes.budget_min, changes.budget_max) {
        if min > max {
            return Err(RepositoryError::validation(
                "budget_min must not exceed budget_max",
            ));
        }
    }

    let update = ProfileUpdate {
        name,
        role,
        university_id,
        budget_min: changes.budget_min,
        budget_max: changes.budget_max,
        preferred_types: clean_tags(&changes.preferred_types),
        preferred_activities: clean_tags(&changes.preferred_activities),
    };
    info!("Service layer: updating profile of user {}", actor.user_id);
    repo.update_profile(actor.user_id, &update).await
}

// ==================== Personal Calendar ====================

/// The user's availability blocks followed by their university's schedule.
pub async fn user_calendar<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
) -> RepositoryResult<Vec<CalendarEntry>> {
    let user = repo.get_user(user_id).await?;
    let blocks = repo.list_availability_for_user(user_id).await?;
    let university = match user.university_id {
        Some(university_id) => repo.list_university_events(university_id).await?,
        None => Vec::new(),
    };
    debug!(
        "Calendar for user {}: {} blocks, {} university events",
        user_id,
        blocks.len(),
        university.len()
    );
    Ok(personal_feed(&blocks, &university))
}

/// Record an availability block from client-supplied date strings.
///
/// A time suffix on either date is dropped. The note defaults to
/// "Available". Blocks longer than [`MAX_SPAN_DAYS`] are rejected.
pub async fn add_availability<R: FullRepository + ?Sized>(
    repo: &R,
    owner: UserId,
    start_date: &str,
    end_date: &str,
    note: Option<&str>,
) -> RepositoryResult<AvailabilityEvent> {
    let parse = |value: &str, field: &str| {
        parse_day(value).ok_or_else(|| {
            RepositoryError::validation(format!("Invalid {} '{}'", field, value.trim()))
        })
    };
    let start_date = parse(start_date, "start_date")?;
    let end_date = parse(end_date, "end_date")?;
    if start_date >= end_date {
        return Err(RepositoryError::validation(
            "start_date must be before end_date",
        ));
    }
    if (end_date - start_date).num_days() > MAX_SPAN_DAYS {
        return Err(RepositoryError::validation(format!(
            "Availability blocks can span at most {} days",
            MAX_SPAN_DAYS
        )));
    }

    let note = AvailabilityStatus::from_note(note.unwrap_or(AvailabilityStatus::AVAILABLE));
    repo.add_availability(&NewAvailability {
        owner_id: owner,
        start_date,
        end_date,
        note,
    })
    .await
}

/// Delete one of the caller's own blocks.
pub async fn delete_availability<R: FullRepository + ?Sized>(
    repo: &R,
    owner: UserId,
    id: AvailabilityId,
) -> RepositoryResult<()> {
    if repo.delete_availability(owner, id).await? {
        Ok(())
    } else {
        Err(RepositoryError::permission_denied_with_context(
            "Unauthorized or not found",
            ErrorContext::new("delete_availability")
                .with_entity("availability")
                .with_entity_id(id),
        ))
    }
}

// ==================== Catalog ====================

pub async fn list_destinations<R: FullRepository + ?Sized>(
    repo: &R,
    query: &DestinationQuery,
    viewer: Option<UserId>,
) -> RepositoryResult<DestinationPage> {
    repo.list_destinations(query, viewer).await
}

pub async fn random_destinations<R: FullRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Vec<Destination>> {
    repo.random_destinations(RANDOM_PICKS).await
}

pub async fn get_destination<R: FullRepository + ?Sized>(
    repo: &R,
    dest_id: DestinationId,
) -> RepositoryResult<Destination> {
    repo.get_destination(dest_id).await
}

/// Admin upsert: updates when `input.dest_id` is set, inserts otherwise.
pub async fn save_destination<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: &DestinationInput,
) -> RepositoryResult<Destination> {
    require_admin(actor)?;
    non_blank(&input.name, "Destination name")?;
    if let (Some(min), Some(max)) = (input.price_min, input.price_max) {
        if min > max {
            return Err(RepositoryError::validation(
                "price_min must not exceed price_max",
            ));
        }
    }

    match input.dest_id {
        Some(dest_id) => {
            info!("Service layer: updating destination {}", dest_id);
            repo.update_destination(dest_id, input).await
        }
        None => {
            let created = repo.create_destination(input).await?;
            info!("Service layer: created destination {}", created.dest_id);
            Ok(created)
        }
    }
}

pub async fn delete_destination<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    dest_id: DestinationId,
) -> RepositoryResult<()> {
    require_admin(actor)?;
    info!("Service layer: deleting destination {}", dest_id);
    repo.delete_destination(dest_id).await
}

/// Returns `false` when the destination was already a favourite.
pub async fn add_favourite<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
    dest_id: DestinationId,
) -> RepositoryResult<bool> {
    repo.add_favourite(user_id, dest_id).await
}

pub async fn remove_favourite<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
    dest_id: DestinationId,
) -> RepositoryResult<bool> {
    repo.remove_favourite(user_id, dest_id).await
}

pub async fn list_favourites<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
) -> RepositoryResult<Vec<Destination>> {
    repo.list_favourites(user_id).await
}

// ==================== Groups ====================

pub async fn list_groups<R: FullRepository + ?Sized>(
    repo: &R,
    user_id: UserId,
) -> RepositoryResult<Vec<GroupSummary>> {
    repo.list_groups_for_user(user_id).await
}

/// Create a group led by `actor`.
pub async fn create_group<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    name: &str,
) -> RepositoryResult<Group> {
    let name = non_blank(name, "Group name")?;
    let group = repo.create_group(&name, actor.user_id).await?;
    info!(
        "Service layer: user {} created group {} ({})",
        actor.user_id, group.group_id, group.group_name
    );
    Ok(group)
}

pub async fn rename_group<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
    name: &str,
) -> RepositoryResult<()> {
    let name = non_blank(name, "Group name")?;
    require_leader(repo, group_id, actor.user_id, "edit the group").await?;
    repo.rename_group(group_id, &name).await
}

pub async fn delete_group<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
) -> RepositoryResult<()> {
    require_leader(repo, group_id, actor.user_id, "delete the group").await?;
    info!("Service layer: deleting group {}", group_id);
    repo.delete_group(group_id).await
}

/// Members, pending invites and the caller's role.
pub async fn group_detail<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
) -> RepositoryResult<GroupDetail> {
    let role = require_member(repo, group_id, actor.user_id).await?;
    let group = repo.get_group(group_id).await?;
    Ok(GroupDetail {
        group_id,
        group_name: group.group_name,
        members: repo.list_members(group_id).await?,
        invites: repo.list_pending_invites(group_id).await?,
        current_user_role: role,
    })
}

// ==================== Invitations ====================

/// Where invite links point and who they come from.
#[derive(Debug, Clone, Copy)]
pub struct InviteSettings<'a> {
    pub base_url: &'a str,
    pub mail_from: &'a str,
}

/// Create a pending invite for `email` and send the invitation.
///
/// The invite row is kept when delivery fails so it can be resent.
pub async fn invite_member<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn InviteMailer,
    settings: InviteSettings<'_>,
    actor: &Actor,
    group_id: GroupId,
    email: &str,
) -> RepositoryResult<Invite> {
    let email = normalize_email(email)?;
    require_member(repo, group_id, actor.user_id).await?;
    let group = repo.get_group(group_id).await?;
    let sender = repo.get_user(actor.user_id).await?;

    let token = new_invite_token();
    let invite = repo
        .create_invite(group_id, &email, &token, actor.user_id)
        .await?;

    let message = compose_invite(
        settings.base_url,
        settings.mail_from,
        &sender.name,
        &group.group_name,
        &email,
        &token,
    );
    if let Err(e) = mailer.send(&message).await {
        warn!("Failed to send invite {} to {}: {:#}", invite.invite_id, email, e);
        return Err(RepositoryError::internal_with_context(
            "Failed to send email.",
            ErrorContext::new("invite_member")
                .with_entity("invite")
                .with_entity_id(invite.invite_id),
        ));
    }

    info!(
        "Service layer: user {} invited {} to group {}",
        actor.user_id, email, group_id
    );
    Ok(invite)
}

/// Accept the pending invite carrying `token` as `actor`.
///
/// Joining a group one already belongs to is not an error.
pub async fn join_group<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    token: &str,
) -> RepositoryResult<GroupId> {
    let invite = repo
        .find_pending_invite(token.trim())
        .await?
        .ok_or_else(|| RepositoryError::not_found("This invite link is invalid or expired."))?;

    let added = repo
        .add_member(invite.group_id, actor.user_id, GroupRole::Member)
        .await?;
    repo.accept_invite(invite.invite_id).await?;
    if added {
        info!(
            "Service layer: user {} joined group {}",
            actor.user_id, invite.group_id
        );
    }
    Ok(invite.group_id)
}

// ==================== Trips & Votes ====================

/// Share a catalog destination into a group.
pub async fn share_trip<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
    dest_id: DestinationId,
) -> RepositoryResult<SharedTrip> {
    require_member(repo, group_id, actor.user_id).await?;
    match repo.share_trip(group_id, dest_id, actor.user_id).await {
        Err(RepositoryError::Conflict { context, .. }) => {
            Err(RepositoryError::validation_with_context(
                "Destination has already been shared to this group",
                context,
            ))
        }
        other => other,
    }
}

pub async fn list_trips<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
) -> RepositoryResult<Vec<TripSummary>> {
    require_member(repo, group_id, actor.user_id).await?;
    repo.list_trips(group_id, actor.user_id).await
}

/// Remove a shared trip. Allowed for the group leader and the member who
/// shared it.
pub async fn remove_trip<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
    trip_ref_id: TripRefId,
) -> RepositoryResult<()> {
    let role = require_member(repo, group_id, actor.user_id).await?;
    let trip = repo
        .find_trip(trip_ref_id)
        .await?
        .filter(|trip| trip.group_id == group_id)
        .ok_or_else(|| RepositoryError::not_found(format!("Trip {} not found", trip_ref_id)))?;

    if role != GroupRole::Leader && trip.shared_by != actor.user_id {
        return Err(RepositoryError::permission_denied(
            "Only the group leader or the member who shared the trip can remove it",
        ));
    }
    repo.remove_trip(trip_ref_id).await
}

/// Add or withdraw the caller's vote on a trip of one of their groups.
pub async fn toggle_vote<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    trip_ref_id: TripRefId,
) -> RepositoryResult<VoteAction> {
    let trip = repo
        .find_trip(trip_ref_id)
        .await?
        .ok_or_else(|| RepositoryError::not_found(format!("Trip {} not found", trip_ref_id)))?;
    require_member(repo, trip.group_id, actor.user_id).await?;
    repo.toggle_vote(trip_ref_id, actor.user_id).await
}

// ==================== Group Calendar & Suggestions ====================

async fn member_blocks<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
) -> RepositoryResult<(Vec<Member>, Vec<AvailabilityEvent>)> {
    require_member(repo, group_id, actor.user_id).await?;
    let members = repo.list_members(group_id).await?;
    let ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
    let blocks = repo.list_availability_for_users(&ids).await?;
    Ok((members, blocks))
}

/// Every member's availability blocks, titled with the member's name.
pub async fn group_calendar<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
) -> RepositoryResult<Vec<CalendarEntry>> {
    let (members, blocks) = member_blocks(repo, actor, group_id).await?;
    Ok(group_feed(&members, &blocks))
}

/// Days on which the most members are available.
///
/// The tally counts blocks, not people: a member with two overlapping
/// non-busy blocks adds two to each shared day.
pub async fn group_best_dates<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
) -> RepositoryResult<Recommendation> {
    let (_, blocks) = member_blocks(repo, actor, group_id).await?;
    let recommendation = best_dates_for_events(&blocks);
    debug!(
        "Best dates for group {}: count={} days={}",
        group_id,
        recommendation.best_day_count,
        recommendation.best_days.len()
    );
    Ok(recommendation)
}

/// Catalog destinations ranked against the members' preferences.
pub async fn group_recommendations<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    group_id: GroupId,
) -> RepositoryResult<Vec<ScoredDestination>> {
    require_member(repo, group_id, actor.user_id).await?;
    let ids: Vec<UserId> = repo
        .list_members(group_id)
        .await?
        .iter()
        .map(|m| m.user_id)
        .collect();
    let members = repo.get_users(&ids).await?;
    let profile = GroupProfile::from_members(&members);
    let catalog = repo.all_destinations().await?;
    Ok(rank_destinations(&profile, catalog, DEFAULT_LIMIT))
}
