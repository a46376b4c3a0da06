//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data lives in ordered
//! maps behind a single lock, giving fast, deterministic, isolated execution.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::api::*;
use crate::db::repository::*;
use crate::models::{sort_trips, PAGE_SIZE};

/// In-memory local repository.
///
/// Clones share the same underlying data.
///
/// # Example
/// ```
/// use aroov::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// let uni = repo.seed_university("Chulalongkorn University");
/// assert_eq!(uni.name, "Chulalongkorn University");
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    users: BTreeMap<UserId, User>,
    universities: BTreeMap<UniversityId, University>,
    university_events: BTreeMap<UniversityEventId, UniversityScheduleEvent>,
    availability: BTreeMap<AvailabilityId, AvailabilityEvent>,

    destinations: BTreeMap<DestinationId, Destination>,
    // Insertion order doubles as "most recently added" order.
    favourites: Vec<(UserId, DestinationId)>,

    groups: BTreeMap<GroupId, Group>,
    members: BTreeMap<(GroupId, UserId), GroupRole>,
    invites: BTreeMap<InviteId, Invite>,
    trips: BTreeMap<TripRefId, SharedTrip>,
    votes: BTreeSet<(TripRefId, UserId)>,

    // ID counters
    next_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            universities: BTreeMap::new(),
            university_events: BTreeMap::new(),
            availability: BTreeMap::new(),
            destinations: BTreeMap::new(),
            favourites: Vec::new(),
            groups: BTreeMap::new(),
            members: BTreeMap::new(),
            invites: BTreeMap::new(),
            trips: BTreeMap::new(),
            votes: BTreeSet::new(),
            next_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    /// Ids are drawn from one sequence so they never collide across tables.
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn member_count(&self, group_id: GroupId) -> i64 {
        self.members
            .range((group_id, UserId(i64::MIN))..=(group_id, UserId(i64::MAX)))
            .count() as i64
    }

    fn remove_trip(&mut self, trip_ref_id: TripRefId) {
        self.trips.remove(&trip_ref_id);
        self.votes.retain(|(trip, _)| *trip != trip_ref_id);
    }

    fn is_favourite(&self, user_id: UserId, dest_id: DestinationId) -> bool {
        self.favourites.contains(&(user_id, dest_id))
    }
}

fn ensure_valid_destination(input: &DestinationInput) -> RepositoryResult<()> {
    if input.name.trim().is_empty() {
        return Err(RepositoryError::validation("Destination name is required"));
    }
    Ok(())
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Add a university directly. Helper for seeding test data.
    pub fn seed_university(&self, name: &str) -> University {
        let mut data = self.data.write();
        let university = University {
            university_id: UniversityId(data.next_id()),
            name: name.to_string(),
        };
        data.universities
            .insert(university.university_id, university.clone());
        university
    }

    /// Add a destination directly. Helper for seeding test data.
    pub fn seed_destination(&self, input: DestinationInput) -> Destination {
        let mut data = self.data.write();
        let dest_id = DestinationId(data.next_id());
        let destination = input.into_destination(dest_id);
        data.destinations.insert(dest_id, destination.clone());
        destination
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.data.read().users.len()
    }

    /// Number of stored destinations.
    pub fn destination_count(&self) -> usize {
        self.data.read().destinations.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn user_not_found(user_id: UserId) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("User {} not found", user_id),
        ErrorContext::default()
            .with_entity("user")
            .with_entity_id(user_id),
    )
}

fn destination_not_found(dest_id: DestinationId) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Destination {} not found", dest_id),
        ErrorContext::default()
            .with_entity("destination")
            .with_entity_id(dest_id),
    )
}

fn group_not_found(group_id: GroupId) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Group {} not found", group_id),
        ErrorContext::default()
            .with_entity("group")
            .with_entity_id(group_id),
    )
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write();
        let email = user.email.trim().to_lowercase();
        if data.users.values().any(|u| u.email == email) {
            return Err(RepositoryError::conflict_with_context(
                format!("Email {} is already registered", email),
                ErrorContext::new("create_user").with_entity("user"),
            ));
        }

        let created = User {
            user_id: UserId(data.next_id()),
            email,
            name: user.name.clone(),
            picture: user.picture.clone(),
            role: UserRole::default(),
            university_id: None,
            budget_min: None,
            budget_max: None,
            preferred_types: Vec::new(),
            preferred_activities: Vec::new(),
        };
        data.users.insert(created.user_id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.check_health()?;
        self.data
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn get_users(&self, user_ids: &[UserId]) -> RepositoryResult<Vec<User>> {
        self.check_health()?;
        let data = self.data.read();
        Ok(user_ids
            .iter()
            .filter_map(|id| data.users.get(id).cloned())
            .collect())
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.check_health()?;
        let email = email.trim().to_lowercase();
        Ok(self
            .data
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write();
        let user = data
            .users
            .get_mut(&user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.name = update.name.clone();
        user.role = update.role;
        user.university_id = update.university_id;
        user.budget_min = update.budget_min;
        user.budget_max = update.budget_max;
        user.preferred_types = update.preferred_types.clone();
        user.preferred_activities = update.preferred_activities.clone();
        Ok(user.clone())
    }

    async fn list_universities(&self) -> RepositoryResult<Vec<University>> {
        self.check_health()?;
        let mut list: Vec<University> = self.data.read().universities.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn add_university(&self, name: &str) -> RepositoryResult<University> {
        self.check_health()?;
        Ok(self.seed_university(name))
    }

    async fn get_university(
        &self,
        university_id: UniversityId,
    ) -> RepositoryResult<Option<University>> {
        self.check_health()?;
        Ok(self.data.read().universities.get(&university_id).cloned())
    }
}

#[async_trait]
impl CatalogRepository for LocalRepository {
    async fn list_destinations(
        &self,
        query: &DestinationQuery,
        viewer: Option<UserId>,
    ) -> RepositoryResult<DestinationPage> {
        self.check_health()?;
        let data = self.data.read();
        let matching: Vec<&Destination> = data
            .destinations
            .values()
            .rev()
            .filter(|d| query.matches(d))
            .collect();

        let total_pages = DestinationQuery::total_pages(matching.len() as u64);
        let rows = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(PAGE_SIZE as usize)
            .map(|d| DestinationListing {
                is_liked: viewer.is_some_and(|user| data.is_favourite(user, d.dest_id)),
                destination: d.clone(),
            })
            .collect();

        Ok(DestinationPage {
            data: rows,
            total_pages,
        })
    }

    async fn random_destinations(&self, limit: usize) -> RepositoryResult<Vec<Destination>> {
        self.check_health()?;
        let data = self.data.read();
        let all: Vec<&Destination> = data.destinations.values().collect();
        Ok(all
            .choose_multiple(&mut rand::thread_rng(), limit)
            .map(|d| (*d).clone())
            .collect())
    }

    async fn all_destinations(&self) -> RepositoryResult<Vec<Destination>> {
        self.check_health()?;
        Ok(self.data.read().destinations.values().rev().cloned().collect())
    }

    async fn get_destination(&self, dest_id: DestinationId) -> RepositoryResult<Destination> {
        self.check_health()?;
        self.data
            .read()
            .destinations
            .get(&dest_id)
            .cloned()
            .ok_or_else(|| destination_not_found(dest_id))
    }

    async fn create_destination(
        &self,
        input: &DestinationInput,
    ) -> RepositoryResult<Destination> {
        self.check_health()?;
        ensure_valid_destination(input)?;
        Ok(self.seed_destination(input.clone()))
    }

    async fn update_destination(
        &self,
        dest_id: DestinationId,
        input: &DestinationInput,
    ) -> RepositoryResult<Destination> {
        self.check_health()?;
        ensure_valid_destination(input)?;
        let mut data = self.data.write();
        let slot = data
            .destinations
            .get_mut(&dest_id)
            .ok_or_else(|| destination_not_found(dest_id))?;
        *slot = input.clone().into_destination(dest_id);
        Ok(slot.clone())
    }

    async fn delete_destination(&self, dest_id: DestinationId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.destinations.remove(&dest_id).is_none() {
            return Err(destination_not_found(dest_id));
        }
        data.favourites.retain(|(_, d)| *d != dest_id);
        let trips: Vec<TripRefId> = data
            .trips
            .values()
            .filter(|t| t.dest_id == dest_id)
            .map(|t| t.trip_ref_id)
            .collect();
        for trip in trips {
            data.remove_trip(trip);
        }
        Ok(())
    }

    async fn add_favourite(
        &self,
        user_id: UserId,
        dest_id: DestinationId,
    ) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.destinations.contains_key(&dest_id) {
            return Err(destination_not_found(dest_id));
        }
        if data.is_favourite(user_id, dest_id) {
            return Ok(false);
        }
        data.favourites.push((user_id, dest_id));
        Ok(true)
    }

    async fn remove_favourite(
        &self,
        user_id: UserId,
        dest_id: DestinationId,
    ) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        let before = data.favourites.len();
        data.favourites.retain(|entry| *entry != (user_id, dest_id));
        Ok(data.favourites.len() != before)
    }

    async fn list_favourites(&self, user_id: UserId) -> RepositoryResult<Vec<Destination>> {
        self.check_health()?;
        let data = self.data.read();
        Ok(data
            .favourites
            .iter()
            .rev()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, dest)| data.destinations.get(dest).cloned())
            .collect())
    }
}

#[async_trait]
impl GroupRepository for LocalRepository {
    async fn create_group(&self, name: &str, leader: UserId) -> RepositoryResult<Group> {
        self.check_health()?;
        let mut data = self.data.write();
        let group = Group {
            group_id: GroupId(data.next_id()),
            group_name: name.to_string(),
            created_by: leader,
            created_at: Utc::now(),
        };
        data.groups.insert(group.group_id, group.clone());
        data.members
            .insert((group.group_id, leader), GroupRole::Leader);
        Ok(group)
    }

    async fn get_group(&self, group_id: GroupId) -> RepositoryResult<Group> {
        self.check_health()?;
        self.data
            .read()
            .groups
            .get(&group_id)
            .cloned()
            .ok_or_else(|| group_not_found(group_id))
    }

    async fn rename_group(&self, group_id: GroupId, name: &str) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        let group = data
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| group_not_found(group_id))?;
        group.group_name = name.to_string();
        Ok(())
    }

    async fn delete_group(&self, group_id: GroupId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.groups.remove(&group_id).is_none() {
            return Err(group_not_found(group_id));
        }
        data.members.retain(|(group, _), _| *group != group_id);
        data.invites.retain(|_, invite| invite.group_id != group_id);
        let trips: Vec<TripRefId> = data
            .trips
            .values()
            .filter(|t| t.group_id == group_id)
            .map(|t| t.trip_ref_id)
            .collect();
        for trip in trips {
            data.remove_trip(trip);
        }
        Ok(())
    }

    async fn list_groups_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<GroupSummary>> {
        self.check_health()?;
        let data = self.data.read();
        let mut groups: Vec<GroupSummary> = data
            .members
            .iter()
            .filter(|((_, user), _)| *user == user_id)
            .filter_map(|((group_id, _), role)| {
                data.groups.get(group_id).map(|g| GroupSummary {
                    group_id: g.group_id,
                    group_name: g.group_name.clone(),
                    role: *role,
                    member_count: data.member_count(g.group_id),
                })
            })
            .collect();
        groups.sort_by(|a, b| b.group_id.cmp(&a.group_id));
        Ok(groups)
    }

    async fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> RepositoryResult<Option<GroupRole>> {
        self.check_health()?;
        Ok(self.data.read().members.get(&(group_id, user_id)).copied())
    }

    async fn list_members(&self, group_id: GroupId) -> RepositoryResult<Vec<Member>> {
        self.check_health()?;
        let data = self.data.read();
        let mut members: Vec<Member> = data
            .members
            .iter()
            .filter(|((group, _), _)| *group == group_id)
            .filter_map(|((_, user_id), role)| {
                data.users.get(user_id).map(|u| Member {
                    user_id: u.user_id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    picture: u.picture.clone(),
                    role: *role,
                })
            })
            .collect();
        members.sort_by(|a, b| {
            (a.role != GroupRole::Leader, &a.name).cmp(&(b.role != GroupRole::Leader, &b.name))
        });
        Ok(members)
    }

    async fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        role: GroupRole,
    ) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.groups.contains_key(&group_id) {
            return Err(group_not_found(group_id));
        }
        if data.members.contains_key(&(group_id, user_id)) {
            return Ok(false);
        }
        data.members.insert((group_id, user_id), role);
        Ok(true)
    }

    async fn create_invite(
        &self,
        group_id: GroupId,
        email: &str,
        token: &str,
        invited_by: UserId,
    ) -> RepositoryResult<Invite> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.groups.contains_key(&group_id) {
            return Err(group_not_found(group_id));
        }
        let invite = Invite {
            invite_id: InviteId(data.next_id()),
            group_id,
            email: email.to_string(),
            token: token.to_string(),
            status: InviteStatus::Pending,
            invited_by,
        };
        data.invites.insert(invite.invite_id, invite.clone());
        Ok(invite)
    }

    async fn find_pending_invite(&self, token: &str) -> RepositoryResult<Option<Invite>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .invites
            .values()
            .find(|i| i.token == token && i.status == InviteStatus::Pending)
            .cloned())
    }

    async fn list_pending_invites(&self, group_id: GroupId) -> RepositoryResult<Vec<Invite>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .invites
            .values()
            .filter(|i| i.group_id == group_id && i.status == InviteStatus::Pending)
            .cloned()
            .collect())
    }

    async fn accept_invite(&self, invite_id: InviteId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        let invite = data.invites.get_mut(&invite_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Invite {} not found", invite_id))
        })?;
        invite.status = InviteStatus::Accepted;
        Ok(())
    }

    async fn share_trip(
        &self,
        group_id: GroupId,
        dest_id: DestinationId,
        shared_by: UserId,
    ) -> RepositoryResult<SharedTrip> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.groups.contains_key(&group_id) {
            return Err(group_not_found(group_id));
        }
        if !data.destinations.contains_key(&dest_id) {
            return Err(destination_not_found(dest_id));
        }
        if data
            .trips
            .values()
            .any(|t| t.group_id == group_id && t.dest_id == dest_id)
        {
            return Err(RepositoryError::conflict_with_context(
                "Destination already shared in this group",
                ErrorContext::new("share_trip")
                    .with_entity("group")
                    .with_entity_id(group_id),
            ));
        }
        let trip = SharedTrip {
            trip_ref_id: TripRefId(data.next_id()),
            group_id,
            dest_id,
            shared_by,
            shared_at: Utc::now(),
        };
        data.trips.insert(trip.trip_ref_id, trip.clone());
        Ok(trip)
    }

    async fn find_trip(&self, trip_ref_id: TripRefId) -> RepositoryResult<Option<SharedTrip>> {
        self.check_health()?;
        Ok(self.data.read().trips.get(&trip_ref_id).cloned())
    }

    async fn list_trips(
        &self,
        group_id: GroupId,
        viewer: UserId,
    ) -> RepositoryResult<Vec<TripSummary>> {
        self.check_health()?;
        let data = self.data.read();
        let mut trips: Vec<TripSummary> = data
            .trips
            .values()
            .filter(|t| t.group_id == group_id)
            .filter_map(|t| {
                let dest = data.destinations.get(&t.dest_id)?;
                let vote_count = data
                    .votes
                    .iter()
                    .filter(|(trip, _)| *trip == t.trip_ref_id)
                    .count() as i64;
                Some(TripSummary {
                    trip_ref_id: t.trip_ref_id,
                    shared_at: t.shared_at,
                    dest_id: dest.dest_id,
                    name: dest.name.clone(),
                    state: dest.state.clone(),
                    kind: dest.kind.clone(),
                    images: dest.images.clone(),
                    price_min: dest.price_min,
                    shared_by: data
                        .users
                        .get(&t.shared_by)
                        .map(|u| u.name.clone())
                        .unwrap_or_default(),
                    vote_count,
                    user_has_voted: data.votes.contains(&(t.trip_ref_id, viewer)),
                })
            })
            .collect();
        sort_trips(&mut trips);
        Ok(trips)
    }

    async fn remove_trip(&self, trip_ref_id: TripRefId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.trips.contains_key(&trip_ref_id) {
            return Err(RepositoryError::not_found(format!(
                "Trip {} not found",
                trip_ref_id
            )));
        }
        data.remove_trip(trip_ref_id);
        Ok(())
    }

    async fn toggle_vote(
        &self,
        trip_ref_id: TripRefId,
        user_id: UserId,
    ) -> RepositoryResult<VoteAction> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.trips.contains_key(&trip_ref_id) {
            return Err(RepositoryError::not_found(format!(
                "Trip {} not found",
                trip_ref_id
            )));
        }
        if data.votes.remove(&(trip_ref_id, user_id)) {
            Ok(VoteAction::Removed)
        } else {
            data.votes.insert((trip_ref_id, user_id));
            Ok(VoteAction::Added)
        }
    }
}

#[async_trait]
impl CalendarRepository for LocalRepository {
    async fn add_availability(
        &self,
        block: &NewAvailability,
    ) -> RepositoryResult<AvailabilityEvent> {
        self.check_health()?;
        let mut data = self.data.write();
        let event = AvailabilityEvent {
            id: AvailabilityId(data.next_id()),
            owner_id: block.owner_id,
            start_date: block.start_date,
            end_date: block.end_date,
            note: block.note.clone(),
        };
        data.availability.insert(event.id, event.clone());
        Ok(event)
    }

    async fn delete_availability(
        &self,
        owner: UserId,
        id: AvailabilityId,
    ) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        match data.availability.get(&id) {
            Some(event) if event.owner_id == owner => {
                data.availability.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_availability_for_user(
        &self,
        user_id: UserId,
    ) -> RepositoryResult<Vec<AvailabilityEvent>> {
        self.list_availability_for_users(&[user_id]).await
    }

    async fn list_availability_for_users(
        &self,
        user_ids: &[UserId],
    ) -> RepositoryResult<Vec<AvailabilityEvent>> {
        self.check_health()?;
        let mut events: Vec<AvailabilityEvent> = self
            .data
            .read()
            .availability
            .values()
            .filter(|e| user_ids.contains(&e.owner_id))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_date, e.id));
        Ok(events)
    }

    async fn add_university_event(
        &self,
        event: &NewUniversityEvent,
    ) -> RepositoryResult<UniversityScheduleEvent> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.universities.contains_key(&event.university_id) {
            return Err(RepositoryError::not_found(format!(
                "University {} not found",
                event.university_id
            )));
        }
        let stored = UniversityScheduleEvent {
            event_id: UniversityEventId(data.next_id()),
            university_id: event.university_id,
            start_date: event.start_date,
            end_date: event.end_date,
            category: event.category.clone(),
            label: event.label.clone(),
        };
        data.university_events
            .insert(stored.event_id, stored.clone());
        Ok(stored)
    }

    async fn list_university_events(
        &self,
        university_id: UniversityId,
    ) -> RepositoryResult<Vec<UniversityScheduleEvent>> {
        self.check_health()?;
        let mut events: Vec<UniversityScheduleEvent> = self
            .data
            .read()
            .university_events
            .values()
            .filter(|e| e.university_id == university_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_date, e.event_id));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> DestinationInput {
        DestinationInput {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unhealthy_repository_rejects_calls() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let err = repo.list_universities().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = LocalRepository::new();
        let new = NewUser {
            email: "Nok@Example.com".to_string(),
            name: "Nok".to_string(),
            picture: None,
        };
        let user = repo.create_user(&new).await.unwrap();
        assert_eq!(user.email, "nok@example.com");
        let err = repo.create_user(&new).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
        assert!(repo
            .find_user_by_email("NOK@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_destination_cascades() {
        let repo = LocalRepository::new();
        let user = repo
            .create_user(&NewUser {
                email: "a@example.com".to_string(),
                name: "A".to_string(),
                picture: None,
            })
            .await
            .unwrap();
        let dest = repo.seed_destination(input("Hua Hin"));
        let group = repo.create_group("Trip", user.user_id).await.unwrap();
        let trip = repo
            .share_trip(group.group_id, dest.dest_id, user.user_id)
            .await
            .unwrap();
        repo.toggle_vote(trip.trip_ref_id, user.user_id)
            .await
            .unwrap();
        repo.add_favourite(user.user_id, dest.dest_id).await.unwrap();

        repo.delete_destination(dest.dest_id).await.unwrap();

        assert!(repo.list_favourites(user.user_id).await.unwrap().is_empty());
        assert!(repo
            .list_trips(group.group_id, user.user_id)
            .await
            .unwrap()
            .is_empty());
        assert!(repo.find_trip(trip.trip_ref_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_resets_data_but_keeps_health() {
        let repo = LocalRepository::new();
        repo.seed_destination(input("Pai"));
        repo.set_healthy(false);
        repo.clear();
        assert_eq!(repo.destination_count(), 0);
        assert!(!repo.health_check().await.unwrap());
    }
}
