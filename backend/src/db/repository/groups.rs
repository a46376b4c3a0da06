//! Repository trait for groups and everything scoped to a group.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    DestinationId, Group, GroupId, GroupRole, GroupSummary, Invite, InviteId, Member, SharedTrip,
    TripRefId, TripSummary, UserId, VoteAction,
};

/// Repository trait for groups, invites, shared trips and votes.
///
/// Permission checks (leader-only, members-only) are the caller's job; these
/// methods only enforce referential rules.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    // ==================== Groups ====================

    /// Create a group with `leader` as its first member.
    async fn create_group(&self, name: &str, leader: UserId) -> RepositoryResult<Group>;

    async fn get_group(&self, group_id: GroupId) -> RepositoryResult<Group>;

    async fn rename_group(&self, group_id: GroupId, name: &str) -> RepositoryResult<()>;

    /// Delete a group and its members, invites, trips and votes.
    async fn delete_group(&self, group_id: GroupId) -> RepositoryResult<()>;

    /// Groups the user belongs to, with their role and the member count.
    async fn list_groups_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<GroupSummary>>;

    // ==================== Membership ====================

    /// Role of `user_id` in the group, `None` if not a member.
    async fn get_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> RepositoryResult<Option<GroupRole>>;

    /// Members ordered leader first, then by name.
    async fn list_members(&self, group_id: GroupId) -> RepositoryResult<Vec<Member>>;

    /// Add a member. Returns `false` if the user already belongs to the group.
    async fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        role: GroupRole,
    ) -> RepositoryResult<bool>;

    // ==================== Invites ====================

    async fn create_invite(
        &self,
        group_id: GroupId,
        email: &str,
        token: &str,
        invited_by: UserId,
    ) -> RepositoryResult<Invite>;

    /// Pending invite carrying `token`, if any.
    async fn find_pending_invite(&self, token: &str) -> RepositoryResult<Option<Invite>>;

    async fn list_pending_invites(&self, group_id: GroupId) -> RepositoryResult<Vec<Invite>>;

    async fn accept_invite(&self, invite_id: InviteId) -> RepositoryResult<()>;

    // ==================== Trips & Votes ====================

    /// Share a destination into a group.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If the destination is already shared there
    async fn share_trip(
        &self,
        group_id: GroupId,
        dest_id: DestinationId,
        shared_by: UserId,
    ) -> RepositoryResult<SharedTrip>;

    async fn find_trip(&self, trip_ref_id: TripRefId) -> RepositoryResult<Option<SharedTrip>>;

    /// Trips of a group ordered by vote count (most first), flagged with
    /// whether `viewer` voted.
    async fn list_trips(
        &self,
        group_id: GroupId,
        viewer: UserId,
    ) -> RepositoryResult<Vec<TripSummary>>;

    /// Remove a shared trip and its votes.
    async fn remove_trip(&self, trip_ref_id: TripRefId) -> RepositoryResult<()>;

    /// Add the user's vote, or remove it if already cast.
    async fn toggle_vote(
        &self,
        trip_ref_id: TripRefId,
        user_id: UserId,
    ) -> RepositoryResult<VoteAction>;
}
