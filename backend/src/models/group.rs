//! Travel groups, invitations, shared trips and votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::{DestinationId, GroupId, InviteId, TripRefId, UserId};

/// Role of a user inside one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Leader,
    Member,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Leader => "leader",
            GroupRole::Member => "member",
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leader" => Ok(Self::Leader),
            "member" => Ok(Self::Member),
            other => Err(format!("Unknown group role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: GroupId,
    pub group_name: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// One row of "my groups".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_id: GroupId,
    pub group_name: String,
    pub role: GroupRole,
    pub member_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub role: GroupRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
        }
    }
}

impl FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            other => Err(format!("Unknown invite status: {}", other)),
        }
    }
}

/// An emailed invitation to join a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub invite_id: InviteId,
    pub group_id: GroupId,
    pub email: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub status: InviteStatus,
    pub invited_by: UserId,
}

/// Members, pending invites and the caller's role, as shown on a group page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDetail {
    pub group_id: GroupId,
    pub group_name: String,
    pub members: Vec<Member>,
    pub invites: Vec<Invite>,
    #[serde(rename = "currentUserRole")]
    pub current_user_role: GroupRole,
}

/// A destination shared into a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedTrip {
    pub trip_ref_id: TripRefId,
    pub group_id: GroupId,
    pub dest_id: DestinationId,
    pub shared_by: UserId,
    pub shared_at: DateTime<Utc>,
}

/// A shared trip joined with its destination and vote tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_ref_id: TripRefId,
    pub shared_at: DateTime<Utc>,
    pub dest_id: DestinationId,
    pub name: String,
    pub state: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub images: Option<String>,
    pub price_min: Option<i32>,
    /// Display name of the member who shared it.
    pub shared_by: String,
    pub vote_count: i64,
    pub user_has_voted: bool,
}

/// Result of toggling a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Added,
    Removed,
}

/// Order trips by vote count, most votes first; ties keep the newest share first.
pub fn sort_trips(trips: &mut [TripSummary]) {
    trips.sort_by(|a, b| {
        b.vote_count
            .cmp(&a.vote_count)
            .then_with(|| b.shared_at.cmp(&a.shared_at))
            .then_with(|| b.trip_ref_id.cmp(&a.trip_ref_id))
    });
}
