//! Data Transfer Objects for the HTTP API.
//!
//! Request bodies and small response envelopes. Domain types that already
//! serialize in their wire shape (destinations, groups, trips, calendar
//! entries) are returned directly from [`crate::api`].

use serde::{Deserialize, Serialize};

use crate::api::{DestinationId, DestinationQuery, GroupId, TripRefId, VoteAction};
use crate::models::catalog::lenient;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Plain `{ message }` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Navbar identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub name: String,
    pub picture: Option<String>,
}

// ==================== Calendar ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCreated {
    pub success: bool,
    pub id: i64,
}

// ==================== Catalog ====================

/// Raw catalog query string. Parsed leniently: a bad page means page 1 and
/// a bad price means no price filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationsParams {
    pub page: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
    pub incomplete: Option<String>,
}

impl From<DestinationsParams> for DestinationQuery {
    fn from(params: DestinationsParams) -> Self {
        let page = params
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        DestinationQuery {
            page,
            search: params.search,
            kind: params.kind,
            max_price: params
                .max_price
                .as_deref()
                .and_then(|p| p.trim().parse().ok()),
            incomplete: params
                .incomplete
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedDestinationResponse {
    pub message: String,
    pub dest_id: DestinationId,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavouriteRequest {
    #[serde(
        rename = "destinationId",
        alias = "dest_id",
        default,
        deserialize_with = "lenient"
    )]
    pub destination_id: Option<DestinationId>,
}

// ==================== Groups ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNameRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreated {
    pub success: bool,
    #[serde(rename = "groupId")]
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareTripRequest {
    #[serde(alias = "dest_id", default, deserialize_with = "lenient")]
    pub destination_id: Option<DestinationId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    #[serde(
        rename = "tripRefId",
        alias = "trip_ref_id",
        default,
        deserialize_with = "lenient"
    )]
    pub trip_ref_id: Option<TripRefId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub action: VoteAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinParams {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub message: String,
    #[serde(rename = "groupId")]
    pub group_id: GroupId,
}
