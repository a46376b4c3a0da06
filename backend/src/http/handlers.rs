//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::auth::{CurrentUser, MaybeUser};
use super::dto::{
    AvailabilityCreated, AvailabilityRequest, DestinationsParams, FavouriteRequest,
    GroupCreated, GroupNameRequest, HealthResponse, InviteRequest, JoinParams, JoinResponse,
    MeResponse, MessageResponse, SavedDestinationResponse, ShareTripRequest, SuccessResponse,
    VoteRequest, VoteResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{
    AvailabilityId, Destination, DestinationId, DestinationInput, DestinationPage,
    DestinationQuery, GroupDetail, GroupId, GroupSummary, SharedTrip, TripRefId, TripSummary,
    University, User,
};
use crate::db::services::{self as db_services, ProfileChanges};
use crate::services::availability::EventRecord;
use crate::services::{self, CalendarEntry, Recommendation, ScoredDestination};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and database is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Universities & Profile
// =============================================================================

/// GET /api/universities
pub async fn list_universities(State(state): State<AppState>) -> HandlerResult<Vec<University>> {
    let universities = db_services::list_universities(state.repository.as_ref()).await?;
    Ok(Json(universities))
}

/// GET /api/user/me
pub async fn me(user: CurrentUser) -> HandlerResult<MeResponse> {
    let CurrentUser(user) = user;
    Ok(Json(MeResponse {
        name: user.name,
        picture: user.picture,
    }))
}

/// GET /api/user/profile
pub async fn get_profile(user: CurrentUser) -> HandlerResult<User> {
    Ok(Json(user.0))
}

/// PUT /api/user/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(changes): Json<ProfileChanges>,
) -> HandlerResult<MessageResponse> {
    db_services::update_profile(state.repository.as_ref(), &user.actor(), &changes).await?;
    Ok(Json(MessageResponse::new("Profile updated")))
}

// =============================================================================
// Personal Calendar
// =============================================================================

/// GET /api/user/calendar
pub async fn user_calendar(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<Vec<CalendarEntry>> {
    let feed = db_services::user_calendar(state.repository.as_ref(), user.id()).await?;
    Ok(Json(feed))
}

/// POST /api/user/availability
pub async fn add_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<AvailabilityRequest>,
) -> HandlerResult<AvailabilityCreated> {
    let created = db_services::add_availability(
        state.repository.as_ref(),
        user.id(),
        &request.start_date,
        &request.end_date,
        request.note.as_deref(),
    )
    .await?;

    Ok(Json(AvailabilityCreated {
        success: true,
        id: created.id.value(),
    }))
}

/// DELETE /api/user/availability/{id}
pub async fn delete_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<SuccessResponse> {
    db_services::delete_availability(state.repository.as_ref(), user.id(), AvailabilityId(id))
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Group Calendar & Best Dates
// =============================================================================

/// GET /api/groups/{group_id}/calendar
pub async fn group_calendar(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
) -> HandlerResult<Vec<CalendarEntry>> {
    let feed =
        db_services::group_calendar(state.repository.as_ref(), &user.actor(), GroupId(group_id))
            .await?;
    Ok(Json(feed))
}

/// GET /api/groups/{group_id}/calendar/best-dates
pub async fn group_best_dates(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
) -> HandlerResult<Recommendation> {
    let recommendation =
        db_services::group_best_dates(state.repository.as_ref(), &user.actor(), GroupId(group_id))
            .await?;
    Ok(Json(recommendation))
}

/// POST /api/calendar/best-dates
///
/// Stateless aggregation over feed records supplied by the client.
pub async fn best_dates(Json(records): Json<Vec<EventRecord>>) -> HandlerResult<Recommendation> {
    let recommendation = services::best_dates(&records)?;
    tracing::debug!(
        records = records.len(),
        best_day_count = recommendation.best_day_count,
        "computed best dates"
    );
    Ok(Json(recommendation))
}

// =============================================================================
// Destination Catalog
// =============================================================================

/// GET /api/destinations
pub async fn list_destinations(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(params): Query<DestinationsParams>,
) -> HandlerResult<DestinationPage> {
    let query = DestinationQuery::from(params);
    let page =
        db_services::list_destinations(state.repository.as_ref(), &query, viewer.id()).await?;
    Ok(Json(page))
}

/// GET /api/destinations/random
pub async fn random_destinations(
    State(state): State<AppState>,
) -> HandlerResult<Vec<Destination>> {
    let picks = db_services::random_destinations(state.repository.as_ref()).await?;
    Ok(Json(picks))
}

/// GET /api/destinations/{dest_id}
pub async fn get_destination(
    State(state): State<AppState>,
    Path(dest_id): Path<i64>,
) -> HandlerResult<Destination> {
    let destination =
        db_services::get_destination(state.repository.as_ref(), DestinationId(dest_id)).await?;
    Ok(Json(destination))
}

/// POST /api/destinations
///
/// Admin upsert; `dest_id` in the body selects update over insert.
pub async fn save_destination(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<DestinationInput>,
) -> HandlerResult<SavedDestinationResponse> {
    let updating = input.dest_id.is_some();
    let saved =
        db_services::save_destination(state.repository.as_ref(), &user.actor(), &input).await?;

    let message = if updating {
        "Destination updated"
    } else {
        "Destination created"
    };
    Ok(Json(SavedDestinationResponse {
        message: message.to_string(),
        dest_id: saved.dest_id,
        image_url: saved.images,
    }))
}

/// DELETE /api/destinations/{dest_id}
pub async fn delete_destination(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(dest_id): Path<i64>,
) -> HandlerResult<MessageResponse> {
    db_services::delete_destination(
        state.repository.as_ref(),
        &user.actor(),
        DestinationId(dest_id),
    )
    .await?;
    Ok(Json(MessageResponse::new("Destination deleted")))
}

// =============================================================================
// Favourites
// =============================================================================

/// GET /api/user/favourites
pub async fn list_favourites(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<Vec<Destination>> {
    let favourites = db_services::list_favourites(state.repository.as_ref(), user.id()).await?;
    Ok(Json(favourites))
}

/// POST /api/user/favourites
pub async fn add_favourite(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<FavouriteRequest>,
) -> HandlerResult<MessageResponse> {
    let dest_id = request
        .destination_id
        .ok_or_else(|| AppError::BadRequest("destinationId is required".into()))?;
    let added = db_services::add_favourite(state.repository.as_ref(), user.id(), dest_id).await?;

    let message = if added {
        "Added to favourites"
    } else {
        "Already added"
    };
    Ok(Json(MessageResponse::new(message)))
}

/// DELETE /api/user/favourites/{dest_id}
pub async fn remove_favourite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(dest_id): Path<i64>,
) -> HandlerResult<MessageResponse> {
    db_services::remove_favourite(state.repository.as_ref(), user.id(), DestinationId(dest_id))
        .await?;
    Ok(Json(MessageResponse::new("Removed from favourites")))
}

// =============================================================================
// Groups
// =============================================================================

/// GET /api/user/groups
pub async fn list_groups(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<Vec<GroupSummary>> {
    let groups = db_services::list_groups(state.repository.as_ref(), user.id()).await?;
    Ok(Json(groups))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<GroupNameRequest>,
) -> HandlerResult<GroupCreated> {
    let group =
        db_services::create_group(state.repository.as_ref(), &user.actor(), &request.name)
            .await?;
    Ok(Json(GroupCreated {
        success: true,
        group_id: group.group_id,
    }))
}

/// GET /api/groups/{group_id}
pub async fn group_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
) -> HandlerResult<GroupDetail> {
    let detail =
        db_services::group_detail(state.repository.as_ref(), &user.actor(), GroupId(group_id))
            .await?;
    Ok(Json(detail))
}

/// PUT /api/groups/{group_id}
pub async fn rename_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
    Json(request): Json<GroupNameRequest>,
) -> HandlerResult<SuccessResponse> {
    db_services::rename_group(
        state.repository.as_ref(),
        &user.actor(),
        GroupId(group_id),
        &request.name,
    )
    .await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/groups/{group_id}
pub async fn delete_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
) -> HandlerResult<SuccessResponse> {
    db_services::delete_group(state.repository.as_ref(), &user.actor(), GroupId(group_id))
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Invitations
// =============================================================================

/// POST /api/groups/{group_id}/invite
pub async fn invite_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
    Json(request): Json<InviteRequest>,
) -> HandlerResult<MessageResponse> {
    let invite = db_services::invite_member(
        state.repository.as_ref(),
        state.mailer.as_ref(),
        state.invite_settings(),
        &user.actor(),
        GroupId(group_id),
        &request.email,
    )
    .await?;
    Ok(Json(MessageResponse::new(format!(
        "Invitation sent to {}",
        invite.email
    ))))
}

/// GET /api/join?token=
pub async fn join_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<JoinParams>,
) -> HandlerResult<JoinResponse> {
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing invite token".into()))?;
    let group_id = db_services::join_group(state.repository.as_ref(), &user.actor(), &token).await?;
    Ok(Json(JoinResponse {
        message: "Joined group".to_string(),
        group_id,
    }))
}

// =============================================================================
// Trips & Votes
// =============================================================================

/// POST /api/groups/{group_id}/recommend
pub async fn share_trip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
    Json(request): Json<ShareTripRequest>,
) -> HandlerResult<SharedTrip> {
    let dest_id = request
        .destination_id
        .ok_or_else(|| AppError::BadRequest("destination_id is required".into()))?;
    let trip = db_services::share_trip(
        state.repository.as_ref(),
        &user.actor(),
        GroupId(group_id),
        dest_id,
    )
    .await?;
    Ok(Json(trip))
}

/// GET /api/groups/{group_id}/trips
pub async fn list_trips(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
) -> HandlerResult<Vec<TripSummary>> {
    let trips =
        db_services::list_trips(state.repository.as_ref(), &user.actor(), GroupId(group_id))
            .await?;
    Ok(Json(trips))
}

/// DELETE /api/groups/{group_id}/trips/{trip_ref_id}
pub async fn remove_trip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((group_id, trip_ref_id)): Path<(i64, i64)>,
) -> HandlerResult<SuccessResponse> {
    db_services::remove_trip(
        state.repository.as_ref(),
        &user.actor(),
        GroupId(group_id),
        TripRefId(trip_ref_id),
    )
    .await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/groups/vote
pub async fn toggle_vote(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<VoteRequest>,
) -> HandlerResult<VoteResponse> {
    let trip_ref_id = request
        .trip_ref_id
        .ok_or_else(|| AppError::BadRequest("tripRefId is required".into()))?;
    let action =
        db_services::toggle_vote(state.repository.as_ref(), &user.actor(), trip_ref_id).await?;
    Ok(Json(VoteResponse { action }))
}

/// GET /api/groups/{group_id}/ai-recommend
pub async fn group_recommendations(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<i64>,
) -> HandlerResult<Vec<ScoredDestination>> {
    let ranked = db_services::group_recommendations(
        state.repository.as_ref(),
        &user.actor(),
        GroupId(group_id),
    )
    .await?;
    Ok(Json(ranked))
}
