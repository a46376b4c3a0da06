//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Universities & profile
        .route("/universities", get(handlers::list_universities))
        .route("/user/me", get(handlers::me))
        .route(
            "/user/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        // Personal calendar
        .route("/user/calendar", get(handlers::user_calendar))
        .route("/user/availability", post(handlers::add_availability))
        .route("/user/availability/{id}", delete(handlers::delete_availability))
        .route("/calendar/best-dates", post(handlers::best_dates))
        // Catalog
        .route(
            "/destinations",
            get(handlers::list_destinations).post(handlers::save_destination),
        )
        .route("/destinations/random", get(handlers::random_destinations))
        .route(
            "/destinations/{dest_id}",
            get(handlers::get_destination).delete(handlers::delete_destination),
        )
        // Favourites
        .route(
            "/user/favourites",
            get(handlers::list_favourites).post(handlers::add_favourite),
        )
        .route("/user/favourites/{dest_id}", delete(handlers::remove_favourite))
        // Groups
        .route("/user/groups", get(handlers::list_groups))
        .route("/groups", post(handlers::create_group))
        .route("/groups/vote", post(handlers::toggle_vote))
        .route(
            "/groups/{group_id}",
            get(handlers::group_detail)
                .put(handlers::rename_group)
                .delete(handlers::delete_group),
        )
        .route("/groups/{group_id}/invite", post(handlers::invite_member))
        .route("/join", get(handlers::join_group))
        // Trips
        .route("/groups/{group_id}/recommend", post(handlers::share_trip))
        .route("/groups/{group_id}/trips", get(handlers::list_trips))
        .route(
            "/groups/{group_id}/trips/{trip_ref_id}",
            delete(handlers::remove_trip),
        )
        // Group calendar & suggestions
        .route("/groups/{group_id}/calendar", get(handlers::group_calendar))
        .route(
            "/groups/{group_id}/calendar/best-dates",
            get(handlers::group_best_dates),
        )
        .route(
            "/groups/{group_id}/ai-recommend",
            get(handlers::group_recommendations),
        );

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::db::repositories::LocalRepository;
    use crate::db::repository::FullRepository;

    fn app(repo: Arc<LocalRepository>) -> Router {
        create_router(AppState::new(repo as Arc<dyn FullRepository>))
    }

    #[tokio::test]
    async fn test_health_reports_database_state() {
        let repo = Arc::new(LocalRepository::new());
        let response = app(repo.clone())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], "connected");

        repo.set_healthy(false);
        let response = app(repo)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["database"], "disconnected");
    }

    #[tokio::test]
    async fn test_protected_route_requires_identity() {
        let response = app(Arc::new(LocalRepository::new()))
            .oneshot(Request::get("/api/user/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_user_is_unauthorized() {
        let response = app(Arc::new(LocalRepository::new()))
            .oneshot(
                Request::get("/api/user/profile")
                    .header("x-user-id", "999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
