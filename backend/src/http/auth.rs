//! Request identity.
//!
//! Sign-in happens upstream; the auth proxy forwards the session's user id in
//! the `x-user-id` header. The user is always reloaded from the repository so
//! roles come from storage, never from the request.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::AppError;
use super::state::AppState;
use crate::api::{Actor, User, UserId};
use crate::db::repository::RepositoryError;
use crate::db::services;

pub const USER_ID_HEADER: &str = "x-user-id";

/// `Ok(None)` when the header is absent, `Err` when it is not an id.
fn header_user_id(parts: &Parts) -> Result<Option<UserId>, AppError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<UserId>().ok())
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Malformed user id".into()))
}

async fn load_user(state: &AppState, user_id: UserId) -> Result<User, AppError> {
    match services::get_user(state.repository.as_ref(), user_id).await {
        Ok(user) => Ok(user),
        Err(RepositoryError::NotFound { .. }) => {
            Err(AppError::Unauthorized("Unknown user".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// The signed-in user. Rejects with 401 when there is none.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }

    pub fn id(&self) -> UserId {
        self.0.user_id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = header_user_id(parts)?
            .ok_or_else(|| AppError::Unauthorized("Login required".into()))?;
        let user = load_user(state, user_id).await?;
        Ok(CurrentUser(user))
    }
}

/// The signed-in user if there is a valid one; never rejects on identity.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(|u| u.user_id)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(Some(user_id)) = header_user_id(parts) else {
            return Ok(MaybeUser(None));
        };
        match load_user(state, user_id).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized(_)) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}
