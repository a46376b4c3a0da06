//! Repository trait for accounts, profiles and universities.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{NewUser, ProfileUpdate, University, UniversityId, User, UserId};

/// Repository trait for users and universities.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Check if the storage backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Users ====================

    /// Insert a new user with the default role and an empty profile.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If the email is already registered
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User>;

    /// Fetch a user by id, or `NotFound`.
    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User>;

    /// Fetch several users at once. Unknown ids are skipped.
    async fn get_users(&self, user_ids: &[UserId]) -> RepositoryResult<Vec<User>>;

    /// Look a user up by email (exact, case-insensitive).
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Overwrite the profile fields of a user.
    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> RepositoryResult<User>;

    // ==================== Universities ====================

    /// All universities ordered by name.
    async fn list_universities(&self) -> RepositoryResult<Vec<University>>;

    async fn add_university(&self, name: &str) -> RepositoryResult<University>;

    async fn get_university(
        &self,
        university_id: UniversityId,
    ) -> RepositoryResult<Option<University>>;
}
