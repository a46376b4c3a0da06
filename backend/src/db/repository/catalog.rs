//! Repository trait for the destination catalog and favourites.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    Destination, DestinationId, DestinationInput, DestinationPage, DestinationQuery, UserId,
};

/// Repository trait for destinations.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ==================== Destinations ====================

    /// One page of the catalog, newest first.
    ///
    /// The page count is computed over the same filter as the rows.
    /// `viewer` decides the `is_liked` flag; anonymous viewers see `false`.
    async fn list_destinations(
        &self,
        query: &DestinationQuery,
        viewer: Option<UserId>,
    ) -> RepositoryResult<DestinationPage>;

    /// Up to `limit` destinations in random order.
    async fn random_destinations(&self, limit: usize) -> RepositoryResult<Vec<Destination>>;

    /// Every destination, newest first.
    async fn all_destinations(&self) -> RepositoryResult<Vec<Destination>>;

    /// Fetch a destination, or `NotFound`.
    async fn get_destination(&self, dest_id: DestinationId) -> RepositoryResult<Destination>;

    /// Insert a destination; any id in `input` is ignored.
    async fn create_destination(&self, input: &DestinationInput)
        -> RepositoryResult<Destination>;

    /// Replace every field of an existing destination, or `NotFound`.
    async fn update_destination(
        &self,
        dest_id: DestinationId,
        input: &DestinationInput,
    ) -> RepositoryResult<Destination>;

    /// Delete a destination together with favourites and shared trips that
    /// reference it, or `NotFound`.
    async fn delete_destination(&self, dest_id: DestinationId) -> RepositoryResult<()>;

    // ==================== Favourites ====================

    /// Mark a destination as a favourite.
    ///
    /// # Returns
    /// * `Ok(true)` - Newly added
    /// * `Ok(false)` - Already a favourite
    async fn add_favourite(&self, user_id: UserId, dest_id: DestinationId)
        -> RepositoryResult<bool>;

    /// Returns whether a favourite was removed.
    async fn remove_favourite(
        &self,
        user_id: UserId,
        dest_id: DestinationId,
    ) -> RepositoryResult<bool>;

    /// Favourite destinations of a user, most recently added first.
    async fn list_favourites(&self, user_id: UserId) -> RepositoryResult<Vec<Destination>>;
}
