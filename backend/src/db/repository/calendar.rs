//! Repository trait for availability blocks and university schedules.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{
    AvailabilityEvent, AvailabilityId, NewAvailability, NewUniversityEvent, UniversityId,
    UniversityScheduleEvent, UserId,
};

#[async_trait]
pub trait CalendarRepository: Send + Sync {
    /// Store a block. Callers validate `start_date < end_date` first.
    async fn add_availability(&self, block: &NewAvailability)
        -> RepositoryResult<AvailabilityEvent>;

    /// Delete a block owned by `owner`.
    ///
    /// Returns `false` when no such block exists for that owner.
    async fn delete_availability(
        &self,
        owner: UserId,
        id: AvailabilityId,
    ) -> RepositoryResult<bool>;

    /// Blocks of one user ordered by start date.
    async fn list_availability_for_user(
        &self,
        user_id: UserId,
    ) -> RepositoryResult<Vec<AvailabilityEvent>>;

    /// Blocks of several users ordered by start date.
    async fn list_availability_for_users(
        &self,
        user_ids: &[UserId],
    ) -> RepositoryResult<Vec<AvailabilityEvent>>;

    async fn add_university_event(
        &self,
        event: &NewUniversityEvent,
    ) -> RepositoryResult<UniversityScheduleEvent>;

    /// Schedule of a university ordered by start date.
    async fn list_university_events(
        &self,
        university_id: UniversityId,
    ) -> RepositoryResult<Vec<UniversityScheduleEvent>>;
}
