//! Repository trait definitions for database operations.
//!
//! Storage is split into focused traits, one per area of the application:
//!
//! - [`error`]: Error types for repository operations
//! - [`users`]: Accounts, profiles and universities
//! - [`catalog`]: Destinations and favourites
//! - [`groups`]: Groups, memberships, invites, shared trips and votes
//! - [`calendar`]: Availability blocks and university schedules
//!
//! # Trait Composition
//!
//! A complete backend implements all four traits:
//!
//! ```ignore
//! impl UserRepository for MyRepo { ... }
//! impl CatalogRepository for MyRepo { ... }
//! impl GroupRepository for MyRepo { ... }
//! impl CalendarRepository for MyRepo { ... }
//! ```
//!
//! Functions that need every capability take the [`FullRepository`] bound:
//!
//! ```ignore
//! async fn group_best_dates<R: FullRepository + ?Sized>(repo: &R, group: GroupId) -> RepositoryResult<Recommendation> {
//!     let members = repo.list_members(group).await?;
//!     let ids: Vec<_> = members.iter().map(|m| m.user_id).collect();
//!     let blocks = repo.list_availability_for_users(&ids).await?;
//!     Ok(best_dates_for_events(&blocks))
//! }
//! ```

pub mod calendar;
pub mod catalog;
pub mod error;
pub mod groups;
pub mod users;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use calendar::CalendarRepository;
pub use catalog::CatalogRepository;
pub use groups::GroupRepository;
pub use users::UserRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements all four
/// repository traits.
pub trait FullRepository:
    UserRepository + CatalogRepository + GroupRepository + CalendarRepository
{
}

impl<T> FullRepository for T where
    T: UserRepository + CatalogRepository + GroupRepository + CalendarRepository
{
}
