//! Domain models shared by the repository, service and HTTP layers.

pub mod calendar;
pub mod catalog;
pub mod group;
pub mod macros;
pub mod user;

pub use calendar::*;
pub use catalog::*;
pub use group::*;
pub use user::*;
