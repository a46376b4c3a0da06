//! HTTP server module for the Aroov backend.
//!
//! This module provides an axum-based HTTP server that exposes the service
//! layer as a JSON REST API under `/api`, plus `/health`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                              │
//! │  - Identity from the x-user-id header (auth.rs)          │
//! │  - JSON serialization/deserialization                    │
//! │  - CORS, compression, error handling                     │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (db/services.rs, services/)               │
//! │  - Permissions and validation                            │
//! │  - Best dates, calendar feeds, suggestions               │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (db/)                                  │
//! │  - LocalRepository / PostgresRepository                  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use auth::{CurrentUser, MaybeUser};
pub use config::ServerConfig;
pub use error::AppError;
pub use router::create_router;
pub use state::AppState;
