//! # Aroov Backend
//!
//! REST backend for planning trips with friends: a destination catalog,
//! travel groups with shared trips and votes, personal and group
//! availability calendars, and best-date suggestions for the group.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Identifier newtypes and the public domain types
//! - [`models`]: Domain models shared by every layer
//! - [`db`]: Repository traits, Local/Postgres backends and the service layer
//! - [`services`]: Pure computations (best dates, calendar feeds, ranking)
//!   and the invitation mail seam
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! ## Best dates
//!
//! The core computation lives in [`services::availability`]: every
//! non-"Busy" availability block adds one to each day it covers, and the days
//! with the highest count are suggested once at least two members overlap.

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
