//! # Tourbook
//!
//! Core of a tour-booking backend: user credentials and sessions, a tour catalog, and
//! reviews whose ratings are kept summarized on each tour.
//!
//! ## Core Modules
//!
//! - [`auth`]: Password hashing, reset tokens, bearer tokens and the account flows built
//!   on them
//! - [`tours`]: Tours with construction-time validation and their rating summary
//! - [`reviews`]: Review writes, the hook protocol around them, and rating aggregation
//! - [`db`]: Repository traits with explicit visibility scopes, PostgreSQL and
//!   in-memory implementations
//! - [`notify`]: Out-of-band delivery of reset tokens
//! - [`config`]: Environment parsing shared by configuration structs
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tourbook::db::MemoryStore;
//! use tourbook::reviews::{RatingAggregator, ReviewService};
//! use tourbook::tours::TourCatalog;
//!
//! let store = MemoryStore::new();
//! let catalog = TourCatalog::new(Arc::new(store.clone()), Arc::new(store.clone()));
//! let aggregator = RatingAggregator::new(Arc::new(store.clone()), Arc::new(store.clone()));
//! let reviews = ReviewService::new(Arc::new(store.clone()), Arc::new(store))
//!     .with_hook(Arc::new(aggregator));
//! # let _ = (catalog, reviews);
//! ```

/// Credentials, sessions and account flows.
pub mod auth;

/// Configuration errors and environment helpers.
pub mod config;

/// Persistence layer.
pub mod db;

/// Notification delivery.
pub mod notify;

/// Reviews and rating aggregation.
pub mod reviews;

/// Tour catalog.
pub mod tours;

pub use auth::{AuthError, AuthManager, CredentialStore, User};
pub use config::ConfigError;
pub use reviews::{RatingAggregator, ReviewError, ReviewService};
pub use tours::{RatingSummary, Tour, TourCatalog};
