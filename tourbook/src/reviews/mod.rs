//! Reviews and the rating summary they feed.
//!
//! Every committed review write recomputes the owning tour's [`RatingSummary`] through
//! the [`RatingAggregator`] hook:
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourbook::db::MemoryStore;
//! use tourbook::reviews::{RatingAggregator, ReviewService};
//!
//! let store = MemoryStore::new();
//! let aggregator = RatingAggregator::new(Arc::new(store.clone()), Arc::new(store.clone()));
//! let service = ReviewService::new(Arc::new(store.clone()), Arc::new(store))
//!     .with_hook(Arc::new(aggregator));
//! # let _ = service;
//! ```
//!
//! [`RatingSummary`]: crate::tours::RatingSummary

pub mod aggregator;
pub mod errors;
pub mod hooks;
pub mod models;
pub mod service;

pub use aggregator::RatingAggregator;
pub use errors::{ReviewError, ReviewResult};
pub use hooks::{ReviewHooks, ReviewTarget};
pub use models::{
    MAX_RATING, MIN_RATING, NewReview, RatingStats, Review, ReviewChanges, ReviewId, ReviewPatch,
};
pub use service::ReviewService;
