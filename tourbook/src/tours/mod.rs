//! Tours and their denormalized rating summary.

pub mod catalog;
pub mod errors;
pub mod models;

pub use catalog::TourCatalog;
pub use errors::{TourError, TourResult};
pub use models::{
    DEFAULT_RATINGS_AVERAGE, Difficulty, NewTour, RatingSummary, Tour, TourChanges, TourDetails,
    TourDraft, TourId,
};
