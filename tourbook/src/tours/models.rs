//! Tour data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::{TourError, TourResult};
use crate::auth::{User, UserId};
use crate::reviews::RatingStats;

/// Tour ID type
pub type TourId = i64;

/// Average shown for a tour nobody has reviewed yet
pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

const NAME_MIN_CHARS: usize = 10;
const NAME_MAX_CHARS: usize = 40;

/// Tour difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "difficult" => Ok(Difficulty::Difficult),
            other => Err(format!(
                "difficulty is either: easy, medium, difficult (got '{other}')"
            )),
        }
    }
}

/// Denormalized review summary stored on a tour.
///
/// Derived data: recomputed from the tour's reviews by the rating aggregator and never
/// written by clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub quantity: i64,
    pub average: f64,
}

impl RatingSummary {
    /// Summary for a tour without reviews
    pub const fn empty() -> Self {
        Self {
            quantity: 0,
            average: DEFAULT_RATINGS_AVERAGE,
        }
    }

    /// Build a summary from an aggregate over the tour's reviews
    pub fn from_stats(stats: Option<RatingStats>) -> Self {
        match stats {
            Some(stats) if stats.count > 0 => Self {
                quantity: stats.count,
                average: round_to_tenth(stats.mean),
            },
            _ => Self::empty(),
        }
    }
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self::empty()
    }
}

/// Round half away from zero to one decimal place (4.666 -> 4.7, 4.45 -> 4.5)
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Tour model
#[derive(Debug, Clone, Serialize)]
pub struct Tour {
    pub id: TourId,
    pub name: String,
    pub slug: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    /// Guides leading this tour, in display order
    pub guide_ids: Vec<UserId>,
    pub secret: bool,
    pub ratings: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl Tour {
    pub fn duration_weeks(&self) -> f64 {
        f64::from(self.duration) / 7.0
    }

    /// The editable fields of this tour, as a draft
    pub fn to_draft(&self) -> TourDraft {
        TourDraft {
            name: self.name.clone(),
            duration: self.duration,
            max_group_size: self.max_group_size,
            difficulty: self.difficulty,
            price: self.price,
            price_discount: self.price_discount,
            summary: self.summary.clone(),
            description: self.description.clone(),
            image_cover: self.image_cover.clone(),
            images: self.images.clone(),
            start_dates: self.start_dates.clone(),
            guide_ids: self.guide_ids.clone(),
            secret: self.secret,
        }
    }
}

/// A tour with its guides resolved to accounts
///
/// Guides that were deactivated or deleted are left out.
#[derive(Debug, Clone, Serialize)]
pub struct TourDetails {
    #[serde(flatten)]
    pub tour: Tour,
    pub guides: Vec<User>,
}

/// Unvalidated tour input as it arrives from a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourDraft {
    pub name: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub guide_ids: Vec<UserId>,
    #[serde(default)]
    pub secret: bool,
}

/// Partial tour update; unset fields keep their stored value.
///
/// The rating summary is not part of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TourChanges {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub price: Option<f64>,
    pub price_discount: Option<f64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
    pub guide_ids: Option<Vec<UserId>>,
    pub secret: Option<bool>,
}

impl TourChanges {
    /// Overlay the provided fields on `draft`
    pub fn apply(self, mut draft: TourDraft) -> TourDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(duration) = self.duration {
            draft.duration = duration;
        }
        if let Some(max_group_size) = self.max_group_size {
            draft.max_group_size = max_group_size;
        }
        if let Some(difficulty) = self.difficulty {
            draft.difficulty = difficulty;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(summary) = self.summary {
            draft.summary = summary;
        }
        if let Some(image_cover) = self.image_cover {
            draft.image_cover = image_cover;
        }
        if let Some(images) = self.images {
            draft.images = images;
        }
        if let Some(start_dates) = self.start_dates {
            draft.start_dates = start_dates;
        }
        if let Some(guide_ids) = self.guide_ids {
            draft.guide_ids = guide_ids;
        }
        if let Some(secret) = self.secret {
            draft.secret = secret;
        }
        if self.price_discount.is_some() {
            draft.price_discount = self.price_discount;
        }
        if self.description.is_some() {
            draft.description = self.description;
        }
        draft
    }
}

/// A tour that passed construction checks and is ready to insert
#[derive(Debug, Clone)]
pub struct NewTour {
    draft: TourDraft,
    slug: String,
}

impl NewTour {
    /// Validate a draft
    ///
    /// Names and summaries are trimmed before checks.
    ///
    /// # Errors
    ///
    /// * `TourError::Validation` - Any field violates its constraint
    pub fn new(mut draft: TourDraft) -> TourResult<Self> {
        draft.name = draft.name.trim().to_string();
        draft.summary = draft.summary.trim().to_string();
        draft.description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let name_len = draft.name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            return Err(TourError::Validation(format!(
                "A tour name must have between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
            )));
        }
        if draft.duration <= 0 {
            return Err(TourError::Validation("A tour must have a duration".to_string()));
        }
        if draft.max_group_size <= 0 {
            return Err(TourError::Validation("A tour must have a group size".to_string()));
        }
        if !(draft.price.is_finite() && draft.price > 0.0) {
            return Err(TourError::Validation("A tour must have a price".to_string()));
        }
        if let Some(discount) = draft.price_discount {
            if !(discount.is_finite() && discount >= 0.0 && discount < draft.price) {
                return Err(TourError::Validation(format!(
                    "Discount price ({discount}) should be below the regular price"
                )));
            }
        }
        if draft.summary.is_empty() {
            return Err(TourError::Validation("A tour must have a summary".to_string()));
        }
        if draft.image_cover.trim().is_empty() {
            return Err(TourError::Validation("A tour must have a cover image".to_string()));
        }
        if draft.images.iter().any(|image| image.trim().is_empty()) {
            return Err(TourError::Validation("Image names can not be blank".to_string()));
        }
        draft.start_dates.sort();
        let mut seen = Vec::with_capacity(draft.guide_ids.len());
        for id in &draft.guide_ids {
            if seen.contains(id) {
                return Err(TourError::Validation(format!("Guide {id} is listed twice")));
            }
            seen.push(*id);
        }

        let slug = slugify(&draft.name);
        Ok(Self { draft, slug })
    }

    pub fn draft(&self) -> &TourDraft {
        &self.draft
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }
}

/// Lowercase, with each run of non-alphanumeric characters collapsed to one dash
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TourDraft {
        TourDraft {
            name: "The Forest Hiker".to_string(),
            duration: 5,
            max_group_size: 25,
            difficulty: Difficulty::Easy,
            price: 397.0,
            price_discount: None,
            summary: "Breathtaking hike through the Canadian Banff National Park".to_string(),
            description: None,
            image_cover: "tour-1-cover.jpg".to_string(),
            images: vec!["tour-1-1.jpg".to_string(), "tour-1-2.jpg".to_string()],
            start_dates: Vec::new(),
            guide_ids: vec![3, 7],
            secret: false,
        }
    }

    #[test]
    fn test_new_tour_derives_slug() {
        let tour = NewTour::new(draft()).unwrap();
        assert_eq!(tour.slug(), "the-forest-hiker");
    }

    #[test]
    fn test_name_is_trimmed_before_length_check() {
        let mut d = draft();
        d.name = "   Short   ".to_string();
        assert!(matches!(NewTour::new(d), Err(TourError::Validation(_))));

        let mut d = draft();
        d.name = "  The Sea Explorer  ".to_string();
        assert_eq!(NewTour::new(d).unwrap().draft().name, "The Sea Explorer");
    }

    #[test]
    fn test_discount_must_be_below_price() {
        let mut d = draft();
        d.price_discount = Some(397.0);
        assert!(matches!(NewTour::new(d), Err(TourError::Validation(_))));

        let mut d = draft();
        d.price_discount = Some(100.0);
        assert!(NewTour::new(d).is_ok());
    }

    #[test]
    fn test_duplicate_guide_rejected() {
        let mut d = draft();
        d.guide_ids = vec![3, 7, 3];
        assert!(matches!(NewTour::new(d), Err(TourError::Validation(_))));
    }

    #[test]
    fn test_start_dates_are_sorted() {
        let later = Utc::now();
        let earlier = later - chrono::Duration::days(30);
        let mut d = draft();
        d.start_dates = vec![later, earlier];
        assert_eq!(NewTour::new(d).unwrap().draft().start_dates, vec![earlier, later]);
    }

    #[test]
    fn test_changes_overlay_only_provided_fields() {
        let changes = TourChanges {
            price: Some(497.0),
            price_discount: Some(450.0),
            guide_ids: Some(vec![9]),
            ..TourChanges::default()
        };
        let merged = changes.apply(draft());
        assert_eq!(merged.price, 497.0);
        assert_eq!(merged.price_discount, Some(450.0));
        assert_eq!(merged.guide_ids, vec![9]);
        assert_eq!(merged.name, "The Forest Hiker");
        assert_eq!(merged.images.len(), 2);
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let mut d = draft();
        d.price = 0.0;
        assert!(NewTour::new(d).is_err());
    }

    #[test]
    fn test_summary_from_stats() {
        assert_eq!(RatingSummary::from_stats(None), RatingSummary::empty());
        assert_eq!(
            RatingSummary::from_stats(Some(RatingStats { count: 3, mean: 14.0 / 3.0 })),
            RatingSummary { quantity: 3, average: 4.7 }
        );
        assert_eq!(
            RatingSummary::from_stats(Some(RatingStats { count: 0, mean: 0.0 })),
            RatingSummary::empty()
        );
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(4.0), 4.0);
        assert_eq!(round_to_tenth(4.25), 4.3);
        assert_eq!(round_to_tenth(3.333_333), 3.3);
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("The Snow  Adventurer!"), "the-snow-adventurer");
        assert_eq!(slugify("--Wine & Dine--"), "wine-dine");
    }

    #[test]
    fn test_duration_weeks() {
        let tour = Tour {
            id: 1,
            name: "The Forest Hiker".to_string(),
            slug: "the-forest-hiker".to_string(),
            duration: 14,
            max_group_size: 10,
            difficulty: Difficulty::Medium,
            price: 997.0,
            price_discount: None,
            summary: "summary".to_string(),
            description: None,
            image_cover: "cover.jpg".to_string(),
            images: Vec::new(),
            start_dates: Vec::new(),
            guide_ids: Vec::new(),
            secret: false,
            ratings: RatingSummary::empty(),
            created_at: Utc::now(),
        };
        assert_eq!(tour.duration_weeks(), 2.0);
    }
}
