//! # Rating Module
//!
//! Provides the `Rating` type for a product's displayed average.
//!
//! ## Why Tenths?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  mean([4, 5, 5]) = 4.666666666666667                                    │
//! │  (4.666... * 10).round() / 10 = 4.7  ... usually                        │
//! │  4.45 as f64 = 4.4500000000000001776 → rounding depends on luck         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Tenths                                           │
//! │    sum = 14, count = 3                                                  │
//! │    tenths = (20 * sum + count) / (2 * count) = 283 / 6 = 47             │
//! │    47 tenths → 4.7, exactly, every time                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Rating` can only hold values in `[0.0, 5.0]` with one decimal digit.
//! In documents it is stored as a plain JSON number (`4.7`) so that other
//! readers of the catalog see the same field shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Review Score
// =============================================================================

/// A single review's star score (1 to 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReviewScore(u8);

impl ReviewScore {
    /// Lowest score a reviewer can give.
    pub const MIN: u8 = 1;

    /// Highest score a reviewer can give.
    pub const MAX: u8 = 5;

    /// Creates a score, returning `None` when outside 1..=5.
    pub fn new(stars: i64) -> Option<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&stars) {
            Some(ReviewScore(stars as u8))
        } else {
            None
        }
    }

    /// Creates a score, clamping out-of-range values into 1..=5.
    ///
    /// Used when reading stored reviews: a malformed score must still count
    /// towards `reviews` and must not push the average outside `[0, 5]`.
    pub fn clamped(stars: i64) -> Self {
        ReviewScore(stars.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    /// Returns the number of stars.
    #[inline]
    pub const fn stars(&self) -> u8 {
        self.0
    }
}

// =============================================================================
// Rating
// =============================================================================

/// A product rating in tenths of a star (`47` = 4.7 stars).
///
/// Exported to TypeScript as `number` at each use site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    /// Highest representable rating, in tenths.
    const MAX_TENTHS: u8 = 50;

    /// Rating of a product without reviews.
    #[inline]
    pub const fn zero() -> Self {
        Rating(0)
    }

    /// Creates a rating from tenths of a star. Values above 50 are clamped.
    #[inline]
    pub fn from_tenths(tenths: u8) -> Self {
        Rating(tenths.min(Self::MAX_TENTHS))
    }

    /// Creates a rating from a floating point value, rounding half-up to
    /// one decimal and clamping into `[0, 5]`. Non-finite input yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::rating::Rating;
    ///
    /// assert_eq!(Rating::from_f64(4.66).tenths(), 47);
    /// assert_eq!(Rating::from_f64(7.0).tenths(), 50);
    /// assert_eq!(Rating::from_f64(-1.0).tenths(), 0);
    /// ```
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Rating::zero();
        }
        let tenths = (value * 10.0 + 0.5).floor();
        Rating::from_tenths(tenths.min(Self::MAX_TENTHS as f64) as u8)
    }

    /// Computes the half-up rounded mean of `sum / count` in tenths.
    ///
    /// ## Formula
    /// `round_half_up(10 * sum / count) = floor((20 * sum + count) / (2 * count))`
    ///
    /// Returns zero when `count` is zero.
    pub fn mean(sum: u64, count: u64) -> Self {
        if count == 0 {
            return Rating::zero();
        }
        let tenths = (20 * sum + count) / (2 * count);
        Rating::from_tenths(tenths.min(Self::MAX_TENTHS as u64) as u8)
    }

    /// Returns the rating in tenths of a star.
    #[inline]
    pub const fn tenths(&self) -> u8 {
        self.0
    }

    /// Returns the rating as a float (for display and storage only).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Checks if the rating is zero (no reviews).
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Rating::from_f64(value))
    }
}

// =============================================================================
// Rating Summary
// =============================================================================

/// The pair of values the aggregator persists onto a product.
///
/// ## Invariant
/// `review_count == 0` implies `rating == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Average score, one decimal place.
    #[ts(type = "number")]
    pub rating: Rating,

    /// Number of reviews the average was computed from.
    pub review_count: u32,
}

impl RatingSummary {
    /// The summary of a product without reviews.
    pub const fn empty() -> Self {
        RatingSummary {
            rating: Rating::zero(),
            review_count: 0,
        }
    }

    /// Builds a summary from raw stored scores, clamping each into 1..=5.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::rating::RatingSummary;
    ///
    /// let summary = RatingSummary::from_scores([4, 5, 5]);
    /// assert_eq!(summary.rating.tenths(), 47);
    ///
    /// let empty = RatingSummary::from_scores(Vec::<i64>::new());
    /// assert_eq!(empty, RatingSummary::empty());
    /// ```
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let (sum, count) = scores
            .into_iter()
            .map(ReviewScore::clamped)
            .fold((0u64, 0u64), |(sum, count), score| {
                (sum + u64::from(score.stars()), count + 1)
            });

        RatingSummary {
            rating: Rating::mean(sum, count),
            review_count: u32::try_from(count).unwrap_or(u32::MAX),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
