//! Likelihood × impact scoring and severity bands
//!
//! Ratings are integers in `1..=5`; a score is their product and therefore
//! lies in `1..=25`. The band only selects a visual treatment.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest rating a likelihood or impact may take
pub const MIN_RATING: u8 = 1;
/// Highest rating a likelihood or impact may take
pub const MAX_RATING: u8 = 5;
/// Highest achievable score
pub const MAX_SCORE: u8 = MAX_RATING * MAX_RATING;

/// Scores at or above this are [`RiskLevel::Critical`]
pub const CRITICAL_THRESHOLD: u8 = 15;
/// Scores at or above this are [`RiskLevel::High`]
pub const HIGH_THRESHOLD: u8 = 9;
/// Scores at or above this are [`RiskLevel::Medium`]
pub const MEDIUM_THRESHOLD: u8 = 5;

/// A likelihood or impact rating, always in `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Rating 1
    pub const ONE: Rating = Rating(1);
    /// Rating 2
    pub const TWO: Rating = Rating(2);
    /// Rating 3
    pub const THREE: Rating = Rating(3);
    /// Rating 4
    pub const FOUR: Rating = Rating(4);
    /// Rating 5
    pub const FIVE: Rating = Rating(5);

    /// Validate a raw rating
    ///
    /// # Errors
    /// `ValidationError::OutOfRange` unless `value` is in `1..=5`
    #[inline]
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::out_of_range(
                "rating",
                i64::from(value),
                i64::from(MIN_RATING),
                i64::from(MAX_RATING),
            ))
        }
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Every valid rating, ascending
    pub fn all() -> impl Iterator<Item = Rating> {
        (MIN_RATING..=MAX_RATING).map(Rating)
    }
}

impl TryFrom<u8> for Rating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product of two ratings, always in `1..=25`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskScore(u8);

impl RiskScore {
    /// Validate a raw score
    ///
    /// # Errors
    /// `ValidationError::OutOfRange` unless `value` is in `1..=25`
    #[inline]
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (1..=MAX_SCORE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::out_of_range(
                "score",
                i64::from(value),
                1,
                i64::from(MAX_SCORE),
            ))
        }
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Severity band for this score
    #[inline]
    #[must_use]
    pub fn level(self) -> RiskLevel {
        classify(self)
    }
}

impl TryFrom<u8> for RiskScore {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RiskScore> for u8 {
    fn from(score: RiskScore) -> Self {
        score.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Score a likelihood/impact pair.
#[inline]
#[must_use]
pub fn score(likelihood: Rating, impact: Rating) -> RiskScore {
    RiskScore(likelihood.0 * impact.0)
}

/// A likelihood paired with an impact (the "initial" or "resultant" half of
/// an entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScorePair {
    /// How likely the harm is
    pub likelihood: Rating,
    /// How severe the harm is
    pub impact: Rating,
}

impl ScorePair {
    /// Create new pair
    #[inline]
    #[must_use]
    pub fn new(likelihood: Rating, impact: Rating) -> Self {
        Self { likelihood, impact }
    }

    /// Build from raw values
    ///
    /// # Errors
    /// If either value is outside `1..=5`
    pub fn from_raw(likelihood: u8, impact: u8) -> Result<Self, ValidationError> {
        let likelihood = Rating::new(likelihood).map_err(|_| {
            ValidationError::out_of_range("likelihood", i64::from(likelihood), 1, 5)
        })?;
        let impact = Rating::new(impact)
            .map_err(|_| ValidationError::out_of_range("impact", i64::from(impact), 1, 5))?;
        Ok(Self::new(likelihood, impact))
    }

    /// Score of this pair
    #[inline]
    #[must_use]
    pub fn score(&self) -> RiskScore {
        score(self.likelihood, self.impact)
    }

    /// Band of this pair's score
    #[inline]
    #[must_use]
    pub fn level(&self) -> RiskLevel {
        self.score().level()
    }
}

/// Display band for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// 1–4
    Low,
    /// 5–8
    Medium,
    /// 9–14
    High,
    /// 15–25
    Critical,
}

impl RiskLevel {
    /// Upper-case label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Colour used to render cells in this band
    #[inline]
    #[must_use]
    pub fn colour(self) -> &'static str {
        match self {
            RiskLevel::Low => "green",
            RiskLevel::Medium => "yellow",
            RiskLevel::High => "orange",
            RiskLevel::Critical => "red",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a score to its band.
#[must_use]
pub fn classify(score: RiskScore) -> RiskLevel {
    match score.0 {
        s if s >= CRITICAL_THRESHOLD => RiskLevel::Critical,
        s if s >= HIGH_THRESHOLD => RiskLevel::High,
        s if s >= MEDIUM_THRESHOLD => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: u8) -> RiskScore {
        RiskScore::new(value).unwrap()
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::all().count(), 5);
        assert_eq!(Rating::new(3).unwrap().value(), 3);
    }

    #[test]
    fn score_is_product() {
        let pair = ScorePair::from_raw(3, 4).unwrap();
        assert_eq!(pair.score().value(), 12);
        assert_eq!(pair.level(), RiskLevel::High);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(classify(s(25)), RiskLevel::Critical);
        assert_eq!(classify(s(15)), RiskLevel::Critical);
        assert_eq!(classify(s(14)), RiskLevel::High);
        assert_eq!(classify(s(9)), RiskLevel::High);
        assert_eq!(classify(s(8)), RiskLevel::Medium);
        assert_eq!(classify(s(5)), RiskLevel::Medium);
        assert_eq!(classify(s(4)), RiskLevel::Low);
        assert_eq!(classify(s(1)), RiskLevel::Low);
    }

    #[test]
    fn score_out_of_range_rejected() {
        assert!(RiskScore::new(0).is_err());
        assert!(RiskScore::new(26).is_err());
    }

    #[test]
    fn from_raw_names_the_bad_field() {
        let err = ScorePair::from_raw(3, 9).unwrap_err();
        assert_eq!(err.field(), "impact");
    }

    #[test]
    fn rating_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"CRITICAL\"");
    }
}
