// server/src/models/review.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A star rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn value(&self) -> u8 {
    self.0
  }
}

impl TryFrom<i64> for Rating {
  type Error = AppError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    if (Rating::MIN as i64..=Rating::MAX as i64).contains(&value) {
      Ok(Rating(value as u8))
    } else {
      Err(AppError::Validation(format!(
        "Rating must be between {} and {}, got {}",
        Rating::MIN,
        Rating::MAX,
        value
      )))
    }
  }
}

impl From<Rating> for u8 {
  fn from(rating: Rating) -> Self {
    rating.0
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
  pub review_id: i64,
  pub booking_id: i64,
  pub client_id: i64,
  pub giver_id: i64,
  pub rating: Rating,
  pub comment: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input of the review upsert. `booking_id` is the conflict key.
#[derive(Debug, Clone)]
pub struct NewReview {
  pub booking_id: i64,
  pub client_id: i64,
  pub giver_id: i64,
  pub rating: Rating,
  pub comment: Option<String>,
}

/// Reviews of one giver with their average rating.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiverReviews {
  pub giver_id: i64,
  pub average_rating: Option<f64>,
  pub review_count: usize,
  pub reviews: Vec<Review>,
}

impl GiverReviews {
  pub fn new(giver_id: i64, reviews: Vec<Review>) -> Self {
    let average_rating = if reviews.is_empty() {
      None
    } else {
      let total: u32 = reviews.iter().map(|r| u32::from(r.rating.value())).sum();
      Some(f64::from(total) / reviews.len() as f64)
    };
    Self {
      giver_id,
      average_rating,
      review_count: reviews.len(),
      reviews,
    }
  }
}
