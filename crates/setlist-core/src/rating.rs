//! Ratings (one user's 1–5 score for one track) and their aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, user::UserId};

/// A validated score in `1..=5`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
  pub const MAX: u8 = 5;
  pub const MIN: u8 = 1;

  pub fn new(value: i64) -> Result<Self> {
    if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(Error::ScoreOutOfRange(value))
    }
  }

  pub fn get(self) -> u8 { self.0 }
}

impl TryFrom<i64> for Score {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> { Self::new(value) }
}

impl From<Score> for u8 {
  fn from(s: Score) -> Self { s.0 }
}

impl std::fmt::Display for Score {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A stored rating. At most one exists per `(track_id, user_id)` pair; a
/// resubmission overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
  pub track_id: Uuid,
  pub user_id:  UserId,
  pub score:    Score,
  pub rated_at: DateTime<Utc>,
}

/// Arithmetic mean of `ratings`, or `None` when there are none. An absent
/// aggregate is distinct from any committed score.
pub fn mean_score(ratings: &[Rating]) -> Option<f64> {
  if ratings.is_empty() {
    return None;
  }
  let total: u32 = ratings.iter().map(|r| u32::from(r.score.get())).sum();
  Some(f64::from(total) / ratings.len() as f64)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rating(user: &str, score: i64) -> Rating {
    Rating {
      track_id: Uuid::nil(),
      user_id:  UserId::new(user),
      score:    Score::new(score).unwrap(),
      rated_at: Utc::now(),
    }
  }

  #[test]
  fn score_bounds() {
    assert!(Score::new(0).is_err());
    assert!(Score::new(6).is_err());
    assert_eq!(Score::new(1).unwrap().get(), 1);
    assert_eq!(Score::new(5).unwrap().get(), 5);
  }

  #[test]
  fn score_deserialises_with_validation() {
    let ok: Score = serde_json::from_str("4").unwrap();
    assert_eq!(ok.get(), 4);
    assert!(serde_json::from_str::<Score>("9").is_err());
  }

  #[test]
  fn mean_of_nothing_is_absent() {
    assert_eq!(mean_score(&[]), None);
  }

  #[test]
  fn mean_of_two_ratings() {
    let avg = mean_score(&[rating("u1", 5), rating("u2", 3)]);
    assert_eq!(avg, Some(4.0));
  }

  #[test]
  fn mean_keeps_fraction() {
    let avg = mean_score(&[rating("u1", 4), rating("u2", 3)]).unwrap();
    assert!((avg - 3.5).abs() < f64::EPSILON);
  }
}
