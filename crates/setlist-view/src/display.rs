//! Formatting of aggregate ratings for display.

/// One decimal place, or `"No ratings"` when absent.
pub fn format_rating(rating: Option<f64>) -> String {
  match rating {
    Some(r) => format!("{r:.1}"),
    None => "No ratings".to_owned(),
  }
}

/// Five stars, filled up to the rounded mean.
pub fn stars(rating: f64) -> String {
  let filled = rating.round().clamp(0.0, 5.0) as usize;
  (0..5).map(|i| if i < filled { '★' } else { '☆' }).collect()
}
