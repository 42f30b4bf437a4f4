use chrono::NaiveDate;

/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole` as a percentage, or `None` when `whole` is absent or not positive.
pub fn pct_of(part: f64, whole: Option<f64>) -> Option<f64> {
    whole.filter(|w| *w > 0.0).map(|w| part / w * 100.0)
}

/// Describes `date` relative to `today`: "today", "yesterday", "N days ago"
/// or "in N days".
pub fn relative_day(date: NaiveDate, today: NaiveDate) -> String {
    match (today - date).num_days() {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        d if d > 1 => format!("{d} days ago"),
        d => format!("in {} days", -d),
    }
}
