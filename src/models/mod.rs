pub mod exercise;
pub mod profile;
pub mod training;

pub use exercise::Exercise;
pub use profile::{AthleteCard, Profile};
pub use training::{
  CompletedExercise, LoggedSet, NewTrainingPlan, StoredPlanExercise, TrainingPlan,
  TrainingPlanExercise, TrainingPlanRow,
};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Dates are exchanged with the backend (and compared) as `yyyy-MM-dd`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// ---------------------------------------------------------------------------
/// Boundary deserializers
/// ---------------------------------------------------------------------------
///
/// PostgREST rows come back with whatever the column holds: uuid or bigint
/// ids, nulls in text columns, numbers typed into free-form inputs as strings.
/// These helpers normalize those shapes as the row is decoded.

pub(crate) mod de {
  use super::*;
  use serde_json::Value;

  /// Accepts a string or a number and yields its string form.
  pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Value::deserialize(deserializer)? {
      Value::String(s) => Ok(s),
      Value::Number(n) => Ok(n.to_string()),
      other => Err(serde::de::Error::custom(format!("expected id, got {}", other))),
    }
  }

  /// Like [`id`] but null, missing and empty values become `None`.
  pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(match Value::deserialize(deserializer)? {
      Value::String(s) if !s.is_empty() => Some(s),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    })
  }

  /// Set/rep counts: numbers or numeric strings, clamped at zero.
  /// Anything unreadable counts as zero.
  pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
      Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
      Value::String(s) => s.trim().parse::<i64>().ok(),
      _ => None,
    };
    Ok(parsed.map(|n| n.clamp(0, u32::MAX as i64) as u32).unwrap_or(0))
  }

  pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
  where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
  {
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
  }
}
