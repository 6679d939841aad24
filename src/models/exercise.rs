use serde::{Deserialize, Serialize};

use super::de;

/// A named movement in the shared catalog (`exercises` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
  #[serde(deserialize_with = "de::id")]
  pub id: String,
  #[serde(default, deserialize_with = "de::null_default")]
  pub name: String,
}

/// Insert payload for a new catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct NewExercise {
  pub name: String,
}

impl NewExercise {
  /// Returns `None` for names that are blank once trimmed.
  pub fn new(name: &str) -> Option<Self> {
    let name = name.trim();
    if name.is_empty() {
      None
    } else {
      Some(Self { name: name.to_string() })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_exercise_trims_and_rejects_blank() {
    assert_eq!(NewExercise::new("  Box Jump ").unwrap().name, "Box Jump");
    assert!(NewExercise::new("   ").is_none());
    assert!(NewExercise::new("").is_none());
  }
}
