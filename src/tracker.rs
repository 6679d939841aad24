//! Completion checkmarks and per-set logs for the athlete dashboard.
//!
//! State lives only on this device, keyed by user id. Every mutation writes
//! the user's full lists back to the store and only takes effect in memory
//! once that write succeeded. Concurrent writers race and the last write wins.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::local_store::{completed_key, logged_sets_key, LocalStore};
use crate::models::{CompletedExercise, LoggedSet, TrainingPlan};
use crate::supabase::SupabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetField {
  Reps,
  Weight,
}

/// Snapshot returned to the UI.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackerState {
  pub user_id: String,
  pub completed: Vec<CompletedExercise>,
  pub logged_sets: Vec<LoggedSet>,
  pub expanded: Vec<String>,
}

pub struct CompletionTracker<S: LocalStore> {
  store: S,
  user_id: String,
  completed: Vec<CompletedExercise>,
  logged_sets: Vec<LoggedSet>,
  /// Open accordion rows. Never persisted.
  expanded: HashSet<String>,
}

/// Parse a stored list, treating anything unreadable as empty.
fn parse_list<T: for<'de> Deserialize<'de>>(key: &str, raw: Option<String>) -> Vec<T> {
  let Some(raw) = raw else {
    return Vec::new();
  };

  match serde_json::from_str(&raw) {
    Ok(list) => list,
    Err(e) => {
      tracing::warn!(key, "ignoring malformed local state: {}", e);
      Vec::new()
    }
  }
}

impl<S: LocalStore> CompletionTracker<S> {
  pub async fn load(store: S, user_id: &str) -> Result<Self, SupabaseError> {
    let completed_raw = store.get(&completed_key(user_id)).await?;
    let logged_raw = store.get(&logged_sets_key(user_id)).await?;

    Ok(Self {
      completed: parse_list(&completed_key(user_id), completed_raw),
      logged_sets: parse_list(&logged_sets_key(user_id), logged_raw),
      store,
      user_id: user_id.to_string(),
      expanded: HashSet::new(),
    })
  }

  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  pub fn state(&self) -> TrackerState {
    let mut expanded: Vec<String> = self.expanded.iter().cloned().collect();
    expanded.sort();
    TrackerState {
      user_id: self.user_id.clone(),
      completed: self.completed.clone(),
      logged_sets: self.logged_sets.clone(),
      expanded,
    }
  }

  /// ---------------------------------------------------------------------------
  /// Completion
  /// ---------------------------------------------------------------------------

  /// Flip the done mark for an entry on a date. Returns the new mark.
  pub async fn toggle_exercise_completion(
    &mut self,
    exercise_id: &str,
    date: &str,
  ) -> Result<bool, SupabaseError> {
    let mut completed = self.completed.clone();
    completed.retain(|c| !(c.exercise_id == exercise_id && c.date == date));

    let now_completed = completed.len() == self.completed.len();
    if now_completed {
      completed.push(CompletedExercise {
        exercise_id: exercise_id.to_string(),
        date: date.to_string(),
      });
    }

    self.persist(&completed_key(&self.user_id), &completed).await?;
    self.completed = completed;
    Ok(now_completed)
  }

  pub fn is_exercise_completed(&self, exercise_id: &str, date: &str) -> bool {
    self
      .completed
      .iter()
      .any(|c| c.exercise_id == exercise_id && c.date == date)
  }

  /// ---------------------------------------------------------------------------
  /// Set Logging
  /// ---------------------------------------------------------------------------

  /// Record one field of one set; the other field is left as it was
  /// (or blank for a new record).
  pub async fn update_logged_set_value(
    &mut self,
    exercise_id: &str,
    date: &str,
    set_index: u32,
    field: SetField,
    value: &str,
  ) -> Result<(), SupabaseError> {
    let mut logged_sets = self.logged_sets.clone();
    let position = logged_sets
      .iter()
      .position(|s| s.exercise_id == exercise_id && s.date == date && s.set_index == set_index);

    let index = match position {
      Some(index) => index,
      None => {
        logged_sets.push(LoggedSet {
          exercise_id: exercise_id.to_string(),
          date: date.to_string(),
          set_index,
          reps: String::new(),
          weight: String::new(),
        });
        logged_sets.len() - 1
      }
    };

    let record = &mut logged_sets[index];
    match field {
      SetField::Reps => record.reps = value.to_string(),
      SetField::Weight => record.weight = value.to_string(),
    }

    self.persist(&logged_sets_key(&self.user_id), &logged_sets).await?;
    self.logged_sets = logged_sets;
    Ok(())
  }

  /// The value typed for a set, or empty when nothing was logged.
  pub fn logged_set_value(
    &self,
    exercise_id: &str,
    date: &str,
    set_index: u32,
    field: SetField,
  ) -> String {
    self
      .logged_sets
      .iter()
      .find(|s| s.exercise_id == exercise_id && s.date == date && s.set_index == set_index)
      .map(|s| match field {
        SetField::Reps => s.reps.clone(),
        SetField::Weight => s.weight.clone(),
      })
      .unwrap_or_default()
  }

  /// ---------------------------------------------------------------------------
  /// Progress
  /// ---------------------------------------------------------------------------

  /// Percentage of the given plans' exercise slots marked done.
  ///
  /// Only marks that point at an entry of a plan on the same date count, so
  /// leftovers from deleted or other weeks' plans are ignored.
  pub fn calculate_workouts_completed(&self, plans: &[TrainingPlan]) -> u8 {
    let total: usize = plans.iter().map(|p| p.exercises_data.len()).sum();
    if total == 0 {
      return 0;
    }

    let valid = self
      .completed
      .iter()
      .filter(|c| {
        plans
          .iter()
          .any(|p| p.date_key() == c.date && p.contains_exercise(&c.exercise_id))
      })
      .count();

    let pct = (valid as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
  }

  /// ---------------------------------------------------------------------------
  /// Expansion
  /// ---------------------------------------------------------------------------

  pub fn toggle_exercise_expansion(&mut self, exercise_id: &str) -> bool {
    if self.expanded.remove(exercise_id) {
      false
    } else {
      self.expanded.insert(exercise_id.to_string());
      true
    }
  }

  /// Write a whole list under `key`.
  async fn persist<T: Serialize>(&self, key: &str, list: &[T]) -> Result<(), SupabaseError> {
    let json = serde_json::to_string(list).map_err(|e| SupabaseError::Parse(e.to_string()))?;
    self.store.set(key, &json).await?;
    Ok(())
  }
}
