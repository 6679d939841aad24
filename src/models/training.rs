use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{de, format_date, parse_date, Exercise};

/// ---------------------------------------------------------------------------
/// Plan Entries
/// ---------------------------------------------------------------------------

/// One prescribed movement within a plan: sets x reps with free-text notes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingPlanExercise {
  /// Row key for rendering and for the local completion/set-log join.
  /// Either the id stored with the entry or `<plan_id>:<exercise_id>:<position>`.
  pub id: String,
  pub exercise_id: String,
  pub sets: u32,
  pub reps: u32,
  pub notes: String,
  pub exercise_name: Option<String>,
  pub exercises: Option<Exercise>,
}

impl TrainingPlanExercise {
  /// A freshly staged entry, not yet persisted.
  pub fn staged(exercise: &Exercise, sets: u32, reps: u32, notes: &str) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      exercise_id: exercise.id.clone(),
      sets,
      reps,
      notes: notes.to_string(),
      exercise_name: Some(exercise.name.clone()),
      exercises: Some(exercise.clone()),
    }
  }

  /// Composite key used when storage did not keep an id for the entry.
  pub fn fallback_id(plan_id: &str, exercise_id: &str, position: usize) -> String {
    format!("{}:{}:{}", plan_id, exercise_id, position)
  }

  pub fn display_name(&self) -> &str {
    self
      .exercises
      .as_ref()
      .map(|e| e.name.as_str())
      .filter(|n| !n.is_empty())
      .or(self.exercise_name.as_deref())
      .unwrap_or("Unnamed exercise")
  }

  /// Shape written into the `exercises_data` JSON column.
  pub fn to_stored(&self) -> StoredPlanExercise {
    StoredPlanExercise {
      id: self.id.clone(),
      exercise_id: self.exercise_id.clone(),
      sets: self.sets,
      reps: self.reps,
      notes: self.notes.clone(),
      exercise_name: self
        .exercises
        .as_ref()
        .map(|e| e.name.clone())
        .or_else(|| self.exercise_name.clone()),
    }
  }
}

/// Entry as stored inside `new_training_plans.exercises_data`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredPlanExercise {
  pub id: String,
  pub exercise_id: String,
  pub sets: u32,
  pub reps: u32,
  pub notes: String,
  pub exercise_name: Option<String>,
}

/// Entry as it comes back from storage. Every field is optional here;
/// [`TrainingPlanRow::into_plan`] decides what is usable.
#[derive(Debug, Clone, Deserialize)]
struct RawPlanExercise {
  #[serde(default, deserialize_with = "de::opt_id")]
  id: Option<String>,
  #[serde(default, deserialize_with = "de::opt_id")]
  exercise_id: Option<String>,
  #[serde(default, deserialize_with = "de::count")]
  sets: u32,
  #[serde(default, deserialize_with = "de::count")]
  reps: u32,
  #[serde(default)]
  notes: Option<String>,
  #[serde(default)]
  exercise_name: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Plans
/// ---------------------------------------------------------------------------

/// The exercises an athlete is assigned for one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingPlan {
  pub id: String,
  pub athlete_id: String,
  pub date: NaiveDate,
  pub exercises_data: Vec<TrainingPlanExercise>,
  pub created_at: Option<DateTime<Utc>>,
}

impl TrainingPlan {
  /// `yyyy-MM-dd` form of the plan date, the key days are matched on.
  pub fn date_key(&self) -> String {
    format_date(self.date)
  }

  pub fn contains_exercise(&self, exercise_id: &str) -> bool {
    self.exercises_data.iter().any(|e| e.id == exercise_id)
  }
}

/// Insert payload for `new_training_plans`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTrainingPlan {
  pub athlete_id: String,
  pub date: String,
  pub exercises_data: Vec<StoredPlanExercise>,
}

impl NewTrainingPlan {
  pub fn new(athlete_id: &str, date: NaiveDate, exercises: &[TrainingPlanExercise]) -> Self {
    Self {
      athlete_id: athlete_id.to_string(),
      date: format_date(date),
      exercises_data: exercises.iter().map(TrainingPlanExercise::to_stored).collect(),
    }
  }
}

/// A `new_training_plans` row exactly as PostgREST returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingPlanRow {
  #[serde(deserialize_with = "de::id")]
  pub id: String,
  #[serde(default, deserialize_with = "de::opt_id")]
  pub athlete_id: Option<String>,
  #[serde(default)]
  pub date: Option<String>,
  #[serde(default)]
  pub exercises_data: Option<Value>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl TrainingPlanRow {
  /// Validate and normalize the row. Rows without a readable date are
  /// rejected; a non-array `exercises_data` becomes an empty list and entries
  /// without an `exercise_id` are dropped.
  pub fn into_plan(self, athlete_id: &str) -> Option<TrainingPlan> {
    let Some(date) = self.date.as_deref().and_then(parse_date) else {
      tracing::warn!(plan_id = %self.id, date = ?self.date, "skipping plan row with unreadable date");
      return None;
    };

    let entries = match self.exercises_data {
      Some(Value::Array(items)) => items,
      _ => Vec::new(),
    };

    let mut exercises_data = Vec::with_capacity(entries.len());
    for (position, item) in entries.into_iter().enumerate() {
      let raw: RawPlanExercise = match serde_json::from_value(item) {
        Ok(raw) => raw,
        Err(e) => {
          tracing::warn!(plan_id = %self.id, position, "skipping malformed plan entry: {}", e);
          continue;
        }
      };
      let Some(exercise_id) = raw.exercise_id else {
        tracing::warn!(plan_id = %self.id, position, "skipping plan entry without exercise_id");
        continue;
      };

      let id = raw
        .id
        .unwrap_or_else(|| TrainingPlanExercise::fallback_id(&self.id, &exercise_id, position));
      let exercises = Some(Exercise {
        id: exercise_id.clone(),
        name: raw.exercise_name.clone().unwrap_or_default(),
      });

      exercises_data.push(TrainingPlanExercise {
        id,
        exercise_id,
        sets: raw.sets,
        reps: raw.reps,
        notes: raw.notes.unwrap_or_default(),
        exercise_name: raw.exercise_name,
        exercises,
      });
    }

    Some(TrainingPlan {
      id: self.id,
      athlete_id: self.athlete_id.unwrap_or_else(|| athlete_id.to_string()),
      date,
      exercises_data,
      created_at: self.created_at,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Local-only Tracking Records
/// ---------------------------------------------------------------------------

/// An athlete's mark that an exercise on a date is done.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedExercise {
  pub exercise_id: String,
  pub date: String,
}

/// Actual reps/weight entered for one set. Values are kept as typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSet {
  pub exercise_id: String,
  pub date: String,
  pub set_index: u32,
  pub reps: String,
  pub weight: String,
}
