//! Coach plan builder for one athlete.
//!
//! The coach picks a date, stages exercises from the catalog one at a time,
//! then saves them as a single plan row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{format_date, Exercise, TrainingPlan, TrainingPlanExercise};
use crate::queries::exercises::add_exercise;
use crate::queries::training::{
  create_training_plan, get_training_plan_by_date, get_training_plans_for_athlete,
};
use crate::schedule::plan_for_date;
use crate::supabase::{SupabaseClient, SupabaseError};

/// The "add exercise" form, exactly as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDraft {
  #[serde(default)]
  pub exercise_id: String,
  #[serde(default)]
  pub sets: String,
  #[serde(default)]
  pub reps: String,
  #[serde(default)]
  pub notes: String,
}

impl ExerciseDraft {
  /// Parsed sets/reps, or `None` if the form is incomplete or not numeric.
  fn parsed(&self) -> Option<(u32, u32)> {
    if self.exercise_id.is_empty() || self.sets.is_empty() || self.reps.is_empty() {
      return None;
    }
    let sets = self.sets.trim().parse().ok()?;
    let reps = self.reps.trim().parse().ok()?;
    Some((sets, reps))
  }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SaveOutcome {
  /// Nothing was sent: no date picked or nothing staged.
  Rejected(String),
  /// The athlete already has a plan on that date.
  Duplicate(String),
  Saved(TrainingPlan),
  /// The insert failed; staged exercises are kept for a retry.
  Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanBuilder {
  pub athlete_id: String,
  pub selected_date: Option<NaiveDate>,
  pub draft: ExerciseDraft,
  pub staged: Vec<TrainingPlanExercise>,
  pub plans: Vec<TrainingPlan>,
}

impl PlanBuilder {
  pub fn new(athlete_id: &str) -> Self {
    Self {
      athlete_id: athlete_id.to_string(),
      selected_date: None,
      draft: ExerciseDraft::default(),
      staged: Vec::new(),
      plans: Vec::new(),
    }
  }

  /// A builder with the athlete's existing plans loaded.
  pub async fn open(client: &SupabaseClient, athlete_id: &str) -> Result<Self, SupabaseError> {
    let mut builder = Self::new(athlete_id);
    builder.plans = get_training_plans_for_athlete(client, athlete_id).await?;
    Ok(builder)
  }

  pub fn select_date(&mut self, date: NaiveDate) {
    self.selected_date = Some(date);
  }

  /// The existing plan on the selected date, if any.
  pub fn plan_for_selected_date(&self) -> Option<&TrainingPlan> {
    self.selected_date.and_then(|d| plan_for_date(&self.plans, d))
  }

  /// Stage the current draft. Incomplete or unparseable drafts, and
  /// exercises missing from the catalog, are ignored without error.
  pub fn add_exercise_to_plan(&mut self, catalog: &[Exercise]) -> Option<&TrainingPlanExercise> {
    let (sets, reps) = self.draft.parsed()?;
    let exercise = catalog.iter().find(|e| e.id == self.draft.exercise_id)?;

    self
      .staged
      .push(TrainingPlanExercise::staged(exercise, sets, reps, &self.draft.notes));
    self.draft = ExerciseDraft::default();
    self.staged.last()
  }

  pub fn remove_staged_exercise(&mut self, id: &str) -> bool {
    let before = self.staged.len();
    self.staged.retain(|e| e.id != id);
    self.staged.len() != before
  }

  pub async fn save_training_plan(&mut self, client: &SupabaseClient) -> SaveOutcome {
    let Some(date) = self.selected_date else {
      return SaveOutcome::Rejected("Select a date first".into());
    };
    if self.staged.is_empty() {
      return SaveOutcome::Rejected("Add at least one exercise".into());
    }
    if self.plan_for_selected_date().is_some() {
      return SaveOutcome::Duplicate(format!("A plan already exists for {}", format_date(date)));
    }

    match create_training_plan(client, &self.athlete_id, date, &self.staged).await {
      Ok(plan) => {
        tracing::info!(
          athlete_id = %self.athlete_id,
          date = %plan.date_key(),
          exercises = plan.exercises_data.len(),
          "training plan saved"
        );
        self.staged.clear();
        self.plans.push(plan.clone());
        SaveOutcome::Saved(plan)
      }
      Err(e) => {
        tracing::error!(athlete_id = %self.athlete_id, "Error creating training plan: {}", e);
        SaveOutcome::Failed(e.to_string())
      }
    }
  }
}

/// Add a catalog entry and append it to the local catalog. A blank name is
/// ignored (`Ok(None)`) without a request.
pub async fn add_new_exercise(
  client: &SupabaseClient,
  catalog: &mut Vec<Exercise>,
  name: &str,
) -> Result<Option<Exercise>, SupabaseError> {
  if name.trim().is_empty() {
    return Ok(None);
  }

  let exercise = add_exercise(client, name).await?;
  catalog.push(exercise.clone());
  Ok(Some(exercise))
}

/// Give another athlete the same exercises on the same date. Entries get
/// fresh ids so completion marks never collide across athletes. Refused when
/// the target already has a plan on that date.
pub async fn copy_training_plan(
  client: &SupabaseClient,
  source: &TrainingPlan,
  target_athlete_id: &str,
) -> SaveOutcome {
  if target_athlete_id.is_empty() {
    return SaveOutcome::Rejected("Select an athlete to copy to".into());
  }

  match get_training_plan_by_date(client, target_athlete_id, source.date).await {
    Ok(Some(_)) => {
      return SaveOutcome::Duplicate(format!(
        "A plan already exists for {}",
        format_date(source.date)
      ));
    }
    Ok(None) => {}
    Err(e) => {
      tracing::error!(to = %target_athlete_id, "Error checking target plans: {}", e);
      return SaveOutcome::Failed(e.to_string());
    }
  }

  let exercises: Vec<TrainingPlanExercise> = source
    .exercises_data
    .iter()
    .map(|e| TrainingPlanExercise {
      id: uuid::Uuid::new_v4().to_string(),
      ..e.clone()
    })
    .collect();

  match create_training_plan(client, target_athlete_id, source.date, &exercises).await {
    Ok(plan) => {
      tracing::info!(
        from = %source.athlete_id,
        to = %target_athlete_id,
        date = %plan.date_key(),
        "training plan copied"
      );
      SaveOutcome::Saved(plan)
    }
    Err(e) => {
      tracing::error!(to = %target_athlete_id, "Error copying training plan: {}", e);
      SaveOutcome::Failed(e.to_string())
    }
  }
}
