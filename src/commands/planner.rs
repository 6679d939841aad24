use crate::commands::signed_in;
use crate::db::AppState;
use crate::models::{parse_date, AthleteCard, Exercise};
use crate::planner::{self, ExerciseDraft, PlanBuilder, SaveOutcome};
use crate::schedule::{month_calendar, CalendarDay};
use crate::queries::exercises::get_all_exercises;
use crate::queries::profiles::{get_all_athletes, get_athlete_by_id};
use crate::supabase::{SupabaseClient, SupabaseError};
use std::sync::Arc;
use tauri::State;
use tokio::sync::{MappedMutexGuard, MutexGuard};

/// The plan builder for `athlete_id`, opening it (and loading that
/// athlete's plans) when another athlete, or none, was open.
async fn builder_for<'a>(
  state: &'a AppState,
  client: &SupabaseClient,
  athlete_id: &str,
) -> Result<MappedMutexGuard<'a, PlanBuilder>, SupabaseError> {
  let mut guard = state.planner.lock().await;
  if guard.as_ref().map_or(true, |b| b.athlete_id != athlete_id) {
    *guard = Some(PlanBuilder::open(client, athlete_id).await?);
  }

  MutexGuard::try_map(guard, |b| b.as_mut()).map_err(|_| SupabaseError::NotFound)
}

/// ---------------------------------------------------------------------------
/// Catalog
/// ---------------------------------------------------------------------------

/// The cached catalog, fetched first if nothing has been loaded yet.
async fn cached_catalog(
  state: &AppState,
  client: &SupabaseClient,
) -> Result<Vec<Exercise>, SupabaseError> {
  let mut catalog = state.exercises.lock().await;
  if catalog.is_empty() {
    *catalog = get_all_exercises(client).await?;
  }
  Ok(catalog.clone())
}

#[tauri::command]
pub async fn list_exercises(
  state: State<'_, Arc<AppState>>,
) -> Result<Vec<Exercise>, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let exercises = get_all_exercises(&client).await?;
  *state.exercises.lock().await = exercises.clone();
  Ok(exercises)
}

/// Returns `None` for a blank name or when the insert failed.
#[tauri::command]
pub async fn add_new_exercise(
  state: State<'_, Arc<AppState>>,
  name: String,
) -> Result<Option<Exercise>, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let mut catalog = state.exercises.lock().await;

  match planner::add_new_exercise(&client, &mut catalog, &name).await {
    Ok(added) => Ok(added),
    Err(e) => {
      tracing::error!("Error adding exercise: {}", e);
      Ok(None)
    }
  }
}

/// ---------------------------------------------------------------------------
/// Athletes
/// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn get_athlete(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
) -> Result<AthleteCard, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  Ok(get_athlete_by_id(&client, &athlete_id).await?.into())
}

#[tauri::command]
pub async fn list_athletes(
  state: State<'_, Arc<AppState>>,
  exclude_id: Option<String>,
) -> Result<Vec<AthleteCard>, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let athletes = get_all_athletes(&client, exclude_id.as_deref()).await?;
  Ok(athletes.into_iter().map(AthleteCard::from).collect())
}

#[tauri::command]
pub async fn search_athletes(
  state: State<'_, Arc<AppState>>,
  query: String,
) -> Result<Vec<AthleteCard>, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let athletes = get_all_athletes(&client, None).await?;
  Ok(
    athletes
      .into_iter()
      .filter(|a| a.matches_search(&query))
      .map(AthleteCard::from)
      .collect(),
  )
}

/// ---------------------------------------------------------------------------
/// Plan Builder
/// ---------------------------------------------------------------------------

/// Open the builder for an athlete, always reloading their plans.
#[tauri::command]
pub async fn get_athlete_plans(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
) -> Result<PlanBuilder, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let builder = PlanBuilder::open(&client, &athlete_id).await?;
  *state.planner.lock().await = Some(builder.clone());
  Ok(builder)
}

#[tauri::command]
pub async fn select_plan_date(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
  date: String,
) -> Result<PlanBuilder, SupabaseError> {
  let date = parse_date(&date).ok_or_else(|| SupabaseError::Parse(format!("invalid date: {}", date)))?;
  let (client, _) = signed_in(&state).await?;
  let mut builder = builder_for(&state, &client, &athlete_id).await?;
  builder.select_date(date);
  Ok(builder.clone())
}

/// Stage the form as typed; incomplete forms leave the builder unchanged.
#[tauri::command]
pub async fn stage_exercise(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
  draft: ExerciseDraft,
) -> Result<PlanBuilder, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let catalog = cached_catalog(&state, &client).await?;

  let mut builder = builder_for(&state, &client, &athlete_id).await?;
  builder.draft = draft;
  builder.add_exercise_to_plan(&catalog);
  Ok(builder.clone())
}

#[tauri::command]
pub async fn unstage_exercise(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
  id: String,
) -> Result<PlanBuilder, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let mut builder = builder_for(&state, &client, &athlete_id).await?;
  builder.remove_staged_exercise(&id);
  Ok(builder.clone())
}

#[tauri::command]
pub async fn save_training_plan(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
) -> Result<SaveOutcome, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let mut builder = builder_for(&state, &client, &athlete_id).await?;
  Ok(builder.save_training_plan(&client).await)
}

/// Copy one of the open athlete's plans to another athlete.
#[tauri::command]
pub async fn copy_training_plan(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
  plan_id: String,
  target_athlete_id: String,
) -> Result<SaveOutcome, SupabaseError> {
  let (client, _) = signed_in(&state).await?;
  let source = {
    let builder = builder_for(&state, &client, &athlete_id).await?;
    builder
      .plans
      .iter()
      .find(|p| p.id == plan_id)
      .cloned()
      .ok_or(SupabaseError::NotFound)?
  };

  Ok(planner::copy_training_plan(&client, &source, &target_athlete_id).await)
}

/// The month around `date` for the coach's calendar, from the athlete's
/// loaded plans.
#[tauri::command]
pub async fn get_month_calendar(
  state: State<'_, Arc<AppState>>,
  athlete_id: String,
  date: String,
) -> Result<Vec<CalendarDay>, SupabaseError> {
  let date = parse_date(&date).ok_or_else(|| SupabaseError::Parse(format!("invalid date: {}", date)))?;
  let (client, _) = signed_in(&state).await?;
  let builder = builder_for(&state, &client, &athlete_id).await?;
  Ok(month_calendar(date, &builder.plans))
}
