use crate::commands::signed_in;
use crate::db::AppState;
use crate::local_store::SqliteStore;
use crate::supabase::SupabaseError;
use crate::tracker::{CompletionTracker, SetField, TrackerState};
use std::sync::Arc;
use tauri::State;
use tokio::sync::{MappedMutexGuard, MutexGuard};

/// The tracker for the signed-in user, loading it from local storage the
/// first time (or after a different user signed in).
async fn signed_in_tracker(
  state: &AppState,
) -> Result<MappedMutexGuard<'_, CompletionTracker<SqliteStore>>, SupabaseError> {
  let (_, session) = signed_in(state).await?;

  let mut guard = state.tracker.lock().await;
  if guard.as_ref().map_or(true, |t| t.user_id() != session.user.id) {
    let store = SqliteStore::new(state.db.clone());
    *guard = Some(CompletionTracker::load(store, &session.user.id).await?);
  }

  MutexGuard::try_map(guard, |t| t.as_mut()).map_err(|_| SupabaseError::NotAuthenticated)
}

#[tauri::command]
pub async fn toggle_exercise_completion(
  state: State<'_, Arc<AppState>>,
  exercise_id: String,
  date: String,
) -> Result<bool, SupabaseError> {
  let mut tracker = signed_in_tracker(&state).await?;
  tracker.toggle_exercise_completion(&exercise_id, &date).await
}

#[tauri::command]
pub async fn is_exercise_completed(
  state: State<'_, Arc<AppState>>,
  exercise_id: String,
  date: String,
) -> Result<bool, SupabaseError> {
  let tracker = signed_in_tracker(&state).await?;
  Ok(tracker.is_exercise_completed(&exercise_id, &date))
}

#[tauri::command]
pub async fn update_logged_set(
  state: State<'_, Arc<AppState>>,
  exercise_id: String,
  date: String,
  set_index: u32,
  field: SetField,
  value: String,
) -> Result<(), SupabaseError> {
  let mut tracker = signed_in_tracker(&state).await?;
  tracker
    .update_logged_set_value(&exercise_id, &date, set_index, field, &value)
    .await
}

/// The reps or weight typed for one set; empty when nothing was logged.
#[tauri::command]
pub async fn get_logged_set_value(
  state: State<'_, Arc<AppState>>,
  exercise_id: String,
  date: String,
  set_index: u32,
  field: SetField,
) -> Result<String, SupabaseError> {
  let tracker = signed_in_tracker(&state).await?;
  Ok(tracker.logged_set_value(&exercise_id, &date, set_index, field))
}

#[tauri::command]
pub async fn toggle_exercise_expansion(
  state: State<'_, Arc<AppState>>,
  exercise_id: String,
) -> Result<bool, SupabaseError> {
  let mut tracker = signed_in_tracker(&state).await?;
  Ok(tracker.toggle_exercise_expansion(&exercise_id))
}

/// Completion percentage for the week currently on screen.
#[tauri::command]
pub async fn get_workouts_completed(state: State<'_, Arc<AppState>>) -> Result<u8, SupabaseError> {
  let plans = state
    .week
    .lock()
    .await
    .as_ref()
    .map(|view| view.plans().to_vec())
    .unwrap_or_default();

  let tracker = signed_in_tracker(&state).await?;
  Ok(tracker.calculate_workouts_completed(&plans))
}

#[tauri::command]
pub async fn get_tracker_state(
  state: State<'_, Arc<AppState>>,
) -> Result<TrackerState, SupabaseError> {
  let tracker = signed_in_tracker(&state).await?;
  Ok(tracker.state())
}
