use crate::db::AppState;
use crate::routing::{guard, RouteDecision};
use crate::supabase::SupabaseError;
use std::sync::Arc;
use tauri::State;

/// Called by the frontend before showing `path`.
#[tauri::command]
pub async fn guard_route(
  state: State<'_, Arc<AppState>>,
  path: String,
) -> Result<RouteDecision, SupabaseError> {
  guard(&state.supabase, &state.db, &path).await
}
