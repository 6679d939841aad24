mod auth;
mod commands;
mod db;
mod local_store;
mod models;
mod planner;
mod queries;
mod routing;
mod schedule;
mod supabase;
mod tracker;
mod validation;

#[cfg(test)]
mod test_utils;

use db::AppState;
use std::sync::Arc;
use supabase::{SupabaseClient, SupabaseConfig};
use tauri::Manager;
use tracing_subscriber::EnvFilter;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vdp_dashboard_lib=info")),
    )
    .init();

  tauri::Builder::default()
    .plugin(tauri_plugin_opener::init())
    .setup(|app| {
      let config = SupabaseConfig::from_env().inspect_err(|e| {
        tracing::error!("Supabase is not configured: {}", e);
      })?;

      let app_handle = app.handle().clone();
      let pool = tauri::async_runtime::block_on(async move { db::initialize_db(&app_handle).await })
        .inspect_err(|e| tracing::error!("Failed to initialize database: {}", e))?;

      app.manage(Arc::new(AppState::new(pool, SupabaseClient::new(config))));
      tracing::info!("Database ready");
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      // Auth commands
      commands::auth::sign_up,
      commands::auth::sign_in,
      commands::auth::sign_out,
      commands::auth::get_current_user,
      commands::auth::request_password_reset,
      commands::auth::update_password,
      commands::routing::guard_route,
      // Athlete dashboard
      commands::schedule::get_week_schedule,
      commands::schedule::next_week,
      commands::schedule::previous_week,
      commands::tracker::toggle_exercise_completion,
      commands::tracker::is_exercise_completed,
      commands::tracker::update_logged_set,
      commands::tracker::get_logged_set_value,
      commands::tracker::toggle_exercise_expansion,
      commands::tracker::get_workouts_completed,
      commands::tracker::get_tracker_state,
      // Coach plan builder
      commands::planner::list_exercises,
      commands::planner::add_new_exercise,
      commands::planner::get_athlete,
      commands::planner::list_athletes,
      commands::planner::search_athletes,
      commands::planner::get_athlete_plans,
      commands::planner::select_plan_date,
      commands::planner::stage_exercise,
      commands::planner::unstage_exercise,
      commands::planner::save_training_plan,
      commands::planner::copy_training_plan,
      commands::planner::get_month_calendar,
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}
