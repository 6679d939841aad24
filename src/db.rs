use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::PathBuf;
use tauri::Manager;
use tokio::sync::Mutex;

use crate::local_store::SqliteStore;
use crate::models::Exercise;
use crate::planner::PlanBuilder;
use crate::schedule::WeekView;
use crate::supabase::SupabaseClient;
use crate::tracker::CompletionTracker;

pub type DbPool = SqlitePool;

/// Application state shared by all commands
pub struct AppState {
  pub db: DbPool,
  pub supabase: SupabaseClient,
  /// Athlete dashboard: the week currently on screen
  pub week: Mutex<Option<WeekView>>,
  /// Signed-in user's checkmarks and set logs
  pub tracker: Mutex<Option<CompletionTracker<SqliteStore>>>,
  /// Coach plan builder for the athlete currently open
  pub planner: Mutex<Option<PlanBuilder>>,
  /// Exercise catalog as last fetched
  pub exercises: Mutex<Vec<Exercise>>,
}

impl AppState {
  pub fn new(db: DbPool, supabase: SupabaseClient) -> Self {
    Self {
      db,
      supabase,
      week: Mutex::new(None),
      tracker: Mutex::new(None),
      planner: Mutex::new(None),
      exercises: Mutex::new(Vec::new()),
    }
  }

  /// Drop everything tied to the previous user.
  pub async fn reset_user_state(&self) {
    *self.week.lock().await = None;
    *self.tracker.lock().await = None;
    *self.planner.lock().await = None;
  }
}

/// Get the path to the database file
/// Stored in the platform app data dir, e.g.
/// ~/Library/Application Support/com.vdp.dashboard/vdp-dashboard.db
fn get_db_path<R: tauri::Runtime>(app: &tauri::AppHandle<R>) -> Result<PathBuf, Box<dyn std::error::Error>> {
  let data_dir = app
    .path()
    .app_data_dir()
    .map_err(|e| format!("Failed to get app data dir: {}", e))?;

  fs::create_dir_all(&data_dir)?;

  Ok(data_dir.join("vdp-dashboard.db"))
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db<R: tauri::Runtime>(app: &tauri::AppHandle<R>) -> Result<DbPool, Box<dyn std::error::Error>> {
  let db_path = get_db_path(app)?;
  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

  tracing::info!("Initializing database at: {}", db_path.display());

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}
