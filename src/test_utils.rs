//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories (profiles, exercises, plans, sessions)
//! - PostgREST row fixtures for mockito bodies

use crate::auth::{AppMetadata, AuthSession, AuthUser, UserMetadata};
use crate::models::{Exercise, Profile, TrainingPlan, TrainingPlanRow};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_exercise(id: &str, name: &str) -> Exercise {
  Exercise {
    id: id.to_string(),
    name: name.to_string(),
  }
}

pub fn mock_profile(id: &str, first_name: &str) -> Profile {
  Profile {
    id: id.to_string(),
    email: format!("{}@example.com", first_name.to_lowercase()),
    first_name: first_name.to_string(),
    plan: "basic".to_string(),
    admin: false,
  }
}

/// A signed-in session whose access token is `access-<user_id>`
pub fn mock_auth_session(user_id: &str, expires_at: DateTime<Utc>) -> AuthSession {
  AuthSession {
    access_token: format!("access-{}", user_id),
    refresh_token: format!("refresh-{}", user_id),
    expires_at,
    user: AuthUser {
      id: user_id.to_string(),
      email: Some(format!("{}@example.com", user_id)),
      user_metadata: UserMetadata {
        full_name: Some("Jo Athlete".to_string()),
        plan: Some("basic".to_string()),
      },
      app_metadata: AppMetadata::default(),
    },
  }
}

/// A `new_training_plans` row as PostgREST would return it. Entries carry no
/// stored id, so they get `<plan_id>:<exercise_id>:<position>`.
pub fn plan_row_json(id: &str, date: &str, exercises: &[(&str, u32, u32)]) -> Value {
  let entries: Vec<Value> = exercises
    .iter()
    .map(|(exercise_id, sets, reps)| {
      json!({
        "exercise_id": exercise_id,
        "sets": sets,
        "reps": reps,
        "notes": "",
        "exercise_name": format!("Exercise {}", exercise_id),
      })
    })
    .collect();

  json!({
    "id": id,
    "date": date,
    "exercises_data": entries,
    "created_at": "2024-03-30T12:00:00+00:00",
  })
}

/// A normalized plan for athlete `athlete-1`
pub fn mock_plan(id: &str, date: &str, exercises: &[(&str, u32, u32)]) -> TrainingPlan {
  let row: TrainingPlanRow =
    serde_json::from_value(plan_row_json(id, date, exercises)).expect("valid plan row");
  row.into_plan("athlete-1").expect("plan row with a date")
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('local_store', 'auth_session')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_plan_has_deterministic_entry_ids() {
    let plan = mock_plan("p1", "2024-04-01", &[("ex-a", 3, 10), ("ex-b", 4, 8)]);
    assert_eq!(plan.athlete_id, "athlete-1");
    assert_eq!(plan.exercises_data[0].id, "p1:ex-a:0");
    assert_eq!(plan.exercises_data[1].id, "p1:ex-b:1");
    assert_eq!(plan.exercises_data[1].display_name(), "Exercise ex-b");
  }
}
