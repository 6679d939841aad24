//! Device-local key/value storage for per-user tracker state.
//!
//! Values are whole JSON documents, read and written in one piece.

#[cfg(test)]
use std::collections::HashMap;
use std::future::Future;

use crate::db::DbPool;

pub fn completed_key(user_id: &str) -> String {
  format!("completed-exercises-{}", user_id)
}

pub fn logged_sets_key(user_id: &str) -> String {
  format!("logged-sets-{}", user_id)
}

pub trait LocalStore {
  fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, sqlx::Error>> + Send;

  fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

/// Backed by the `local_store` table in the app database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  db: DbPool,
}

impl SqliteStore {
  pub fn new(db: DbPool) -> Self {
    Self { db }
  }
}

impl LocalStore for SqliteStore {
  async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM local_store WHERE key = ?1")
      .bind(key)
      .fetch_optional(&self.db)
      .await?;

    Ok(row.map(|(value,)| value))
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
      r#"
      INSERT INTO local_store (key, value)
      VALUES (?1, ?2)
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = CURRENT_TIMESTAMP
      "#,
    )
    .bind(key)
    .bind(value)
    .execute(&self.db)
    .await?;

    Ok(())
  }
}

/// In-process store for tests. `failing_writes` rejects every `set`.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
  values: std::sync::Mutex<HashMap<String, String>>,
  fail_writes: bool,
}

#[cfg(test)]
impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn failing_writes() -> Self {
    Self {
      fail_writes: true,
      ..Self::default()
    }
  }
}

#[cfg(test)]
impl LocalStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
    let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
    Ok(values.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
    if self.fail_writes {
      return Err(sqlx::Error::PoolClosed);
    }
    let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }
}
