use super::EXERCISES_TABLE;
use crate::models::exercise::NewExercise;
use crate::models::Exercise;
use crate::supabase::{SupabaseClient, SupabaseError};

/// The whole catalog, alphabetical.
pub async fn get_all_exercises(client: &SupabaseClient) -> Result<Vec<Exercise>, SupabaseError> {
  client
    .from(EXERCISES_TABLE)
    .select("*")
    .order("name", true)
    .execute()
    .await
}

/// Add a catalog entry. The name is trimmed; blank names are rejected
/// before any request. Duplicate names are allowed.
pub async fn add_exercise(client: &SupabaseClient, name: &str) -> Result<Exercise, SupabaseError> {
  let row = NewExercise::new(name)
    .ok_or_else(|| SupabaseError::InvalidInput("Exercise name is required".into()))?;

  let inserted: Vec<Exercise> = client
    .from(EXERCISES_TABLE)
    .select("*")
    .insert(&[row])
    .await?;

  inserted
    .into_iter()
    .next()
    .ok_or_else(|| SupabaseError::Parse("insert returned no rows".into()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::supabase::SupabaseConfig;
  use mockito::Matcher;
  use serde_json::json;

  #[tokio::test]
  async fn test_get_all_exercises_ordered_by_name() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/rest/v1/exercises")
      .match_query(Matcher::UrlEncoded("order".into(), "name.asc".into()))
      .with_status(200)
      .with_body(r#"[{"id":1,"name":"Box Jump"},{"id":2,"name":"Depth Jump"}]"#)
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"));
    let exercises = get_all_exercises(&client).await.unwrap();
    assert_eq!(exercises[0].id, "1");
    assert_eq!(exercises[1].name, "Depth Jump");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_add_exercise_trims_name() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/rest/v1/exercises")
      .match_query(Matcher::Any)
      .match_header("prefer", "return=representation")
      .match_body(Matcher::Json(json!([{"name": "Broad Jump"}])))
      .with_status(201)
      .with_body(r#"[{"id":"ex-9","name":"Broad Jump"}]"#)
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"));
    let exercise = add_exercise(&client, "  Broad Jump  ").await.unwrap();
    assert_eq!(exercise.id, "ex-9");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_add_blank_exercise_makes_no_request() {
    let client = SupabaseClient::new(SupabaseConfig::new("http://127.0.0.1:9", "anon"));
    let err = add_exercise(&client, "   ").await.unwrap_err();
    assert!(matches!(err, SupabaseError::InvalidInput(_)));
    assert_eq!(err.to_string(), "Invalid input: Exercise name is required");
  }
}
