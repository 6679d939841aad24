use chrono::NaiveDate;

use super::TRAINING_PLANS_TABLE;
use crate::models::{format_date, NewTrainingPlan, TrainingPlan, TrainingPlanExercise, TrainingPlanRow};
use crate::supabase::{SupabaseClient, SupabaseError};

fn into_plans(rows: Vec<TrainingPlanRow>, athlete_id: &str) -> Vec<TrainingPlan> {
  rows
    .into_iter()
    .filter_map(|row| row.into_plan(athlete_id))
    .collect()
}

/// The plan an athlete has on one date, if any. Rows that already share a
/// date resolve to the first one, as on the dashboard.
pub async fn get_training_plan_by_date(
  client: &SupabaseClient,
  athlete_id: &str,
  date: NaiveDate,
) -> Result<Option<TrainingPlan>, SupabaseError> {
  let rows: Vec<TrainingPlanRow> = client
    .from(TRAINING_PLANS_TABLE)
    .select("*")
    .eq("athlete_id", athlete_id)
    .eq("date", &format_date(date))
    .execute()
    .await?;

  Ok(into_plans(rows, athlete_id).into_iter().next())
}

/// Insert one plan row holding every exercise, returning it as stored.
pub async fn create_training_plan(
  client: &SupabaseClient,
  athlete_id: &str,
  date: NaiveDate,
  exercises: &[TrainingPlanExercise],
) -> Result<TrainingPlan, SupabaseError> {
  let payload = NewTrainingPlan::new(athlete_id, date, exercises);

  let rows: Vec<TrainingPlanRow> = client
    .from(TRAINING_PLANS_TABLE)
    .select("*")
    .insert(&payload)
    .await?;

  rows
    .into_iter()
    .next()
    .and_then(|row| row.into_plan(athlete_id))
    .ok_or_else(|| SupabaseError::Parse("insert returned no usable plan row".into()))
}

/// Plans dated within `[start, end]` (inclusive), oldest first.
pub async fn get_weekly_training_plans(
  client: &SupabaseClient,
  athlete_id: &str,
  start: NaiveDate,
  end: NaiveDate,
) -> Result<Vec<TrainingPlan>, SupabaseError> {
  let rows: Vec<TrainingPlanRow> = client
    .from(TRAINING_PLANS_TABLE)
    .select("*")
    .eq("athlete_id", athlete_id)
    .gte("date", &format_date(start))
    .lte("date", &format_date(end))
    .order("date", true)
    .execute()
    .await?;

  Ok(into_plans(rows, athlete_id))
}

/// Every plan an athlete has, for the coach's calendar.
pub async fn get_training_plans_for_athlete(
  client: &SupabaseClient,
  athlete_id: &str,
) -> Result<Vec<TrainingPlan>, SupabaseError> {
  let rows: Vec<TrainingPlanRow> = client
    .from(TRAINING_PLANS_TABLE)
    .select("*")
    .eq("athlete_id", athlete_id)
    .order("date", true)
    .execute()
    .await?;

  Ok(into_plans(rows, athlete_id))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::supabase::SupabaseConfig;
  use crate::test_utils::*;
  use mockito::Matcher;
  use serde_json::json;

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  #[tokio::test]
  async fn test_weekly_plans_query_window() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/rest/v1/new_training_plans")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("athlete_id".into(), "eq.athlete-1".into()),
        Matcher::UrlEncoded("date".into(), "gte.2024-04-01".into()),
        Matcher::UrlEncoded("date".into(), "lte.2024-04-07".into()),
        Matcher::UrlEncoded("order".into(), "date.asc".into()),
      ]))
      .with_status(200)
      .with_body(
        json!([
          plan_row_json("p1", "2024-04-01", &[("ex-a", 3, 10), ("ex-b", 4, 8)]),
          plan_row_json("p2", "2024-04-03", &[("ex-c", 5, 5)]),
        ])
        .to_string(),
      )
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"));
    let plans = get_weekly_training_plans(&client, "athlete-1", date("2024-04-01"), date("2024-04-07"))
      .await
      .unwrap();

    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].exercises_data.len(), 2);
    assert_eq!(plans[1].date_key(), "2024-04-03");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_plan_by_date_missing_is_none() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/rest/v1/new_training_plans")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("athlete_id".into(), "eq.athlete-1".into()),
        Matcher::UrlEncoded("date".into(), "eq.2024-04-02".into()),
      ]))
      .with_status(200)
      .with_body("[]")
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"));
    let plan = get_training_plan_by_date(&client, "athlete-1", date("2024-04-02"))
      .await
      .unwrap();
    assert!(plan.is_none());
  }

  #[tokio::test]
  async fn test_plan_by_date_with_several_rows_takes_first() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/rest/v1/new_training_plans")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(
        json!([
          plan_row_json("p1", "2024-04-02", &[("ex-a", 3, 10)]),
          plan_row_json("p2", "2024-04-02", &[("ex-b", 1, 1)]),
        ])
        .to_string(),
      )
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"));
    let plan = get_training_plan_by_date(&client, "athlete-1", date("2024-04-02"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(plan.id, "p1");
    assert_eq!(plan.athlete_id, "athlete-1");
  }

  #[tokio::test]
  async fn test_plan_by_date_other_errors_propagate() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/rest/v1/new_training_plans")
      .match_query(Matcher::Any)
      .with_status(500)
      .with_body(r#"{"message":"boom"}"#)
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"));
    let err = get_training_plan_by_date(&client, "athlete-1", date("2024-04-02"))
      .await
      .unwrap_err();
    assert!(matches!(err, SupabaseError::Api { status: 500, .. }));
  }

  #[tokio::test]
  async fn test_create_plan_posts_single_row() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/rest/v1/new_training_plans")
      .match_query(Matcher::Any)
      .match_body(Matcher::PartialJson(json!({
        "athlete_id": "athlete-1",
        "date": "2024-04-01",
        "exercises_data": [{"exercise_id": "ex-a", "sets": 3, "reps": 10, "exercise_name": "Squat"}]
      })))
      .with_status(201)
      .with_body(json!([plan_row_json("p9", "2024-04-01", &[("ex-a", 3, 10)])]).to_string())
      .expect(1)
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"));
    let squat = mock_exercise("ex-a", "Squat");
    let staged = vec![TrainingPlanExercise::staged(&squat, 3, 10, "")];
    let plan = create_training_plan(&client, "athlete-1", date("2024-04-01"), &staged)
      .await
      .unwrap();

    assert_eq!(plan.id, "p9");
    assert_eq!(plan.exercises_data.len(), 1);
    mock.assert_async().await;
  }
}
