use crate::commands::signed_in;
use crate::db::AppState;
use crate::schedule::{FetchTicket, WeekSchedule, WeekView};
use crate::supabase::SupabaseError;
use chrono::Local;
use std::sync::Arc;
use tauri::State;

/// Issue a fetch for the signed-in athlete's week view, run it without
/// holding the lock, then apply the result. A newer navigation that lands in
/// between wins; this call then returns that newer state.
async fn fetch_week<F>(state: &AppState, issue: F) -> Result<WeekSchedule, SupabaseError>
where
  F: FnOnce(&mut WeekView) -> FetchTicket,
{
  let (client, session) = signed_in(state).await?;

  let ticket = {
    let mut week = state.week.lock().await;
    if week.as_ref().is_some_and(|v| v.athlete_id() != session.user.id) {
      *week = None;
    }
    let view =
      week.get_or_insert_with(|| WeekView::new(&session.user.id, Local::now().date_naive()));
    issue(view)
  };

  let result = ticket.fetch(&client).await;

  let mut week = state.week.lock().await;
  match week.as_mut() {
    Some(view) => {
      view.apply(&ticket, result);
      Ok(view.schedule())
    }
    // Signed out while the request was in flight
    None => Err(SupabaseError::NotAuthenticated),
  }
}

#[tauri::command]
pub async fn get_week_schedule(
  state: State<'_, Arc<AppState>>,
) -> Result<WeekSchedule, SupabaseError> {
  fetch_week(&state, WeekView::refresh).await
}

#[tauri::command]
pub async fn next_week(state: State<'_, Arc<AppState>>) -> Result<WeekSchedule, SupabaseError> {
  fetch_week(&state, |view| view.navigate(1)).await
}

#[tauri::command]
pub async fn previous_week(
  state: State<'_, Arc<AppState>>,
) -> Result<WeekSchedule, SupabaseError> {
  fetch_week(&state, |view| view.navigate(-1)).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::testing::test_state;
  use crate::models::format_date;
  use crate::schedule::WeekWindow;
  use crate::test_utils::*;
  use chrono::Duration;
  use mockito::Matcher;
  use serde_json::json;
  use serial_test::serial;
  use tauri::Manager;

  #[tokio::test]
  #[serial]
  async fn test_week_requires_sign_in() {
    let pool = setup_test_db().await;
    let app = tauri::test::mock_app();
    app.manage(test_state(&pool, "http://127.0.0.1:9", false).await);

    let result = get_week_schedule(app.state()).await;
    assert!(matches!(result, Err(SupabaseError::NotAuthenticated)));

    teardown_test_db(pool).await;
  }

  fn week_mock_query(window: WeekWindow) -> Matcher {
    Matcher::AllOf(vec![
      Matcher::UrlEncoded("athlete_id".into(), "eq.user-1".into()),
      Matcher::UrlEncoded("date".into(), format!("gte.{}", format_date(window.start))),
      Matcher::UrlEncoded("date".into(), format!("lte.{}", format_date(window.end))),
    ])
  }

  #[tokio::test]
  #[serial]
  async fn test_navigate_forward_and_back_refetches() {
    let pool = setup_test_db().await;
    let this_week = WeekWindow::containing(Local::now().date_naive());
    let following = this_week.shifted(1);
    let monday = format_date(this_week.start);
    let wednesday = format_date(following.start + Duration::days(2));

    let mut server = mockito::Server::new_async().await;
    let week_n = server
      .mock("GET", "/rest/v1/new_training_plans")
      .match_query(week_mock_query(this_week))
      .match_header("authorization", "Bearer access-user-1")
      .with_status(200)
      .with_body(json!([plan_row_json("p1", &monday, &[("ex-a", 3, 10), ("ex-b", 4, 8)])]).to_string())
      .expect(2)
      .create_async()
      .await;
    let week_n1 = server
      .mock("GET", "/rest/v1/new_training_plans")
      .match_query(week_mock_query(following))
      .with_status(200)
      .with_body(json!([plan_row_json("p2", &wednesday, &[("ex-c", 5, 5)])]).to_string())
      .expect(1)
      .create_async()
      .await;

    let app = tauri::test::mock_app();
    app.manage(test_state(&pool, &server.url(), true).await);

    let current = get_week_schedule(app.state()).await.unwrap();
    assert_eq!(current.days.len(), 7);
    assert_eq!(current.days[0].day_name, "Monday");
    assert_eq!(current.days[0].plan_id.as_deref(), Some("p1"));

    let next = next_week(app.state()).await.unwrap();
    assert_eq!((next.window.start - current.window.start).num_days(), 7);
    assert_eq!(next.days[2].plan_id.as_deref(), Some("p2"));
    assert!(next.days[0].is_rest_day());

    let back = previous_week(app.state()).await.unwrap();
    assert_eq!(back, current);

    week_n.assert_async().await;
    week_n1.assert_async().await;

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  #[serial]
  async fn test_failed_week_fetch_still_returns_seven_days() {
    let pool = setup_test_db().await;
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/rest/v1/new_training_plans")
      .match_query(Matcher::Any)
      .with_status(500)
      .with_body(r#"{"message":"down"}"#)
      .create_async()
      .await;

    let app = tauri::test::mock_app();
    app.manage(test_state(&pool, &server.url(), true).await);

    let week = get_week_schedule(app.state()).await.unwrap();
    assert_eq!(week.days.len(), 7);
    assert!(week.days.iter().all(|d| d.is_rest_day()));

    teardown_test_db(pool).await;
  }
}
