//! Weekly schedule reconciliation
//!
//! An athlete's week is fetched as one date-range query and then laid out as
//! seven rows, Monday first. Each row is paired with at most one plan by
//! exact `yyyy-MM-dd` match. Nothing is cached: every navigation re-queries.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::{format_date, TrainingPlan, TrainingPlanExercise};
use crate::queries::training::get_weekly_training_plans;
use crate::supabase::{SupabaseClient, SupabaseError};

pub const DAYS_OF_WEEK: [&str; 7] = [
  "Monday",
  "Tuesday",
  "Wednesday",
  "Thursday",
  "Friday",
  "Saturday",
  "Sunday",
];

/// ---------------------------------------------------------------------------
/// Week Window: Monday..Sunday
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

impl WeekWindow {
  /// The Monday-start week that contains `date`.
  pub fn containing(date: NaiveDate) -> Self {
    let start = week_start(date);
    Self {
      start,
      end: start + Duration::days(6),
    }
  }

  /// Shift by whole weeks (negative goes back).
  pub fn shifted(&self, weeks: i64) -> Self {
    let start = self.start + Duration::weeks(weeks);
    Self {
      start,
      end: start + Duration::days(6),
    }
  }

  pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
    let start = self.start;
    (0..7).map(move |i| start + Duration::days(i))
  }

  /// e.g. "Apr 1 - Apr 7, 2024"
  pub fn label(&self) -> String {
    format!(
      "{} - {}",
      self.start.format("%b %-d"),
      self.end.format("%b %-d, %Y")
    )
  }
}

/// ---------------------------------------------------------------------------
/// Reconciled Week
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DaySchedule {
  pub day_name: String,
  pub date: String,
  pub plan_id: Option<String>,
  pub exercises: Vec<TrainingPlanExercise>,
}

impl DaySchedule {
  /// "No exercises scheduled for this day"
  pub fn is_rest_day(&self) -> bool {
    self.exercises.is_empty()
  }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekSchedule {
  pub window: WeekWindow,
  pub label: String,
  pub days: Vec<DaySchedule>,
}

/// Pair each of the seven days with the first plan whose date string
/// matches. Plans outside the window are ignored.
pub fn reconcile_week(window: WeekWindow, plans: &[TrainingPlan]) -> WeekSchedule {
  let days = window
    .days()
    .zip(DAYS_OF_WEEK)
    .map(|(day, name)| {
      let date = format_date(day);
      let plan = plans.iter().find(|p| p.date_key() == date);
      DaySchedule {
        day_name: name.to_string(),
        date,
        plan_id: plan.map(|p| p.id.clone()),
        exercises: plan.map(|p| p.exercises_data.clone()).unwrap_or_default(),
      }
    })
    .collect();

  WeekSchedule {
    window,
    label: window.label(),
    days,
  }
}

/// ---------------------------------------------------------------------------
/// Week View: navigation + fetch bookkeeping
/// ---------------------------------------------------------------------------

/// One outstanding week fetch. A ticket only applies to the view that issued
/// it, and only while it is the latest one issued, so a slow response can't
/// overwrite a newer week or land in another athlete's view.
#[derive(Debug, Clone)]
pub struct FetchTicket {
  generation: u64,
  pub athlete_id: String,
  pub window: WeekWindow,
}

impl FetchTicket {
  pub async fn fetch(&self, client: &SupabaseClient) -> Result<Vec<TrainingPlan>, SupabaseError> {
    get_weekly_training_plans(client, &self.athlete_id, self.window.start, self.window.end).await
  }
}

#[derive(Debug, Clone)]
pub struct WeekView {
  athlete_id: String,
  window: WeekWindow,
  plans: Vec<TrainingPlan>,
  generation: u64,
}

impl WeekView {
  pub fn new(athlete_id: &str, today: NaiveDate) -> Self {
    Self {
      athlete_id: athlete_id.to_string(),
      window: WeekWindow::containing(today),
      plans: Vec::new(),
      generation: 0,
    }
  }

  pub fn athlete_id(&self) -> &str {
    &self.athlete_id
  }

  /// Plans from the most recent successful fetch.
  pub fn plans(&self) -> &[TrainingPlan] {
    &self.plans
  }

  pub fn schedule(&self) -> WeekSchedule {
    reconcile_week(self.window, &self.plans)
  }

  /// Issue a fetch for the current window.
  pub fn refresh(&mut self) -> FetchTicket {
    self.generation += 1;
    FetchTicket {
      generation: self.generation,
      athlete_id: self.athlete_id.clone(),
      window: self.window,
    }
  }

  /// Move by `weeks` and issue a fetch for the new window.
  pub fn navigate(&mut self, weeks: i64) -> FetchTicket {
    self.window = self.window.shifted(weeks);
    self.refresh()
  }

  /// Record a fetch result. Failures are logged and leave the previous
  /// plans in place. Returns whether the plans were replaced.
  pub fn apply(
    &mut self,
    ticket: &FetchTicket,
    result: Result<Vec<TrainingPlan>, SupabaseError>,
  ) -> bool {
    if ticket.athlete_id != self.athlete_id || ticket.window != self.window {
      tracing::debug!(
        week = %ticket.window.label(),
        "discarding week fetch issued for another view"
      );
      return false;
    }

    if ticket.generation != self.generation {
      tracing::debug!(
        week = %ticket.window.label(),
        "discarding week fetch superseded by a newer navigation"
      );
      return false;
    }

    match result {
      Ok(plans) => {
        tracing::debug!(week = %ticket.window.label(), plans = plans.len(), "week loaded");
        self.plans = plans;
        true
      }
      Err(e) => {
        tracing::warn!(week = %ticket.window.label(), "Error fetching training plans: {}", e);
        false
      }
    }
  }
}

/// ---------------------------------------------------------------------------
/// Month Calendar (coach view)
/// ---------------------------------------------------------------------------

/// Every day of the calendar month containing `date`.
pub fn month_days(date: NaiveDate) -> Vec<NaiveDate> {
  let Some(first) = date.with_day(1) else {
    return Vec::new();
  };
  first
    .iter_days()
    .take_while(|d| d.month() == first.month())
    .collect()
}

pub fn plan_for_date(plans: &[TrainingPlan], date: NaiveDate) -> Option<&TrainingPlan> {
  let key = format_date(date);
  plans.iter().find(|p| p.date_key() == key)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
  pub date: String,
  pub plan_id: Option<String>,
  pub exercise_count: usize,
}

/// One cell per day of the month containing `date`, each marked with the
/// plan scheduled on it (if any).
pub fn month_calendar(date: NaiveDate, plans: &[TrainingPlan]) -> Vec<CalendarDay> {
  month_days(date)
    .into_iter()
    .map(|day| {
      let plan = plan_for_date(plans, day);
      CalendarDay {
        date: format_date(day),
        plan_id: plan.map(|p| p.id.clone()),
        exercise_count: plan.map_or(0, |p| p.exercises_data.len()),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  #[test]
  fn test_window_is_monday_start() {
    // 2024-04-04 is a Thursday
    let w = WeekWindow::containing(date("2024-04-04"));
    assert_eq!(w.start, date("2024-04-01"));
    assert_eq!(w.end, date("2024-04-07"));

    // Sunday belongs to the week that started six days earlier
    let sunday = WeekWindow::containing(date("2024-04-07"));
    assert_eq!(sunday.start, date("2024-04-01"));
    assert_eq!(week_start(date("2024-04-01")), date("2024-04-01"));

    assert_eq!(w.label(), "Apr 1 - Apr 7, 2024");
    assert_eq!(w.shifted(1).start, date("2024-04-08"));
    assert_eq!(w.shifted(-1).end, date("2024-03-31"));
  }

  #[test]
  fn test_reconcile_always_seven_days_in_order() {
    let windows = [
      WeekWindow::containing(date("2024-02-28")),
      WeekWindow::containing(date("2024-12-31")),
      WeekWindow::containing(date("2025-06-15")),
    ];
    let plan_sets = [
      vec![],
      vec![mock_plan("p1", "2024-04-01", &[("ex-a", 3, 10)])],
      vec![
        mock_plan("p1", "2024-02-26", &[("ex-a", 3, 10)]),
        mock_plan("p2", "2030-01-01", &[("ex-b", 1, 1)]),
      ],
    ];

    for window in windows {
      for plans in &plan_sets {
        let schedule = reconcile_week(window, plans);
        assert_eq!(schedule.days.len(), 7);
        let names: Vec<_> = schedule.days.iter().map(|d| d.day_name.as_str()).collect();
        assert_eq!(names, DAYS_OF_WEEK);
        assert_eq!(schedule.days[0].date, format_date(window.start));
      }
    }
  }

  #[test]
  fn test_reconcile_pairs_by_exact_date() {
    let window = WeekWindow::containing(date("2024-04-01"));
    let plans = vec![
      mock_plan("p1", "2024-04-01", &[("ex-a", 3, 10), ("ex-b", 4, 8)]),
      mock_plan("p3", "2024-04-03", &[("ex-c", 5, 5)]),
      mock_plan("p-dup", "2024-04-03", &[("ex-d", 1, 1)]),
      mock_plan("p-out", "2024-04-08", &[("ex-e", 1, 1)]),
    ];

    let schedule = reconcile_week(window, &plans);
    assert_eq!(schedule.days[0].plan_id.as_deref(), Some("p1"));
    assert_eq!(schedule.days[0].exercises.len(), 2);
    assert!(schedule.days[1].is_rest_day());
    // First plan for a date wins
    assert_eq!(schedule.days[2].plan_id.as_deref(), Some("p3"));
    assert!(schedule.days[6].is_rest_day());
  }

  #[test]
  fn test_stale_ticket_is_discarded() {
    let mut view = WeekView::new("athlete-1", date("2024-04-01"));
    let first = view.navigate(1);
    let second = view.navigate(1);

    let late = vec![mock_plan("old", "2024-04-08", &[("ex-a", 3, 10)])];
    assert!(!view.apply(&first, Ok(late)));
    assert!(view.plans().is_empty());

    let fresh = vec![mock_plan("new", "2024-04-15", &[("ex-a", 3, 10)])];
    assert!(view.apply(&second, Ok(fresh)));
    assert_eq!(view.plans()[0].id, "new");
  }

  #[test]
  fn test_failed_fetch_keeps_previous_plans() {
    let mut view = WeekView::new("athlete-1", date("2024-04-01"));
    let t = view.refresh();
    view.apply(&t, Ok(vec![mock_plan("p1", "2024-04-01", &[("ex-a", 3, 10)])]));

    let t = view.refresh();
    assert!(!view.apply(&t, Err(SupabaseError::NotAuthenticated)));
    assert_eq!(view.plans().len(), 1);
  }

  #[test]
  fn test_ticket_from_another_view_is_discarded() {
    let today = date("2024-04-01");
    let ticket_a = WeekView::new("athlete-a", today).refresh();

    // Fresh view for another athlete reaches the same generation
    let mut b = WeekView::new("athlete-b", today);
    let ticket_b = b.refresh();
    let plans_a = vec![mock_plan("a-plan", "2024-04-01", &[("ex-a", 3, 10)])];
    assert!(!b.apply(&ticket_a, Ok(plans_a)));
    assert!(b.plans().is_empty());

    // Same athlete, view restarted on another week
    let mut other_week = WeekView::new("athlete-a", date("2024-04-15"));
    other_week.refresh();
    let plans = vec![mock_plan("p1", "2024-04-01", &[("ex-a", 3, 10)])];
    assert!(!other_week.apply(&ticket_a, Ok(plans)));
    assert!(other_week.plans().is_empty());

    let own = vec![mock_plan("b-plan", "2024-04-02", &[("ex-b", 4, 8)])];
    assert!(b.apply(&ticket_b, Ok(own)));
    assert_eq!(b.plans()[0].id, "b-plan");
  }

  #[test]
  fn test_month_days_and_plan_lookup() {
    let feb = month_days(date("2024-02-17"));
    assert_eq!(feb.len(), 29);
    assert_eq!(feb[0], date("2024-02-01"));
    assert_eq!(month_days(date("2023-04-30")).len(), 30);

    let plans = vec![mock_plan("p1", "2024-02-10", &[("ex-a", 3, 10)])];
    assert!(plan_for_date(&plans, date("2024-02-10")).is_some());
    assert!(plan_for_date(&plans, date("2024-02-11")).is_none());
  }

  #[test]
  fn test_month_calendar_marks_planned_days() {
    let plans = vec![
      mock_plan("p1", "2024-02-10", &[("ex-a", 3, 10), ("ex-b", 4, 8)]),
      mock_plan("p-march", "2024-03-10", &[("ex-a", 3, 10)]),
    ];

    let days = month_calendar(date("2024-02-17"), &plans);
    assert_eq!(days.len(), 29);
    assert_eq!(days[9].date, "2024-02-10");
    assert_eq!(days[9].plan_id.as_deref(), Some("p1"));
    assert_eq!(days[9].exercise_count, 2);
    assert_eq!(days.iter().filter(|d| d.plan_id.is_some()).count(), 1);
  }
}
