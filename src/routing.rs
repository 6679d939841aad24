//! Route guard for the dashboard pages.
//!
//! Runs before a protected page is shown: signed-out users go to the login
//! page, coaches and athletes are sent to their own dashboards.

use serde::Serialize;

use crate::auth::{current_session, get_user, AuthUser};
use crate::db::DbPool;
use crate::models::Profile;
use crate::queries::profiles::get_athlete_by_id;
use crate::supabase::{SupabaseClient, SupabaseError};

pub const LOGIN_PATH: &str = "/login";
pub const ATHLETE_HOME: &str = "/dashboard";
pub const COACH_HOME: &str = "/coach-dashboard";
pub const PROTECTED_PREFIXES: [&str; 3] = ["/dashboard", "/coach-dashboard", "/athlete"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Coach,
  Athlete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "path", rename_all = "lowercase")]
pub enum RouteDecision {
  Continue,
  Redirect(String),
}

/// `path` is `prefix` itself or a page below it (`/dashboard/x`, not `/dashboards`).
fn under(path: &str, prefix: &str) -> bool {
  path == prefix
    || path
      .strip_prefix(prefix)
      .is_some_and(|rest| rest.starts_with('/'))
}

pub fn is_protected(path: &str) -> bool {
  PROTECTED_PREFIXES.iter().any(|p| under(path, p))
}

/// The one place roles are decided. Coaches are flagged server-side, either
/// in the token's app metadata or on their profile.
pub fn role_for(user: &AuthUser, profile: Option<&Profile>) -> Role {
  let claims_coach = user.app_metadata.role.as_deref() == Some("coach");
  let admin_profile = profile.is_some_and(|p| p.admin);

  if claims_coach || admin_profile {
    Role::Coach
  } else {
    Role::Athlete
  }
}

pub fn decide_route(path: &str, user: Option<(&AuthUser, Role)>) -> RouteDecision {
  let Some((_, role)) = user else {
    let public = path.starts_with(LOGIN_PATH) || path.starts_with("/auth");
    return if is_protected(path) && !public {
      RouteDecision::Redirect(LOGIN_PATH.to_string())
    } else {
      RouteDecision::Continue
    };
  };

  match role {
    Role::Coach if under(path, ATHLETE_HOME) => RouteDecision::Redirect(COACH_HOME.to_string()),
    Role::Athlete if under(path, COACH_HOME) || under(path, "/athlete") => {
      RouteDecision::Redirect(ATHLETE_HOME.to_string())
    }
    _ => RouteDecision::Continue,
  }
}

/// Signed-in user with their resolved role, if the stored session is still good.
pub async fn resolve_user(
  client: &SupabaseClient,
  db: &DbPool,
) -> Result<Option<(AuthUser, Role)>, SupabaseError> {
  let Some(session) = current_session(client, db).await? else {
    return Ok(None);
  };
  let authed = client.with_access_token(&session.access_token);

  let user = match get_user(&authed).await {
    Ok(user) => user,
    Err(SupabaseError::NotAuthenticated) => return Ok(None),
    Err(e) => {
      tracing::warn!("could not verify user, treating as signed out: {}", e);
      return Ok(None);
    }
  };

  let profile = match get_athlete_by_id(&authed, &user.id).await {
    Ok(profile) => Some(profile),
    Err(e) => {
      tracing::debug!(user_id = %user.id, "no profile for role check: {}", e);
      None
    }
  };

  let role = role_for(&user, profile.as_ref());
  Ok(Some((user, role)))
}

/// Decide what to do with a navigation to `path`.
pub async fn guard(
  client: &SupabaseClient,
  db: &DbPool,
  path: &str,
) -> Result<RouteDecision, SupabaseError> {
  let user = resolve_user(client, db).await?;
  let decision = decide_route(path, user.as_ref().map(|(u, r)| (u, *r)));

  if let RouteDecision::Redirect(to) = &decision {
    tracing::info!(from = %path, to = %to, "redirecting");
  }
  Ok(decision)
}
