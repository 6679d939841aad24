//! Supabase Auth (GoTrue) operations and the locally stored session.
//!
//! The stored session stands in for the browser's auth cookie: the route
//! guard loads it, refreshes it when it is about to expire, and clears it on
//! sign-out.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::DbPool;
use crate::models::de;
use crate::models::profile::first_word_or;
use crate::supabase::{read_empty, read_json, SupabaseClient, SupabaseError};

const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// ---------------------------------------------------------------------------
/// Users & Sessions
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub full_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub plan: Option<String>,
}

/// Claims set server-side; `role` is what the route guard trusts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppMetadata {
  #[serde(default)]
  pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
  pub id: String,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default, deserialize_with = "de::null_default")]
  pub user_metadata: UserMetadata,
  #[serde(default, deserialize_with = "de::null_default")]
  pub app_metadata: AppMetadata,
}

impl AuthUser {
  pub fn first_name(&self) -> &str {
    first_word_or(self.user_metadata.full_name.as_deref().unwrap_or(""), "Athlete")
  }
}

/// Response from the token endpoint (password and refresh grants)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_in: i64,
  #[serde(default)]
  pub expires_at: Option<i64>,
  pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
  pub user: AuthUser,
}

impl AuthSession {
  pub fn from_response(resp: TokenResponse) -> Self {
    let expires_at = resp
      .expires_at
      .and_then(|ts| DateTime::from_timestamp(ts, 0))
      .unwrap_or_else(|| Utc::now() + Duration::seconds(resp.expires_in));
    Self {
      access_token: resp.access_token,
      refresh_token: resp.refresh_token,
      expires_at,
      user: resp.user,
    }
  }

  pub fn needs_refresh(&self) -> bool {
    let buffer = Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
    Utc::now() + buffer >= self.expires_at
  }
}

/// What signup produced. With email confirmation on, there is no session yet.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
  pub user_id: Option<String>,
  pub session: Option<AuthSession>,
  pub confirmation_required: bool,
}

/// ---------------------------------------------------------------------------
/// Auth API
/// ---------------------------------------------------------------------------

pub async fn sign_up(
  client: &SupabaseClient,
  email: &str,
  password: &str,
  metadata: &UserMetadata,
) -> Result<SignUpOutcome, SupabaseError> {
  let response = client
    .post(&client.auth_url("signup"))
    .json(&json!({
      "email": email,
      "password": password,
      "data": metadata,
    }))
    .send()
    .await?;

  let body: Value = read_json(response).await?;

  // Auto-confirmed projects answer with a session, otherwise with the bare user
  if body.get("access_token").is_some() {
    let token: TokenResponse =
      serde_json::from_value(body).map_err(|e| SupabaseError::Parse(e.to_string()))?;
    let session = AuthSession::from_response(token);
    return Ok(SignUpOutcome {
      user_id: Some(session.user.id.clone()),
      session: Some(session),
      confirmation_required: false,
    });
  }

  let user: Option<AuthUser> = serde_json::from_value(body).ok();
  Ok(SignUpOutcome {
    user_id: user.map(|u| u.id),
    session: None,
    confirmation_required: true,
  })
}

pub async fn sign_in_with_password(
  client: &SupabaseClient,
  email: &str,
  password: &str,
) -> Result<AuthSession, SupabaseError> {
  let response = client
    .post(&client.auth_url("token?grant_type=password"))
    .json(&json!({ "email": email, "password": password }))
    .send()
    .await?;

  let token: TokenResponse = read_json(response).await?;
  Ok(AuthSession::from_response(token))
}

pub async fn refresh_session(
  client: &SupabaseClient,
  refresh_token: &str,
) -> Result<AuthSession, SupabaseError> {
  let response = client
    .post(&client.auth_url("token?grant_type=refresh_token"))
    .json(&json!({ "refresh_token": refresh_token }))
    .send()
    .await?;

  let token: TokenResponse = read_json(response).await?;
  Ok(AuthSession::from_response(token))
}

/// Revoke the session server-side. `client` must carry the user's token.
pub async fn sign_out(client: &SupabaseClient) -> Result<(), SupabaseError> {
  if client.access_token().is_none() {
    return Ok(());
  }
  let response = client.post(&client.auth_url("logout")).send().await?;
  read_empty(response).await
}

pub async fn get_user(client: &SupabaseClient) -> Result<AuthUser, SupabaseError> {
  if client.access_token().is_none() {
    return Err(SupabaseError::NotAuthenticated);
  }
  let response = client.get(&client.auth_url("user")).send().await?;
  read_json(response).await
}

pub async fn reset_password_for_email(
  client: &SupabaseClient,
  email: &str,
) -> Result<(), SupabaseError> {
  let mut url = url::Url::parse(&client.auth_url("recover"))?;
  url
    .query_pairs_mut()
    .append_pair("redirect_to", &client.config().password_reset_redirect());

  let response = client
    .post(url.as_str())
    .json(&json!({ "email": email }))
    .send()
    .await?;
  read_empty(response).await
}

/// Set a new password for the signed-in user (reset-password flow).
pub async fn update_user_password(
  client: &SupabaseClient,
  password: &str,
) -> Result<AuthUser, SupabaseError> {
  if client.access_token().is_none() {
    return Err(SupabaseError::NotAuthenticated);
  }
  let response = client
    .put(&client.auth_url("user"))
    .json(&json!({ "password": password }))
    .send()
    .await?;
  read_json(response).await
}

/// ---------------------------------------------------------------------------
/// Session Storage
/// ---------------------------------------------------------------------------

pub async fn save_session(db: &DbPool, session: &AuthSession) -> Result<(), SupabaseError> {
  let user_json =
    serde_json::to_string(&session.user).map_err(|e| SupabaseError::Parse(e.to_string()))?;

  sqlx::query(
    r#"
    INSERT INTO auth_session (id, access_token, refresh_token, expires_at, user_json)
    VALUES (1, ?1, ?2, ?3, ?4)
    ON CONFLICT(id) DO UPDATE SET
      access_token = excluded.access_token,
      refresh_token = excluded.refresh_token,
      expires_at = excluded.expires_at,
      user_json = excluded.user_json,
      updated_at = CURRENT_TIMESTAMP
    "#,
  )
  .bind(&session.access_token)
  .bind(&session.refresh_token)
  .bind(session.expires_at)
  .bind(&user_json)
  .execute(db)
  .await?;

  Ok(())
}

pub async fn load_session(db: &DbPool) -> Result<Option<AuthSession>, SupabaseError> {
  let row: Option<(String, String, DateTime<Utc>, String)> = sqlx::query_as(
    "SELECT access_token, refresh_token, expires_at, user_json FROM auth_session WHERE id = 1",
  )
  .fetch_optional(db)
  .await?;

  let Some((access_token, refresh_token, expires_at, user_json)) = row else {
    return Ok(None);
  };

  match serde_json::from_str::<AuthUser>(&user_json) {
    Ok(user) => Ok(Some(AuthSession {
      access_token,
      refresh_token,
      expires_at,
      user,
    })),
    Err(e) => {
      tracing::warn!("discarding stored session with unreadable user: {}", e);
      Ok(None)
    }
  }
}

pub async fn clear_session(db: &DbPool) -> Result<(), SupabaseError> {
  sqlx::query("DELETE FROM auth_session WHERE id = 1")
    .execute(db)
    .await?;
  Ok(())
}

/// The stored session, refreshed first if it is close to expiring.
/// `None` means nobody is signed in (or the refresh token was rejected).
pub async fn current_session(
  client: &SupabaseClient,
  db: &DbPool,
) -> Result<Option<AuthSession>, SupabaseError> {
  let Some(session) = load_session(db).await? else {
    return Ok(None);
  };

  if !session.needs_refresh() {
    return Ok(Some(session));
  }

  match refresh_session(client, &session.refresh_token).await {
    Ok(refreshed) => {
      save_session(db, &refreshed).await?;
      tracing::info!(user_id = %refreshed.user.id, "session refreshed");
      Ok(Some(refreshed))
    }
    Err(SupabaseError::Api { .. }) | Err(SupabaseError::NotAuthenticated) => {
      tracing::info!("refresh token rejected, clearing session");
      clear_session(db).await?;
      Ok(None)
    }
    Err(e) => Err(e),
  }
}
