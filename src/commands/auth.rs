use crate::auth::{
  clear_session, current_session, load_session, reset_password_for_email, save_session,
  sign_in_with_password, sign_out as revoke_session, sign_up as register, update_user_password,
  AuthUser, UserMetadata,
};
use crate::commands::signed_in;
use crate::db::AppState;
use crate::supabase::SupabaseError;
use crate::validation::{prepare_signup, validate_new_password, FormErrors, SignupForm};
use serde::Serialize;
use std::sync::Arc;
use tauri::State;

/// ---------------------------------------------------------------------------
/// Sign Up
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpResult {
  /// Form problems; nothing was sent.
  Invalid { errors: FormErrors },
  /// Account created. Without a session the user must confirm by email first.
  Created { confirmation_required: bool },
}

#[tauri::command]
pub async fn sign_up(
  state: State<'_, Arc<AppState>>,
  form: SignupForm,
) -> Result<SignUpResult, SupabaseError> {
  let signup = match prepare_signup(&form) {
    Ok(signup) => signup,
    Err(errors) => return Ok(SignUpResult::Invalid { errors }),
  };

  let metadata = UserMetadata {
    full_name: Some(signup.name.clone()),
    plan: Some(signup.plan.clone()),
  };
  let outcome = register(&state.supabase, &signup.email, &signup.password, &metadata).await?;

  if let Some(session) = &outcome.session {
    state.reset_user_state().await;
    save_session(&state.db, session).await?;
  }

  tracing::info!(user_id = ?outcome.user_id, "account created");
  Ok(SignUpResult::Created {
    confirmation_required: outcome.confirmation_required,
  })
}

/// ---------------------------------------------------------------------------
/// Sign In / Out
/// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn sign_in(
  state: State<'_, Arc<AppState>>,
  email: String,
  password: String,
) -> Result<AuthUser, SupabaseError> {
  let session = sign_in_with_password(&state.supabase, email.trim(), &password).await?;

  state.reset_user_state().await;
  save_session(&state.db, &session).await?;

  tracing::info!(user_id = %session.user.id, "signed in");
  Ok(session.user)
}

/// Revoke the session server-side (best effort) and forget it locally.
#[tauri::command]
pub async fn sign_out(state: State<'_, Arc<AppState>>) -> Result<(), SupabaseError> {
  if let Some(session) = load_session(&state.db).await? {
    let client = state.supabase.with_access_token(&session.access_token);
    if let Err(e) = revoke_session(&client).await {
      tracing::warn!("server-side sign out failed: {}", e);
    }
  }

  clear_session(&state.db).await?;
  state.reset_user_state().await;

  tracing::info!("signed out");
  Ok(())
}

/// The signed-in user plus the greeting name the dashboard header shows.
#[derive(Debug, Serialize)]
pub struct CurrentUser {
  #[serde(flatten)]
  pub user: AuthUser,
  pub first_name: String,
}

impl From<AuthUser> for CurrentUser {
  fn from(user: AuthUser) -> Self {
    Self {
      first_name: user.first_name().to_string(),
      user,
    }
  }
}

#[tauri::command]
pub async fn get_current_user(
  state: State<'_, Arc<AppState>>,
) -> Result<Option<CurrentUser>, SupabaseError> {
  let session = current_session(&state.supabase, &state.db).await?;
  Ok(session.map(|s| s.user.into()))
}

/// ---------------------------------------------------------------------------
/// Password Reset
/// ---------------------------------------------------------------------------

#[tauri::command]
pub async fn request_password_reset(
  state: State<'_, Arc<AppState>>,
  email: String,
) -> Result<(), SupabaseError> {
  reset_password_for_email(&state.supabase, email.trim()).await
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PasswordUpdate {
  Invalid { message: String },
  Updated,
}

/// Set a new password for the user signed in through the reset link.
#[tauri::command]
pub async fn update_password(
  state: State<'_, Arc<AppState>>,
  password: String,
  confirm_password: String,
) -> Result<PasswordUpdate, SupabaseError> {
  let password = match validate_new_password(&password, &confirm_password) {
    Ok(password) => password,
    Err(message) => return Ok(PasswordUpdate::Invalid { message }),
  };

  let (client, _) = signed_in(&state).await?;
  update_user_password(&client, &password).await?;

  tracing::info!("password updated");
  Ok(PasswordUpdate::Updated)
}
