pub mod auth;
pub mod planner;
pub mod routing;
pub mod schedule;
pub mod tracker;

use crate::auth::{current_session, AuthSession};
use crate::db::AppState;
use crate::supabase::{SupabaseClient, SupabaseError};

/// The stored session (refreshed if needed) and a client acting as that user.
pub(crate) async fn signed_in(
  state: &AppState,
) -> Result<(SupabaseClient, AuthSession), SupabaseError> {
  let session = current_session(&state.supabase, &state.db)
    .await?
    .ok_or(SupabaseError::NotAuthenticated)?;
  let client = state.supabase.with_access_token(&session.access_token);
  Ok((client, session))
}
