use super::PROFILES_TABLE;
use crate::models::Profile;
use crate::supabase::{SupabaseClient, SupabaseError};

/// Fetch one athlete's profile.
pub async fn get_athlete_by_id(client: &SupabaseClient, id: &str) -> Result<Profile, SupabaseError> {
  client
    .from(PROFILES_TABLE)
    .select("*")
    .eq("id", id)
    .single()
    .await
}

/// Fetch every profile, optionally leaving one out (the athlete a plan is
/// being copied from).
pub async fn get_all_athletes(
  client: &SupabaseClient,
  exclude_id: Option<&str>,
) -> Result<Vec<Profile>, SupabaseError> {
  let mut query = client.from(PROFILES_TABLE).select("*");
  if let Some(id) = exclude_id.filter(|id| !id.is_empty()) {
    query = query.neq("id", id);
  }
  query.execute().await
}
