//! Thin client for the hosted Supabase project.
//!
//! Table access goes through PostgREST (`/rest/v1`), authentication through
//! GoTrue (`/auth/v1`, see [`crate::auth`]). Row-level security lives on the
//! server; this client only decides which bearer token to send.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const REST_PATH: &str = "rest/v1";
const AUTH_PATH: &str = "auth/v1";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// PostgREST code for "`.single()` matched zero (or many) rows".
const NO_ROWS_CODE: &str = "PGRST116";
const SINGLE_OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
  pub url: String,
  pub anon_key: String,
  pub site_url: String,
}

impl SupabaseConfig {
  pub fn new(url: &str, anon_key: &str) -> Self {
    Self {
      url: url.trim_end_matches('/').to_string(),
      anon_key: anon_key.to_string(),
      site_url: DEFAULT_SITE_URL.to_string(),
    }
  }

  pub fn from_env() -> Result<Self, SupabaseError> {
    let url = env::var("SUPABASE_URL")
      .map_err(|_| SupabaseError::MissingConfig("SUPABASE_URL".into()))?;
    let anon_key = env::var("SUPABASE_ANON_KEY")
      .map_err(|_| SupabaseError::MissingConfig("SUPABASE_ANON_KEY".into()))?;

    let mut config = Self::new(&url, &anon_key);
    if let Ok(site_url) = env::var("SITE_URL") {
      config.site_url = site_url.trim_end_matches('/').to_string();
    }
    Ok(config)
  }

  /// Where the password-reset email sends the user back to.
  pub fn password_reset_redirect(&self) -> String {
    format!("{}/auth/reset-password", self.site_url)
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),

  #[error("Supabase error ({status}): {message}")]
  Api {
    status: u16,
    code: Option<String>,
    message: String,
  },

  #[error("No matching row")]
  NotFound,

  #[error("Failed to parse response: {0}")]
  Parse(String),

  #[error("Not authenticated")]
  NotAuthenticated,

  #[error("Database error: {0}")]
  Database(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

impl Serialize for SupabaseError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

impl From<sqlx::Error> for SupabaseError {
  fn from(e: sqlx::Error) -> Self {
    SupabaseError::Database(e.to_string())
  }
}

/// Union of the error bodies PostgREST and GoTrue send back.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
  #[serde(default, deserialize_with = "crate::models::de::opt_id")]
  code: Option<String>,
  error_code: Option<String>,
  message: Option<String>,
  msg: Option<String>,
  error: Option<String>,
  error_description: Option<String>,
}

pub(crate) fn api_error(status: StatusCode, body: &str) -> SupabaseError {
  let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();

  if parsed.code.as_deref() == Some(NO_ROWS_CODE) {
    return SupabaseError::NotFound;
  }
  if status == StatusCode::UNAUTHORIZED {
    return SupabaseError::NotAuthenticated;
  }

  let message = parsed
    .error_description
    .or(parsed.msg)
    .or(parsed.message)
    .or(parsed.error)
    .unwrap_or_else(|| {
      if body.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
      } else {
        body.chars().take(500).collect()
      }
    });

  SupabaseError::Api {
    status: status.as_u16(),
    code: parsed.error_code.or(parsed.code),
    message,
  }
}

/// Decode a JSON body, turning non-2xx responses into [`SupabaseError`].
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SupabaseError> {
  let status = response.status();
  let text = response.text().await?;

  if !status.is_success() {
    return Err(api_error(status, &text));
  }

  serde_json::from_str(&text).map_err(|e| {
    tracing::debug!(
      "unparseable response (first 500 chars): {}",
      text.chars().take(500).collect::<String>()
    );
    SupabaseError::Parse(e.to_string())
  })
}

/// Like [`read_json`] for endpoints whose body we don't need.
pub(crate) async fn read_empty(response: Response) -> Result<(), SupabaseError> {
  let status = response.status();
  if status.is_success() {
    return Ok(());
  }
  let text = response.text().await.unwrap_or_default();
  Err(api_error(status, &text))
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SupabaseClient {
  http: Client,
  config: SupabaseConfig,
  access_token: Option<String>,
}

impl SupabaseClient {
  pub fn new(config: SupabaseConfig) -> Self {
    Self {
      http: Client::new(),
      config,
      access_token: None,
    }
  }

  pub fn config(&self) -> &SupabaseConfig {
    &self.config
  }

  /// A copy of this client that acts as the signed-in user.
  pub fn with_access_token(&self, access_token: &str) -> Self {
    let mut client = self.clone();
    client.access_token = Some(access_token.to_string());
    client
  }

  pub fn access_token(&self) -> Option<&str> {
    self.access_token.as_deref()
  }

  /// Start a query against a table.
  pub fn from(&self, table: &str) -> QueryBuilder<'_> {
    QueryBuilder {
      client: self,
      table: table.to_string(),
      params: Vec::new(),
    }
  }

  pub(crate) fn auth_url(&self, path: &str) -> String {
    format!("{}/{}/{}", self.config.url, AUTH_PATH, path.trim_start_matches('/'))
  }

  fn headers(&self) -> HeaderMap {
    let bearer = self.access_token.as_deref().unwrap_or(&self.config.anon_key);
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&self.config.anon_key) {
      headers.insert("apikey", v);
    }
    if let Ok(v) = HeaderValue::from_str(&format!("Bearer {}", bearer)) {
      headers.insert(AUTHORIZATION, v);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
  }

  pub(crate) fn get(&self, url: &str) -> RequestBuilder {
    self.http.get(url).headers(self.headers())
  }

  pub(crate) fn post(&self, url: &str) -> RequestBuilder {
    self.http.post(url).headers(self.headers())
  }

  pub(crate) fn put(&self, url: &str) -> RequestBuilder {
    self.http.put(url).headers(self.headers())
  }
}

/// ---------------------------------------------------------------------------
/// PostgREST Query Builder
/// ---------------------------------------------------------------------------

/// Accumulates `select`, filters and ordering, then runs as a fetch or insert.
pub struct QueryBuilder<'a> {
  client: &'a SupabaseClient,
  table: String,
  params: Vec<(String, String)>,
}

impl<'a> QueryBuilder<'a> {
  pub fn select(mut self, columns: &str) -> Self {
    self.params.push(("select".into(), columns.into()));
    self
  }

  pub fn eq(self, column: &str, value: &str) -> Self {
    self.filter(column, "eq", value)
  }

  pub fn neq(self, column: &str, value: &str) -> Self {
    self.filter(column, "neq", value)
  }

  pub fn gte(self, column: &str, value: &str) -> Self {
    self.filter(column, "gte", value)
  }

  pub fn lte(self, column: &str, value: &str) -> Self {
    self.filter(column, "lte", value)
  }

  pub fn order(mut self, column: &str, ascending: bool) -> Self {
    let direction = if ascending { "asc" } else { "desc" };
    self.params.push(("order".into(), format!("{}.{}", column, direction)));
    self
  }

  fn filter(mut self, column: &str, op: &str, value: &str) -> Self {
    self.params.push((column.into(), format!("{}.{}", op, value)));
    self
  }

  fn url(&self) -> Result<String, SupabaseError> {
    let mut url = Url::parse(&format!(
      "{}/{}/{}",
      self.client.config.url, REST_PATH, self.table
    ))?;
    if !self.params.is_empty() {
      let mut pairs = url.query_pairs_mut();
      for (key, value) in &self.params {
        pairs.append_pair(key, value);
      }
    }
    Ok(url.to_string())
  }

  /// Run as a fetch returning every matching row.
  pub async fn execute<T: DeserializeOwned>(self) -> Result<Vec<T>, SupabaseError> {
    let url = self.url()?;
    tracing::debug!(table = %self.table, "GET {}", url);
    let response = self.client.get(&url).send().await?;
    read_json(response).await
  }

  /// Run as a fetch expecting exactly one row; zero rows is [`SupabaseError::NotFound`].
  pub async fn single<T: DeserializeOwned>(self) -> Result<T, SupabaseError> {
    let url = self.url()?;
    tracing::debug!(table = %self.table, "GET (single) {}", url);
    let response = self
      .client
      .get(&url)
      .header(ACCEPT, SINGLE_OBJECT_MEDIA_TYPE)
      .send()
      .await?;
    read_json(response).await
  }

  /// Insert rows and return them as stored.
  pub async fn insert<B, T>(self, rows: &B) -> Result<Vec<T>, SupabaseError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let url = self.url()?;
    tracing::debug!(table = %self.table, "POST {}", url);
    let response = self
      .client
      .post(&url)
      .header("Prefer", "return=representation")
      .json(rows)
      .send()
      .await?;
    read_json(response).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_config_from_env() {
    temp_env::with_vars(
      [
        ("SUPABASE_URL", Some("https://example.supabase.co/")),
        ("SUPABASE_ANON_KEY", Some("anon")),
        ("SITE_URL", Some("https://vdp.example")),
      ],
      || {
        let config = SupabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "https://example.supabase.co");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.password_reset_redirect(), "https://vdp.example/auth/reset-password");
      },
    );
  }

  #[test]
  #[serial]
  fn test_config_missing_key() {
    temp_env::with_vars(
      [
        ("SUPABASE_URL", Some("https://example.supabase.co")),
        ("SUPABASE_ANON_KEY", None::<&str>),
      ],
      || {
        let err = SupabaseConfig::from_env().unwrap_err();
        assert!(matches!(err, SupabaseError::MissingConfig(ref name) if name == "SUPABASE_ANON_KEY"));
      },
    );
  }

  #[test]
  fn test_api_error_mapping() {
    let not_found = api_error(
      StatusCode::NOT_ACCEPTABLE,
      r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#,
    );
    assert!(matches!(not_found, SupabaseError::NotFound));

    let auth = api_error(
      StatusCode::BAD_REQUEST,
      r#"{"code":400,"error_code":"weak_password","msg":"Password is too weak"}"#,
    );
    match auth {
      SupabaseError::Api { status, code, message } => {
        assert_eq!(status, 400);
        assert_eq!(code.as_deref(), Some("weak_password"));
        assert_eq!(message, "Password is too weak");
      }
      other => panic!("unexpected error: {:?}", other),
    }

    assert!(matches!(
      api_error(StatusCode::UNAUTHORIZED, ""),
      SupabaseError::NotAuthenticated
    ));
  }

  #[tokio::test]
  async fn test_query_builder_sends_filters_and_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/rest/v1/profiles")
      .match_header("apikey", "anon")
      .match_header("authorization", "Bearer user-token")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("select".into(), "*".into()),
        Matcher::UrlEncoded("id".into(), "neq.a1".into()),
        Matcher::UrlEncoded("order".into(), "email.asc".into()),
      ]))
      .with_status(200)
      .with_body(r#"[{"id":"a2","email":"b@x.io","first_name":"Bo","plan":"basic","admin":false}]"#)
      .create_async()
      .await;

    let client = SupabaseClient::new(SupabaseConfig::new(&server.url(), "anon"))
      .with_access_token("user-token");
    let rows: Vec<crate::models::Profile> = client
      .from("profiles")
      .select("*")
      .neq("id", "a1")
      .order("email", true)
      .execute()
      .await
      .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].first_name, "Bo");
    mock.assert_async().await;
  }
}
