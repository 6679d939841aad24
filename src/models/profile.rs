use serde::{Deserialize, Serialize};

use super::de;

/// A row of the `profiles` table. Created by the backend on signup and
/// read-only from here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
  #[serde(deserialize_with = "de::id")]
  pub id: String,
  #[serde(default, deserialize_with = "de::null_default")]
  pub email: String,
  #[serde(default, deserialize_with = "de::null_default")]
  pub first_name: String,
  #[serde(default, deserialize_with = "de::null_default")]
  pub plan: String,
  #[serde(default, deserialize_with = "de::null_default")]
  pub admin: bool,
}

impl Profile {
  /// First word of the stored name, or "Athlete" when there is none.
  pub fn display_first_name(&self) -> &str {
    first_word_or(&self.first_name, "Athlete")
  }

  /// Two-letter avatar initials, uppercased.
  pub fn initials(&self) -> String {
    initials_of(self.display_first_name())
  }

  /// Case-insensitive match on email or name, as used by the coach's athlete search.
  pub fn matches_search(&self, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
      return true;
    }
    self.email.to_lowercase().contains(&query) || self.first_name.to_lowercase().contains(&query)
  }
}

/// A profile as the coach screens show it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AthleteCard {
  #[serde(flatten)]
  pub profile: Profile,
  pub display_name: String,
  pub initials: String,
}

impl From<Profile> for AthleteCard {
  fn from(profile: Profile) -> Self {
    Self {
      display_name: profile.display_first_name().to_string(),
      initials: profile.initials(),
      profile,
    }
  }
}

pub(crate) fn first_word_or<'a>(name: &'a str, fallback: &'a str) -> &'a str {
  name.split_whitespace().next().unwrap_or(fallback)
}

pub(crate) fn initials_of(name: &str) -> String {
  name.chars().take(2).collect::<String>().to_uppercase()
}
