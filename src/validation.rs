//! Form checks run before any auth request is made.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name -> message, for every field that failed.
pub type FormErrors = BTreeMap<&'static str, String>;

const NAME_PUNCTUATION: &[char] = &['.', '\'', ',', '-'];
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";
const MAX_PASSWORD_INPUT: usize = 100;
const DEFAULT_PLAN: &str = "basic";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
  #[serde(default)]
  pub confirm_password: String,
  #[serde(default)]
  pub terms_accepted: bool,
  #[serde(default)]
  pub plan: Option<String>,
}

/// What actually gets sent to the auth server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedSignup {
  pub name: String,
  pub email: String,
  pub password: String,
  pub plan: String,
}

fn valid_name(name: &str) -> bool {
  let len = name.chars().count();
  (2..=50).contains(&len)
    && name
      .chars()
      .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || NAME_PUNCTUATION.contains(&c))
}

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain.
fn valid_email(email: &str) -> bool {
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  if local.is_empty() || domain.contains('@') {
    return false;
  }
  domain
    .char_indices()
    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn has_mixed_case_and_digit(password: &str) -> bool {
  password.chars().any(|c| c.is_ascii_lowercase())
    && password.chars().any(|c| c.is_ascii_uppercase())
    && password.chars().any(|c| c.is_ascii_digit())
}

/// Trim every text field, the way the signup inputs do as they are typed.
fn trimmed(form: &SignupForm) -> SignupForm {
  SignupForm {
    name: form.name.trim().to_string(),
    email: form.email.trim().to_string(),
    password: form.password.trim().to_string(),
    confirm_password: form.confirm_password.trim().to_string(),
    terms_accepted: form.terms_accepted,
    plan: form.plan.clone(),
  }
}

pub fn validate_signup(form: &SignupForm) -> Result<(), FormErrors> {
  let mut errors = FormErrors::new();

  if form.name.is_empty() {
    errors.insert("name", "Name is required".into());
  } else if !valid_name(&form.name) {
    errors.insert("name", "Name appears to be invalid".into());
  }

  if form.email.is_empty() {
    errors.insert("email", "Email is required".into());
  } else if !valid_email(&form.email) {
    errors.insert("email", "Please enter a valid email address".into());
  }

  if form.password.is_empty() {
    errors.insert("password", "Password is required".into());
  } else if form.password.chars().count() < 8 {
    errors.insert("password", "Password must be at least 8 characters".into());
  } else if !has_mixed_case_and_digit(&form.password) {
    errors.insert(
      "password",
      "Password must include uppercase, lowercase, and numbers".into(),
    );
  }

  if form.password != form.confirm_password {
    errors.insert("confirmPassword", "Passwords do not match".into());
  }

  if !form.terms_accepted {
    errors.insert("termsAccepted", "You must accept the terms".into());
  }

  if errors.is_empty() {
    Ok(())
  } else {
    Err(errors)
  }
}

/// HTML-escape the characters that matter in markup.
fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '&' => out.push_str("&amp;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

/// Collapse runs of whitespace in the name and escape it, lowercase the
/// email. The password is passed through untouched.
pub fn sanitize_signup(form: &SignupForm) -> SanitizedSignup {
  let name = form.name.split_whitespace().collect::<Vec<_>>().join(" ");
  SanitizedSignup {
    name: escape_html(&name),
    email: form.email.to_lowercase(),
    password: form.password.clone(),
    plan: form
      .plan
      .clone()
      .filter(|p| !p.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_PLAN.to_string()),
  }
}

/// Trim, validate and sanitize in one step.
pub fn prepare_signup(form: &SignupForm) -> Result<SanitizedSignup, FormErrors> {
  let form = trimmed(form);
  validate_signup(&form)?;
  Ok(sanitize_signup(&form))
}

/// Strength rules for a new password on the reset page. Input beyond 100
/// characters is cut off first. Returns the first failing rule's message.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<String, String> {
  let password: String = password.chars().take(MAX_PASSWORD_INPUT).collect();
  let confirm: String = confirm.chars().take(MAX_PASSWORD_INPUT).collect();

  if password.chars().count() < 8 {
    return Err("Password must be at least 8 characters long".into());
  }
  if !has_mixed_case_and_digit(&password) {
    return Err("Password must include uppercase, lowercase, and numbers".into());
  }
  if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
    return Err("Password should include at least one special character".into());
  }
  if password.chars().any(char::is_whitespace) {
    return Err("Password cannot contain spaces".into());
  }
  if password != confirm {
    return Err("Passwords do not match".into());
  }
  Ok(password)
}
