//! Classification of failed API calls into messages an operator can act on.

use std::fmt;
use thiserror::Error;

/// Structured failure reported by a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}")]
pub struct FetchFailure {
  /// HTTP status, absent for transport errors
  pub status: Option<u16>,
  /// Provider-supplied message (`message` field of the error body)
  pub message: Option<String>,
  /// Seconds to wait before retrying, when the provider said so
  pub retry_after: Option<u64>,
  /// Description of the failure itself, used when nothing better exists
  pub description: String,
}

impl FetchFailure {
  /// A failure with a response status.
  pub fn http(status: u16, message: Option<String>, retry_after: Option<u64>) -> Self {
    Self {
      status: Some(status),
      message,
      retry_after,
      description: format!("request failed with status {}", status),
    }
  }

  /// A failure that never produced a response.
  pub fn transport(description: impl Into<String>) -> Self {
    Self {
      status: None,
      message: None,
      retry_after: None,
      description: description.into(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
  Unauthenticated,
  RateLimited,
  ForbiddenScopes,
  NotFound,
  Validation,
  SecondaryRateLimited,
  Blocked,
  Unknown,
}

/// A categorized failure and the message to show for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
  pub category: FailureCategory,
  pub message: String,
}

impl fmt::Display for Classified {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

fn wait_hint(retry_after: Option<u64>, fallback: &str) -> String {
  match retry_after {
    Some(secs) => format!("Try again in {} seconds.", secs),
    None => fallback.to_string(),
  }
}

/// Map a failure to a category and message. First matching rule wins.
pub fn classify(failure: &FetchFailure) -> Classified {
  let mentions_rate_limit = failure
    .message
    .as_deref()
    .map(|m| m.to_lowercase().contains("rate limit"))
    .unwrap_or(false);

  let (category, message) = match failure.status {
    Some(401) => (
      FailureCategory::Unauthenticated,
      "Authentication failed: re-authenticate by setting GHX_TOKEN (or GITHUB_TOKEN) to a valid token."
        .to_string(),
    ),
    Some(403) if mentions_rate_limit => (
      FailureCategory::RateLimited,
      format!(
        "API rate limit exceeded. {}",
        wait_hint(failure.retry_after, "Please wait a while before trying again.")
      ),
    ),
    Some(403) => (
      FailureCategory::ForbiddenScopes,
      "Access forbidden: your token may be missing a required permission scope (e.g. repo, read:org)."
        .to_string(),
    ),
    Some(404) => (
      FailureCategory::NotFound,
      "Resource not found. Check the owner, repository or identifier.".to_string(),
    ),
    Some(422) => (
      FailureCategory::Validation,
      match failure.message.as_deref() {
        Some(msg) => format!("Validation failed: {}", msg),
        None => "Validation failed: the request parameters were rejected.".to_string(),
      },
    ),
    Some(429) => (
      FailureCategory::SecondaryRateLimited,
      format!(
        "Secondary rate limit hit. {}",
        wait_hint(failure.retry_after, "Wait a minute before retrying.")
      ),
    ),
    Some(451) => (
      FailureCategory::Blocked,
      "Unavailable for legal reasons: this content is blocked in your region or has been taken down."
        .to_string(),
    ),
    _ => (
      FailureCategory::Unknown,
      failure
        .message
        .clone()
        .unwrap_or_else(|| failure.description.clone()),
    ),
  };

  Classified { category, message }
}
