//! Serde-deserializable types matching GitHub REST API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::{Issue, PullRequest, Release, Repository};

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiLabel {
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiBranchRef {
  #[serde(rename = "ref")]
  pub ref_name: String,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ApiError {
  pub message: String,
}

/// Envelope for `/search/*` endpoints
#[derive(Debug, Deserialize)]
pub struct ApiSearchResponse<T> {
  pub total_count: u64,
  #[serde(default = "Vec::new")]
  pub items: Vec<T>,
}

// ============================================================================
// Pull requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiPullRequest {
  pub number: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub draft: bool,
  pub merged_at: Option<String>,
  pub user: Option<ApiUser>,
  pub head: ApiBranchRef,
  #[serde(default)]
  pub updated_at: String,
}

impl ApiPullRequest {
  pub fn into_domain(self) -> PullRequest {
    let state = if self.merged_at.is_some() {
      "merged".to_string()
    } else {
      self.state
    };

    PullRequest {
      number: self.number,
      title: self.title,
      state,
      author: self.user.map(|u| u.login),
      draft: self.draft,
      head: self.head.ref_name,
      updated_at: self.updated_at,
    }
  }
}

// ============================================================================
// Issues - used by both the repo issues and search endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiIssue {
  pub number: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub state: String,
  pub user: Option<ApiUser>,
  #[serde(default)]
  pub labels: Vec<ApiLabel>,
  #[serde(default)]
  pub comments: u64,
  // Present (with link metadata) only when the issue is a pull request
  pub pull_request: Option<serde_json::Value>,
}

impl ApiIssue {
  pub fn into_domain(self) -> Issue {
    Issue {
      number: self.number,
      title: self.title,
      state: self.state,
      author: self.user.map(|u| u.login),
      labels: self.labels.into_iter().map(|l| l.name).collect(),
      comments: self.comments,
      is_pull_request: self.pull_request.is_some(),
    }
  }
}

// ============================================================================
// Repositories
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiRepository {
  pub full_name: String,
  pub description: Option<String>,
  pub language: Option<String>,
  #[serde(default)]
  pub stargazers_count: u64,
  #[serde(default)]
  pub forks_count: u64,
  #[serde(default)]
  pub private: bool,
  pub updated_at: Option<String>,
}

impl From<ApiRepository> for Repository {
  fn from(repo: ApiRepository) -> Self {
    Repository {
      full_name: repo.full_name,
      description: repo.description,
      language: repo.language,
      stars: repo.stargazers_count,
      forks: repo.forks_count,
      private: repo.private,
      updated_at: repo.updated_at,
    }
  }
}

// ============================================================================
// Releases
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiRelease {
  pub tag_name: String,
  pub name: Option<String>,
  #[serde(default)]
  pub draft: bool,
  #[serde(default)]
  pub prerelease: bool,
  pub published_at: Option<String>,
}

impl From<ApiRelease> for Release {
  fn from(release: ApiRelease) -> Self {
    Release {
      tag: release.tag_name,
      // GitHub sends "" for unnamed releases
      name: release.name.filter(|n| !n.is_empty()),
      draft: release.draft,
      prerelease: release.prerelease,
      published_at: release.published_at,
    }
  }
}
