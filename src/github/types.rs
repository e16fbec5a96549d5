use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pull request summary for list views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
  pub number: u64,
  pub title: String,
  pub state: String,
  pub author: Option<String>,
  pub draft: bool,
  pub head: String,
  pub updated_at: String,
}

/// Issue summary, also used for issue search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
  pub number: u64,
  pub title: String,
  pub state: String,
  pub author: Option<String>,
  pub labels: Vec<String>,
  pub comments: u64,
  /// GitHub lists pull requests among issues
  pub is_pull_request: bool,
}

/// Repository summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
  pub full_name: String,
  pub description: Option<String>,
  pub language: Option<String>,
  pub stars: u64,
  pub forks: u64,
  pub private: bool,
  pub updated_at: Option<String>,
}

/// Release summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
  pub tag: String,
  pub name: Option<String>,
  pub draft: bool,
  pub prerelease: bool,
  pub published_at: Option<String>,
}

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
  pub owner: String,
  pub name: String,
}

impl RepoRef {
  /// Parse `owner/repo`, or a bare `repo` owned by `default_owner`.
  pub fn resolve(input: &str, default_owner: Option<&str>) -> Result<Self> {
    let input = input.trim();
    let (owner, name) = match input.split_once('/') {
      Some((owner, name)) => (owner, name),
      None => match default_owner {
        Some(owner) => (owner, input),
        None => {
          return Err(eyre!(
            "Repository '{}' has no owner. Use OWNER/REPO or set default_owner in config.",
            input
          ))
        }
      },
    };

    if owner.is_empty() || name.is_empty() || name.contains('/') {
      return Err(eyre!("Invalid repository '{}': expected OWNER/REPO", input));
    }

    Ok(Self {
      owner: owner.to_string(),
      name: name.to_string(),
    })
  }
}

impl fmt::Display for RepoRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.owner, self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolve_full_name() {
    let repo = RepoRef::resolve("acme/widgets", None).unwrap();
    assert_eq!(repo.owner, "acme");
    assert_eq!(repo.name, "widgets");
    assert_eq!(repo.to_string(), "acme/widgets");
  }

  #[test]
  fn test_resolve_uses_default_owner() {
    let repo = RepoRef::resolve("widgets", Some("acme")).unwrap();
    assert_eq!(repo.to_string(), "acme/widgets");
  }

  #[test]
  fn test_resolve_rejects_bad_input() {
    assert!(RepoRef::resolve("widgets", None).is_err());
    assert!(RepoRef::resolve("/widgets", None).is_err());
    assert!(RepoRef::resolve("acme/", None).is_err());
    assert!(RepoRef::resolve("a/b/c", None).is_err());
  }
}
