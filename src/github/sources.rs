//! Paginated GitHub queries.
//!
//! Each query fixes its operation tag and the order of its key parameters;
//! changing either invalidates previously cached pages.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::cache::KeyPart;
use crate::failure::FetchFailure;
use crate::pagination::{Page, PageSource};

use super::client::GithubClient;
use super::types::{Issue, PullRequest, Release, RepoRef, Repository};

/// Optional filter that shares its position with other optional filters.
/// Tagged with its name so dropping an unset neighbour can't make two
/// queries look alike.
fn tagged(name: &str, value: &Option<String>) -> KeyPart {
  value.as_ref().map(|v| format!("{}={}", name, v)).into()
}

/// Pull requests of one repository
pub struct PullRequestList<'a> {
  pub client: &'a GithubClient,
  pub repo: RepoRef,
  pub state: Option<String>,
}

impl PageSource for PullRequestList<'_> {
  type Item = PullRequest;

  fn operation(&self) -> &'static str {
    "pr.list"
  }

  fn filters(&self) -> Vec<KeyPart> {
    vec![
      (&self.repo.owner).into(),
      (&self.repo.name).into(),
      self.state.as_ref().into(),
    ]
  }

  fn fetch(&self, page: u32, per_page: u32) -> BoxFuture<'_, Result<Page<PullRequest>, FetchFailure>> {
    async move {
      self
        .client
        .list_pulls(&self.repo, self.state.as_deref(), page, per_page)
        .await
    }
    .boxed()
  }
}

/// Issues of one repository
pub struct IssueList<'a> {
  pub client: &'a GithubClient,
  pub repo: RepoRef,
  pub state: Option<String>,
  pub label: Option<String>,
  pub assignee: Option<String>,
}

impl PageSource for IssueList<'_> {
  type Item = Issue;

  fn operation(&self) -> &'static str {
    "issue.list"
  }

  fn filters(&self) -> Vec<KeyPart> {
    vec![
      (&self.repo.owner).into(),
      (&self.repo.name).into(),
      tagged("state", &self.state),
      tagged("label", &self.label),
      tagged("assignee", &self.assignee),
    ]
  }

  fn fetch(&self, page: u32, per_page: u32) -> BoxFuture<'_, Result<Page<Issue>, FetchFailure>> {
    async move {
      self
        .client
        .list_issues(
          &self.repo,
          self.state.as_deref(),
          self.label.as_deref(),
          self.assignee.as_deref(),
          page,
          per_page,
        )
        .await
    }
    .boxed()
  }
}

/// Repositories of a user or organization, or of the authenticated user
pub struct RepoList<'a> {
  pub client: &'a GithubClient,
  pub owner: Option<String>,
  pub sort: Option<String>,
}

impl PageSource for RepoList<'_> {
  type Item = Repository;

  fn operation(&self) -> &'static str {
    "repo.list"
  }

  fn filters(&self) -> Vec<KeyPart> {
    vec![self.owner.as_ref().into(), tagged("sort", &self.sort)]
  }

  fn fetch(&self, page: u32, per_page: u32) -> BoxFuture<'_, Result<Page<Repository>, FetchFailure>> {
    async move {
      self
        .client
        .list_repos(self.owner.as_deref(), self.sort.as_deref(), page, per_page)
        .await
    }
    .boxed()
  }
}

/// Releases of one repository
pub struct ReleaseList<'a> {
  pub client: &'a GithubClient,
  pub repo: RepoRef,
}

impl PageSource for ReleaseList<'_> {
  type Item = Release;

  fn operation(&self) -> &'static str {
    "release.list"
  }

  fn filters(&self) -> Vec<KeyPart> {
    vec![(&self.repo.owner).into(), (&self.repo.name).into()]
  }

  fn fetch(&self, page: u32, per_page: u32) -> BoxFuture<'_, Result<Page<Release>, FetchFailure>> {
    async move { self.client.list_releases(&self.repo, page, per_page).await }.boxed()
  }
}

/// Repository search
pub struct RepoSearch<'a> {
  pub client: &'a GithubClient,
  pub query: String,
  pub sort: Option<String>,
}

impl PageSource for RepoSearch<'_> {
  type Item = Repository;

  fn operation(&self) -> &'static str {
    "search.repos"
  }

  fn filters(&self) -> Vec<KeyPart> {
    vec![(&self.query).into(), self.sort.as_ref().into()]
  }

  fn fetch(&self, page: u32, per_page: u32) -> BoxFuture<'_, Result<Page<Repository>, FetchFailure>> {
    async move {
      self
        .client
        .search_repos(&self.query, self.sort.as_deref(), page, per_page)
        .await
    }
    .boxed()
  }
}

/// Issue and pull request search
pub struct IssueSearch<'a> {
  pub client: &'a GithubClient,
  pub query: String,
}

impl PageSource for IssueSearch<'_> {
  type Item = Issue;

  fn operation(&self) -> &'static str {
    "search.issues"
  }

  fn filters(&self) -> Vec<KeyPart> {
    vec![(&self.query).into()]
  }

  fn fetch(&self, page: u32, per_page: u32) -> BoxFuture<'_, Result<Page<Issue>, FetchFailure>> {
    async move { self.client.search_issues(&self.query, page, per_page).await }.boxed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::pagination::page_key as key_for;

  fn client() -> GithubClient {
    GithubClient::new(&Config::default()).unwrap()
  }

  fn repo() -> RepoRef {
    RepoRef::resolve("acme/widgets", None).unwrap()
  }

  #[test]
  fn test_pull_request_key() {
    let client = client();
    let source = PullRequestList {
      client: &client,
      repo: repo(),
      state: Some("open".to_string()),
    };
    assert_eq!(
      key_for(&source, 2, 30).as_str(),
      "pr.list::acme::widgets::open::2::30"
    );
  }

  #[test]
  fn test_unset_filters_are_dropped() {
    let client = client();
    let source = IssueList {
      client: &client,
      repo: repo(),
      state: None,
      label: Some("bug".to_string()),
      assignee: None,
    };
    assert_eq!(
      key_for(&source, 1, 30).as_str(),
      "issue.list::acme::widgets::label=bug::1::30"
    );
  }

  #[test]
  fn test_issue_filters_do_not_share_keys() {
    let client = client();
    let issues = |state: Option<&str>, label: Option<&str>, assignee: Option<&str>| IssueList {
      client: &client,
      repo: repo(),
      state: state.map(str::to_string),
      label: label.map(str::to_string),
      assignee: assignee.map(str::to_string),
    };

    assert_ne!(
      key_for(&issues(Some("open"), None, None), 1, 30),
      key_for(&issues(None, Some("open"), None), 1, 30)
    );
    assert_ne!(
      key_for(&issues(None, None, Some("none")), 1, 30),
      key_for(&issues(None, Some("none"), None), 1, 30)
    );
  }

  #[test]
  fn test_repo_owner_and_sort_do_not_share_keys() {
    let client = client();
    let by_sort = RepoList {
      client: &client,
      owner: None,
      sort: Some("updated".to_string()),
    };
    let by_owner = RepoList {
      client: &client,
      owner: Some("updated".to_string()),
      sort: None,
    };
    assert_ne!(key_for(&by_sort, 1, 30), key_for(&by_owner, 1, 30));
  }

  #[test]
  fn test_same_params_different_operations() {
    let client = client();
    let repos = RepoSearch {
      client: &client,
      query: "rust".to_string(),
      sort: None,
    };
    let issues = IssueSearch {
      client: &client,
      query: "rust".to_string(),
    };
    assert_ne!(key_for(&repos, 1, 30), key_for(&issues, 1, 30));
  }

  #[test]
  fn test_repo_list_without_owner() {
    let client = client();
    let source = RepoList {
      client: &client,
      owner: None,
      sort: Some("updated".to_string()),
    };
    assert_eq!(key_for(&source, 1, 100).as_str(), "repo.list::sort=updated::1::100");
  }

  #[test]
  fn test_release_key() {
    let client = client();
    let source = ReleaseList {
      client: &client,
      repo: repo(),
    };
    assert_eq!(
      key_for(&source, 1, 10).as_str(),
      "release.list::acme::widgets::1::10"
    );
  }
}
