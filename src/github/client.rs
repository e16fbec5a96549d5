use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::failure::FetchFailure;
use crate::github::api_types::{
  ApiError, ApiIssue, ApiPullRequest, ApiRelease, ApiRepository, ApiSearchResponse,
};
use crate::github::types::{Issue, PullRequest, Release, RepoRef, Repository};
use crate::pagination::Page;

const API_VERSION: &str = "2022-11-28";

/// GitHub REST API client
#[derive(Clone)]
pub struct GithubClient {
  http: reqwest::Client,
  base: Url,
}

impl GithubClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.api_url)
      .map_err(|e| eyre!("Invalid api_url '{}': {}", config.api_url, e))?;
    if base.cannot_be_a_base() {
      return Err(eyre!("Invalid api_url '{}': not a base URL", config.api_url));
    }

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

    match Config::get_api_token() {
      Some(token) => {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
          .map_err(|e| eyre!("GitHub token is not a valid header value: {}", e))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
      }
      None => debug!("no GitHub token set, sending anonymous requests"),
    }

    let http = reqwest::Client::builder()
      .default_headers(headers)
      // GitHub rejects requests without a User-Agent
      .user_agent(concat!("ghx/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  /// Build an endpoint URL under the API root.
  fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    if !query.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }
    url
  }

  /// GET a JSON document, mapping every failure to a [`FetchFailure`].
  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchFailure> {
    debug!(%url, "GET");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| FetchFailure::transport(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(failure_from_response(response).await);
    }

    response
      .json::<T>()
      .await
      .map_err(|e| FetchFailure::transport(format!("Failed to parse response: {}", e)))
  }

  /// List pull requests for a repository
  pub async fn list_pulls(
    &self,
    repo: &RepoRef,
    state: Option<&str>,
    page: u32,
    per_page: u32,
  ) -> Result<Page<PullRequest>, FetchFailure> {
    let mut query = paging(page, per_page);
    push_opt(&mut query, "state", state);

    let url = self.endpoint(&["repos", repo.owner.as_str(), repo.name.as_str(), "pulls"], &query);
    let pulls: Vec<ApiPullRequest> = self.get_json(url).await?;

    Ok(Page::new(
      pulls.into_iter().map(ApiPullRequest::into_domain).collect(),
    ))
  }

  /// List issues (including pull requests) for a repository
  pub async fn list_issues(
    &self,
    repo: &RepoRef,
    state: Option<&str>,
    label: Option<&str>,
    assignee: Option<&str>,
    page: u32,
    per_page: u32,
  ) -> Result<Page<Issue>, FetchFailure> {
    let mut query = paging(page, per_page);
    push_opt(&mut query, "state", state);
    push_opt(&mut query, "labels", label);
    push_opt(&mut query, "assignee", assignee);

    let url = self.endpoint(&["repos", repo.owner.as_str(), repo.name.as_str(), "issues"], &query);
    let issues: Vec<ApiIssue> = self.get_json(url).await?;

    Ok(Page::new(
      issues.into_iter().map(ApiIssue::into_domain).collect(),
    ))
  }

  /// List repositories for `owner`, or for the authenticated user
  pub async fn list_repos(
    &self,
    owner: Option<&str>,
    sort: Option<&str>,
    page: u32,
    per_page: u32,
  ) -> Result<Page<Repository>, FetchFailure> {
    let mut query = paging(page, per_page);
    push_opt(&mut query, "sort", sort);

    let url = match owner {
      Some(owner) => self.endpoint(&["users", owner, "repos"], &query),
      None => self.endpoint(&["user", "repos"], &query),
    };
    let repos: Vec<ApiRepository> = self.get_json(url).await?;

    Ok(Page::new(repos.into_iter().map(Repository::from).collect()))
  }

  /// List releases for a repository
  pub async fn list_releases(
    &self,
    repo: &RepoRef,
    page: u32,
    per_page: u32,
  ) -> Result<Page<Release>, FetchFailure> {
    let url = self.endpoint(
      &["repos", repo.owner.as_str(), repo.name.as_str(), "releases"],
      &paging(page, per_page),
    );
    let releases: Vec<ApiRelease> = self.get_json(url).await?;

    Ok(Page::new(releases.into_iter().map(Release::from).collect()))
  }

  /// Search repositories
  pub async fn search_repos(
    &self,
    q: &str,
    sort: Option<&str>,
    page: u32,
    per_page: u32,
  ) -> Result<Page<Repository>, FetchFailure> {
    let mut query = vec![("q", q.to_string())];
    push_opt(&mut query, "sort", sort);
    query.extend(paging(page, per_page));

    let url = self.endpoint(&["search", "repositories"], &query);
    let response: ApiSearchResponse<ApiRepository> = self.get_json(url).await?;

    Ok(Page::with_total(
      response.items.into_iter().map(Repository::from).collect(),
      response.total_count,
    ))
  }

  /// Search issues and pull requests
  pub async fn search_issues(
    &self,
    q: &str,
    page: u32,
    per_page: u32,
  ) -> Result<Page<Issue>, FetchFailure> {
    let mut query = vec![("q", q.to_string())];
    query.extend(paging(page, per_page));

    let url = self.endpoint(&["search", "issues"], &query);
    let response: ApiSearchResponse<ApiIssue> = self.get_json(url).await?;

    Ok(Page::with_total(
      response.items.into_iter().map(ApiIssue::into_domain).collect(),
      response.total_count,
    ))
  }
}

fn paging(page: u32, per_page: u32) -> Vec<(&'static str, String)> {
  vec![("page", page.to_string()), ("per_page", per_page.to_string())]
}

fn push_opt(query: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<&str>) {
  if let Some(value) = value {
    query.push((name, value.to_string()));
  }
}

/// Turn a non-2xx response into a structured failure.
async fn failure_from_response(response: Response) -> FetchFailure {
  let status = response.status().as_u16();
  let retry_after = retry_after_secs(response.headers(), Utc::now());
  let message = response.json::<ApiError>().await.ok().map(|e| e.message);

  FetchFailure::http(status, message, retry_after)
}

/// Seconds to wait, from `Retry-After` or, once the quota is spent, from
/// `x-ratelimit-reset`.
fn retry_after_secs(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
  let header_num = |name: &str| -> Option<i64> {
    headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<i64>().ok())
  };

  if let Some(secs) = header_num(RETRY_AFTER.as_str()) {
    return Some(secs.max(0) as u64);
  }

  if header_num("x-ratelimit-remaining") == Some(0) {
    let reset = header_num("x-ratelimit-reset")?;
    return Some((reset - now.timestamp()).max(0) as u64);
  }

  None
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(api_url: &str) -> GithubClient {
    let config = Config {
      api_url: api_url.to_string(),
      ..Config::default()
    };
    GithubClient::new(&config).unwrap()
  }

  fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
      map.insert(*name, HeaderValue::from_static(*value));
    }
    map
  }

  #[test]
  fn test_endpoint_on_public_api() {
    let url = client("https://api.github.com").endpoint(
      &["repos", "acme", "widgets", "pulls"],
      &[("state", "open".to_string()), ("page", "2".to_string())],
    );
    assert_eq!(
      url.as_str(),
      "https://api.github.com/repos/acme/widgets/pulls?state=open&page=2"
    );
  }

  #[test]
  fn test_endpoint_keeps_enterprise_prefix() {
    let url = client("https://ghe.example.com/api/v3/").endpoint(&["user", "repos"], &paging(1, 30));
    assert_eq!(
      url.as_str(),
      "https://ghe.example.com/api/v3/user/repos?page=1&per_page=30"
    );
  }

  #[test]
  fn test_endpoint_encodes_query() {
    let url = client("https://api.github.com").endpoint(
      &["search", "repositories"],
      &[("q", "language:rust stars:>100".to_string())],
    );
    assert_eq!(
      url.as_str(),
      "https://api.github.com/search/repositories?q=language%3Arust+stars%3A%3E100"
    );
  }

  #[test]
  fn test_invalid_api_url() {
    let config = Config {
      api_url: "not a url".to_string(),
      ..Config::default()
    };
    assert!(GithubClient::new(&config).is_err());
  }

  #[test]
  fn test_retry_after_header() {
    let now = Utc::now();
    assert_eq!(retry_after_secs(&headers(&[("retry-after", "120")]), now), Some(120));
  }

  #[test]
  fn test_retry_after_from_rate_limit_reset() {
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let map = headers(&[
      ("x-ratelimit-remaining", "0"),
      ("x-ratelimit-reset", "1700000090"),
    ]);
    assert_eq!(retry_after_secs(&map, now), Some(90));
  }

  #[test]
  fn test_no_retry_hint_while_quota_remains() {
    let now = Utc::now();
    let map = headers(&[
      ("x-ratelimit-remaining", "12"),
      ("x-ratelimit-reset", "1700000090"),
    ]);
    assert_eq!(retry_after_secs(&map, now), None);
    assert_eq!(retry_after_secs(&HeaderMap::new(), now), None);
  }
}
