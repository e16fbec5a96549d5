//! Available commands and their dispatch onto paginated sources.

use clap::{Subcommand, ValueEnum};
use color_eyre::Result;
use tracing::{info, warn};

use crate::cache::{CacheStore, NoopStorage, SqliteStorage};
use crate::config::Config;
use crate::failure::Classified;
use crate::github::sources::{
  IssueList, IssueSearch, PullRequestList, ReleaseList, RepoList, RepoSearch,
};
use crate::github::{GithubClient, RepoRef};
use crate::pagination::{PageSettings, PageSource, Paginator, TerminalPrompt};
use crate::render::{self, Row};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Pull requests
  #[command(subcommand)]
  Pr(PrCommand),
  /// Issues
  #[command(subcommand)]
  Issue(IssueCommand),
  /// Repositories
  #[command(subcommand)]
  Repo(RepoCommand),
  /// Search repositories or issues
  #[command(subcommand)]
  Search(SearchCommand),
  /// Releases
  #[command(subcommand)]
  Release(ReleaseCommand),
  /// Inspect or clear the response cache
  #[command(subcommand)]
  Cache(CacheCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PrCommand {
  /// List pull requests in a repository
  #[command(alias = "ls")]
  List {
    /// OWNER/REPO, or REPO with default_owner configured
    repo: String,
    #[arg(short, long, value_enum)]
    state: Option<StateFilter>,
  },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum IssueCommand {
  /// List issues in a repository
  #[command(alias = "ls")]
  List {
    /// OWNER/REPO, or REPO with default_owner configured
    repo: String,
    #[arg(short, long, value_enum)]
    state: Option<StateFilter>,
    /// Comma-separated label names
    #[arg(short, long)]
    label: Option<String>,
    /// Login of the assignee, `none` or `*`
    #[arg(short, long)]
    assignee: Option<String>,
  },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RepoCommand {
  /// List repositories of OWNER, or your own when omitted
  #[command(alias = "ls")]
  List {
    owner: Option<String>,
    #[arg(long, value_enum)]
    sort: Option<RepoSort>,
  },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SearchCommand {
  /// Search repositories
  Repos {
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
    #[arg(long, value_enum)]
    sort: Option<SearchSort>,
  },
  /// Search issues and pull requests
  Issues {
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
  },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseCommand {
  /// List releases of a repository
  #[command(alias = "ls")]
  List {
    /// OWNER/REPO, or REPO with default_owner configured
    repo: String,
  },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
  /// Remove every cached response
  Clear,
  /// Show where the cache lives and how many entries it holds
  Status,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
  Open,
  Closed,
  All,
}

impl StateFilter {
  pub fn as_str(self) -> &'static str {
    match self {
      StateFilter::Open => "open",
      StateFilter::Closed => "closed",
      StateFilter::All => "all",
    }
  }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoSort {
  Created,
  Updated,
  Pushed,
  FullName,
}

impl RepoSort {
  pub fn as_str(self) -> &'static str {
    match self {
      RepoSort::Created => "created",
      RepoSort::Updated => "updated",
      RepoSort::Pushed => "pushed",
      RepoSort::FullName => "full_name",
    }
  }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
  Stars,
  Forks,
  Updated,
}

impl SearchSort {
  pub fn as_str(self) -> &'static str {
    match self {
      SearchSort::Stars => "stars",
      SearchSort::Forks => "forks",
      SearchSort::Updated => "updated",
    }
  }
}

/// Everything one invocation needs, built once in `main`.
pub struct Context {
  pub config: Config,
  pub cache: CacheStore,
  pub client: GithubClient,
}

impl Context {
  /// Build the context. An unusable cache database is not fatal: the
  /// invocation continues uncached.
  pub fn new(config: Config, no_cache: bool) -> Result<Self> {
    let cache = if no_cache || !config.cache.enabled {
      CacheStore::new(NoopStorage)
    } else {
      match SqliteStorage::open(config.cache.path.as_deref()) {
        Ok(storage) => CacheStore::new(storage),
        Err(e) => {
          warn!(error = %e, "cache unavailable, continuing without it");
          CacheStore::new(NoopStorage)
        }
      }
    };

    Self::with_cache(config, cache)
  }

  pub fn with_cache(config: Config, cache: CacheStore) -> Result<Self> {
    let client = GithubClient::new(&config)?;
    Ok(Self {
      config,
      cache,
      client,
    })
  }

  fn resolve_repo(&self, repo: &str) -> Result<RepoRef> {
    RepoRef::resolve(repo, self.config.default_owner.as_deref())
  }
}

/// How a command ended, short of a setup error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Completed,
  /// A fetch failed; the message goes to the operator
  Failed(Classified),
}

/// Run one command.
pub async fn execute(ctx: &Context, command: Command, settings: PageSettings) -> Result<Outcome> {
  let outcome = match command {
    Command::Pr(PrCommand::List { repo, state }) => {
      let source = PullRequestList {
        client: &ctx.client,
        repo: ctx.resolve_repo(&repo)?,
        state: state.map(|s| s.as_str().to_string()),
      };
      list(ctx, source, settings).await
    }
    Command::Issue(IssueCommand::List {
      repo,
      state,
      label,
      assignee,
    }) => {
      let source = IssueList {
        client: &ctx.client,
        repo: ctx.resolve_repo(&repo)?,
        state: state.map(|s| s.as_str().to_string()),
        label,
        assignee,
      };
      list(ctx, source, settings).await
    }
    Command::Repo(RepoCommand::List { owner, sort }) => {
      let source = RepoList {
        client: &ctx.client,
        owner: owner.or_else(|| ctx.config.default_owner.clone()),
        sort: sort.map(|s| s.as_str().to_string()),
      };
      list(ctx, source, settings).await
    }
    Command::Search(SearchCommand::Repos { query, sort }) => {
      let source = RepoSearch {
        client: &ctx.client,
        query: query.join(" "),
        sort: sort.map(|s| s.as_str().to_string()),
      };
      list(ctx, source, settings).await
    }
    Command::Search(SearchCommand::Issues { query }) => {
      let source = IssueSearch {
        client: &ctx.client,
        query: query.join(" "),
      };
      list(ctx, source, settings).await
    }
    Command::Release(ReleaseCommand::List { repo }) => {
      let source = ReleaseList {
        client: &ctx.client,
        repo: ctx.resolve_repo(&repo)?,
      };
      list(ctx, source, settings).await
    }
    Command::Cache(CacheCommand::Clear) => {
      ctx.cache.clear();
      info!("cache cleared");
      println!("Cache cleared.");
      Outcome::Completed
    }
    Command::Cache(CacheCommand::Status) => {
      println!("location: {}", ctx.cache.location());
      println!("entries:  {}", ctx.cache.entry_count());
      println!("ttl:      {} minutes", CacheStore::TTL_MINUTES);
      Outcome::Completed
    }
  };

  Ok(outcome)
}

/// Page through a source, printing each page as it arrives.
async fn list<S>(ctx: &Context, source: S, settings: PageSettings) -> Outcome
where
  S: PageSource,
  S::Item: Row,
{
  let operation = source.operation();
  let result = Paginator::new(source, &ctx.cache, TerminalPrompt, settings)
    .run(|page, state| {
      if let Err(e) = render::print_page(page, state) {
        warn!(error = %e, "failed to write page");
      }
    })
    .await;

  match result {
    Ok(summary) => {
      info!(
        operation,
        pages = summary.pages,
        items = summary.items,
        fetches = summary.fetches,
        "command finished"
      );
      Outcome::Completed
    }
    Err(classified) => Outcome::Failed(classified),
  }
}
