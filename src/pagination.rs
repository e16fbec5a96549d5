//! Cached, interactive multi-page retrieval.
//!
//! A [`Paginator`] is a lazy, finite, non-restartable sequence of pages.
//! Each call to [`Paginator::next_page`] either serves the page from the
//! cache or fetches it, and between pages the operator decides whether to
//! continue.
//!
//! ```ignore
//! let mut pages = Paginator::new(source, &cache, TerminalPrompt, settings);
//! while let Some(page) = pages.next_page().await {
//!     match page {
//!         Ok(page) => render(&page),
//!         Err(failure) => eprintln!("{}", failure),
//!     }
//! }
//! ```

use dialoguer::Confirm;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore, KeyPart};
use crate::failure::{classify, Classified, FetchFailure};

/// Largest page size the API accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Page size used when neither the command line nor config picks one.
pub const DEFAULT_PER_PAGE: u32 = 30;

/// One batch of items returned by a single fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Authoritative total, for endpoints that report one
  #[serde(default)]
  pub total_count: Option<u64>,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>) -> Self {
    Self {
      items,
      total_count: None,
    }
  }

  pub fn with_total(items: Vec<T>, total_count: u64) -> Self {
    Self {
      items,
      total_count: Some(total_count),
    }
  }
}

/// Caller-supplied controls for one pagination sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
  pub start_page: u32,
  pub per_page: u32,
  /// Whether to offer a continuation prompt between pages
  pub interactive: bool,
}

impl PageSettings {
  /// Normalize raw values: pages start at 1, sizes fall within 1..=MAX_PER_PAGE.
  pub fn new(start_page: u32, per_page: u32, interactive: bool) -> Self {
    Self {
      start_page: start_page.max(1),
      per_page: per_page.clamp(1, MAX_PER_PAGE),
      interactive,
    }
  }
}

impl Default for PageSettings {
  fn default() -> Self {
    Self::new(1, DEFAULT_PER_PAGE, false)
  }
}

/// Per-invocation pagination state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
  pub current_page: u32,
  pub per_page: u32,
  pub has_more: bool,
  pub interactive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// The current page has not been loaded yet
  Pending,
  /// The current page was handed out and more may follow
  Loaded,
  Done,
}

/// A paginated remote query.
pub trait PageSource {
  type Item: Serialize + DeserializeOwned + Send;

  /// Operation tag; always the first cache key component.
  fn operation(&self) -> &'static str;

  /// Filter parameters in a stable order.
  fn filters(&self) -> Vec<KeyPart>;

  /// Fetch one page from the remote API.
  fn fetch(
    &self,
    page: u32,
    per_page: u32,
  ) -> BoxFuture<'_, Result<Page<Self::Item>, FetchFailure>>;
}

/// Cache key for one page of a source: operation tag, filters, page, page size.
pub fn page_key<S: PageSource + ?Sized>(source: &S, page: u32, per_page: u32) -> CacheKey {
  let mut parts = vec![KeyPart::from(source.operation())];
  parts.extend(source.filters());
  parts.push(KeyPart::from(page));
  parts.push(KeyPart::from(per_page));
  CacheKey::build(parts)
}

/// Yes/no continuation question.
pub trait Prompt {
  fn confirm(&mut self, question: &str) -> bool;
}

impl<P: Prompt + ?Sized> Prompt for &mut P {
  fn confirm(&mut self, question: &str) -> bool {
    (**self).confirm(question)
  }
}

/// Prompt on the controlling terminal. Defaults to "no"; an unusable
/// terminal counts as "no" too.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
  fn confirm(&mut self, question: &str) -> bool {
    // Blocking read on the runtime thread; nothing else is in flight while
    // the operator decides
    match Confirm::new().with_prompt(question).default(false).interact() {
      Ok(answer) => answer,
      Err(e) => {
        warn!(error = %e, "continuation prompt failed");
        false
      }
    }
  }
}

/// Totals for a completed sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
  pub pages: u32,
  pub items: usize,
  /// Pages that had to be fetched remotely
  pub fetches: u32,
}

/// Drives a [`PageSource`] page by page through the cache.
pub struct Paginator<'a, S: PageSource, P: Prompt> {
  source: S,
  cache: &'a CacheStore,
  prompt: P,
  state: PaginationState,
  phase: Phase,
  fetches: u32,
}

impl<'a, S: PageSource, P: Prompt> Paginator<'a, S, P> {
  pub fn new(source: S, cache: &'a CacheStore, prompt: P, settings: PageSettings) -> Self {
    Self {
      source,
      cache,
      prompt,
      state: PaginationState {
        current_page: settings.start_page,
        per_page: settings.per_page,
        has_more: false,
        interactive: settings.interactive,
      },
      phase: Phase::Pending,
      fetches: 0,
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> &PaginationState {
    &self.state
  }

  #[cfg(test)]
  pub fn phase(&self) -> Phase {
    self.phase
  }

  /// Ask the operator whether to load the next page. There is nothing past
  /// page `u32::MAX`, so the sequence ends there without asking.
  fn continue_to_next(&mut self) -> bool {
    let Some(next) = self.state.current_page.checked_add(1) else {
      debug!(page = self.state.current_page, "last addressable page reached");
      return false;
    };

    let question = format!("Load page {}?", next);
    if self.prompt.confirm(&question) {
      self.state.current_page = next;
      self.phase = Phase::Pending;
      true
    } else {
      debug!(page = self.state.current_page, "operator stopped pagination");
      false
    }
  }

  /// Produce the next page, or `None` once the sequence is over.
  ///
  /// A failure is yielded once and ends the sequence.
  pub async fn next_page(&mut self) -> Option<Result<Page<S::Item>, Classified>> {
    match self.phase {
      Phase::Done => return None,
      Phase::Loaded => {
        if !self.continue_to_next() {
          self.phase = Phase::Done;
          return None;
        }
      }
      Phase::Pending => {}
    }

    let key = page_key(&self.source, self.state.current_page, self.state.per_page);
    let page = match self.cache.get::<Page<S::Item>>(&key) {
      Some(page) => page,
      None => {
        debug!(
          operation = self.source.operation(),
          page = self.state.current_page,
          per_page = self.state.per_page,
          "fetching page"
        );
        self.fetches += 1;
        let fetched = self
          .source
          .fetch(self.state.current_page, self.state.per_page)
          .await;

        match fetched {
          Ok(page) => {
            self.cache.set(&key, &page);
            page
          }
          Err(failure) => {
            let classified = classify(&failure);
            info!(
              operation = self.source.operation(),
              status = ?failure.status,
              category = ?classified.category,
              "fetch failed"
            );
            self.state.has_more = false;
            self.phase = Phase::Done;
            return Some(Err(classified));
          }
        }
      }
    };

    // A full page means there may be more; a true last page of exactly
    // per_page items costs one extra, empty fetch.
    self.state.has_more = page.items.len() == self.state.per_page as usize;
    self.phase = if self.state.has_more && self.state.interactive {
      Phase::Loaded
    } else {
      Phase::Done
    };

    Some(Ok(page))
  }

  /// Drain the sequence, rendering each page as it arrives.
  ///
  /// On failure, pages rendered so far stay rendered and the classified
  /// failure is returned.
  pub async fn run<R>(mut self, mut render: R) -> Result<Summary, Classified>
  where
    R: FnMut(&Page<S::Item>, &PaginationState),
  {
    let mut summary = Summary::default();

    while let Some(result) = self.next_page().await {
      let page = result?;
      summary.pages += 1;
      summary.items += page.items.len();
      render(&page, &self.state);
    }

    summary.fetches = self.fetches;
    Ok(summary)
  }
}
