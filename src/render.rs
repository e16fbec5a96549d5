//! Plain terminal tables for fetched pages.

use chrono::DateTime;
use crossterm::style::{Color, Stylize};
use std::io::{self, Write};

use crate::github::types::{Issue, PullRequest, Release, Repository};
use crate::pagination::{Page, PaginationState};

/// Cells longer than this are truncated
const MAX_CELL_WIDTH: usize = 60;

/// An item that renders as one table row.
pub trait Row {
  fn columns(&self) -> Vec<String>;

  /// Colour of the first column
  fn accent(&self) -> Color {
    Color::Cyan
  }
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for an issue, pull request or release state
pub fn status_color(state: &str) -> Color {
  match state {
    "open" => Color::Green,
    "merged" => Color::Magenta,
    "closed" => Color::Red,
    "draft" | "prerelease" => Color::Yellow,
    _ => Color::White,
  }
}

/// `2024-05-01T10:00:00Z` -> `2024-05-01`; anything unparseable is kept.
fn short_date(timestamp: &str) -> String {
  DateTime::parse_from_rfc3339(timestamp)
    .map(|dt| dt.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|_| timestamp.to_string())
}

pub fn page_header(state: &PaginationState, count: usize, total: Option<u64>) -> String {
  match total {
    Some(total) => format!(
      "page {} ({} items, of {} total)",
      state.current_page, count, total
    ),
    None => format!("page {} ({} items)", state.current_page, count),
  }
}

/// Pad cells so columns line up; the last column is left ragged.
pub fn layout(rows: &[Vec<String>]) -> Vec<Vec<String>> {
  let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
  let mut widths = vec![0usize; columns];
  for row in rows {
    for (i, cell) in row.iter().enumerate() {
      widths[i] = widths[i].max(cell.chars().count());
    }
  }

  rows
    .iter()
    .map(|row| {
      row
        .iter()
        .enumerate()
        .map(|(i, cell)| {
          if i + 1 == row.len() {
            cell.clone()
          } else {
            format!("{:<width$}", cell, width = widths[i])
          }
        })
        .collect()
    })
    .collect()
}

/// Print a page header followed by its rows.
pub fn print_page<T: Row>(page: &Page<T>, state: &PaginationState) -> io::Result<()> {
  let mut out = io::stdout().lock();

  writeln!(
    out,
    "{}",
    page_header(state, page.items.len(), page.total_count).bold()
  )?;

  if page.items.is_empty() {
    writeln!(out, "{}", "no results".dim())?;
    return Ok(());
  }

  let cells: Vec<Vec<String>> = page
    .items
    .iter()
    .map(|item| {
      item
        .columns()
        .iter()
        .map(|c| truncate(c, MAX_CELL_WIDTH))
        .collect()
    })
    .collect();

  for (item, row) in page.items.iter().zip(layout(&cells)) {
    let mut row = row.into_iter();
    if let Some(first) = row.next() {
      write!(out, "{}", first.with(item.accent()))?;
    }
    for cell in row {
      write!(out, "  {}", cell)?;
    }
    writeln!(out)?;
  }

  Ok(())
}

impl Row for PullRequest {
  fn columns(&self) -> Vec<String> {
    vec![
      format!("#{}", self.number),
      self.title.clone(),
      self.author.clone().unwrap_or_default(),
      self.head.clone(),
      short_date(&self.updated_at),
      self.display_state().to_string(),
    ]
  }

  fn accent(&self) -> Color {
    status_color(self.display_state())
  }
}

impl PullRequest {
  fn display_state(&self) -> &str {
    if self.draft && self.state == "open" {
      "draft"
    } else {
      &self.state
    }
  }
}

impl Row for Issue {
  fn columns(&self) -> Vec<String> {
    let kind = if self.is_pull_request { "pr" } else { "issue" };
    vec![
      format!("#{}", self.number),
      self.title.clone(),
      self.labels.join(", "),
      format!("{} comments", self.comments),
      kind.to_string(),
      self.state.clone(),
    ]
  }

  fn accent(&self) -> Color {
    status_color(&self.state)
  }
}

impl Row for Repository {
  fn columns(&self) -> Vec<String> {
    let visibility = if self.private { "private" } else { "public" };
    vec![
      self.full_name.clone(),
      self.description.clone().unwrap_or_default(),
      self.language.clone().unwrap_or_default(),
      format!("{} stars", self.stars),
      format!("{} forks", self.forks),
      visibility.to_string(),
    ]
  }
}

impl Row for Release {
  fn columns(&self) -> Vec<String> {
    vec![
      self.tag.clone(),
      self.name.clone().unwrap_or_default(),
      self.published_at.as_deref().map(short_date).unwrap_or_default(),
      self.kind().to_string(),
    ]
  }

  fn accent(&self) -> Color {
    status_color(self.kind())
  }
}

impl Release {
  fn kind(&self) -> &'static str {
    if self.draft {
      "draft"
    } else if self.prerelease {
      "prerelease"
    } else {
      "latest"
    }
  }
}
