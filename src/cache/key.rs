//! Deterministic cache keys built from ordered scalar parameters.

use std::fmt;

/// Separator placed between key components. Not escaped: a component that
/// itself contains `::` can collide with a different tuple.
pub const SEPARATOR: &str = "::";

/// One component of a cache key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
  Str(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  Absent,
}

impl KeyPart {
  fn render(&self) -> Option<String> {
    match self {
      KeyPart::Str(s) => Some(s.clone()),
      KeyPart::Int(n) => Some(n.to_string()),
      KeyPart::Float(n) => Some(n.to_string()),
      KeyPart::Bool(b) => Some(b.to_string()),
      KeyPart::Absent => None,
    }
  }
}

impl From<&str> for KeyPart {
  fn from(value: &str) -> Self {
    KeyPart::Str(value.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(value: String) -> Self {
    KeyPart::Str(value)
  }
}

impl From<&String> for KeyPart {
  fn from(value: &String) -> Self {
    KeyPart::Str(value.clone())
  }
}

impl From<bool> for KeyPart {
  fn from(value: bool) -> Self {
    KeyPart::Bool(value)
  }
}

impl From<f64> for KeyPart {
  fn from(value: f64) -> Self {
    KeyPart::Float(value)
  }
}

macro_rules! int_key_part {
  ($($t:ty),*) => {
    $(
      impl From<$t> for KeyPart {
        fn from(value: $t) -> Self {
          KeyPart::Int(value as i64)
        }
      }
    )*
  };
}

int_key_part!(i32, i64, u8, u16, u32);

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(KeyPart::Absent)
  }
}

/// Opaque key identifying one (operation, parameters, page, page size) query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  /// Build a key from ordered parts, dropping absent ones.
  ///
  /// Order is significant: callers must supply parameters in a stable order,
  /// with the operation tag first.
  pub fn build<I>(parts: I) -> Self
  where
    I: IntoIterator<Item = KeyPart>,
  {
    let rendered: Vec<String> = parts.into_iter().filter_map(|p| p.render()).collect();
    CacheKey(rendered.join(SEPARATOR))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Build a [`CacheKey`] from a list of values convertible into [`KeyPart`].
///
/// ```ignore
/// let key = cache_key!["pr.list", "acme", "widgets", Some("open"), 2, 30];
/// ```
#[macro_export]
macro_rules! cache_key {
  ($($part:expr),* $(,)?) => {
    $crate::cache::CacheKey::build([$($crate::cache::KeyPart::from($part)),*])
  };
}
