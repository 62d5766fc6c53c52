//! Query Normalization
//!
//! A raw place name is trimmed, whitespace-collapsed and case-folded before it
//! is used anywhere else. The normalized form is both the cache key and the
//! text sent to providers.

use std::fmt;

use super::error::{GeocoderError, Result};

/// Maximum accepted length of a place name, in characters, after normalization.
pub const MAX_QUERY_CHARS: usize = 256;

/// A validated, normalized place-name query.
///
/// Construction goes through [`NormalizedQuery::parse`], so every instance is
/// non-empty, contains single spaces only and is lower-case. Normalizing an
/// already normalized string yields the same string.
///
/// # Example
///
/// ```
/// use geocoder_common::NormalizedQuery;
///
/// let a = NormalizedQuery::parse("Tokyo").unwrap();
/// let b = NormalizedQuery::parse("  tokyo ").unwrap();
/// assert_eq!(a, b);
///
/// let c = NormalizedQuery::parse("New   York\tCity").unwrap();
/// assert_eq!(c.as_str(), "new york city");
///
/// assert!(NormalizedQuery::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedQuery(String);

impl NormalizedQuery {
    /// Normalizes a raw place name.
    ///
    /// # Returns
    ///
    /// - `Ok(query)` - the normalized query
    /// - `Err(GeocoderError::Validation)` - the input is blank, or longer than
    ///   [`MAX_QUERY_CHARS`] once normalized
    pub fn parse(raw: &str) -> Result<Self> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(GeocoderError::Validation(
                "place name must not be empty".to_string(),
            ));
        }
        if collapsed.chars().count() > MAX_QUERY_CHARS {
            return Err(GeocoderError::Validation(format!(
                "place name must be at most {} characters",
                MAX_QUERY_CHARS
            )));
        }
        Ok(Self(collapsed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
