//! Asset Pairs
//!
//! A pair identifies a price query: a base asset quoted in a quote asset,
//! written `BASE/QUOTE`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between base and quote symbols.
const SEPARATOR: char = '/';

// =============================================================================
// Pair
// =============================================================================

/// An ordered pair of asset symbols.
///
/// Deserializes from `{"Base": "..", "Quote": ".."}`; lower-case field names
/// are accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    /// Base asset symbol.
    #[serde(rename = "Base", alias = "base", default)]
    pub base: String,
    /// Quote asset symbol.
    #[serde(rename = "Quote", alias = "quote", default)]
    pub quote: String,
}

impl Pair {
    /// Create a pair from already validated symbols.
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// A pair is empty when neither symbol is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.quote.is_empty()
    }

    /// Symbols concatenated without separator, e.g. `BTCUSD`.
    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.trim().is_empty() && !quote.trim().is_empty() => {
                Ok(Self::new(
                    base.trim().to_uppercase(),
                    quote.trim().to_uppercase(),
                ))
            }
            _ => Err(PairError::Invalid(s.to_string())),
        }
    }
}

/// Parse a list of `BASE/QUOTE` strings, failing on the first malformed one.
///
/// # Errors
///
/// Returns `PairError::Invalid` naming the offending input.
pub fn parse_pairs<I, S>(pairs: I) -> Result<Vec<Pair>, PairError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pairs.into_iter().map(|s| s.as_ref().parse()).collect()
}

// =============================================================================
// Errors
// =============================================================================

/// Pair parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairError {
    /// Input is not of the form `BASE/QUOTE`.
    #[error("couldn't parse pair \"{0}\"")]
    Invalid(String),
}

// =============================================================================
// Tests
// =============================================================================
