//! Typed identifiers.
//!
//! The catalog keys media items by a plain integer; wrapping it keeps item
//! ids from being confused with stream or track indices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a media item in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaItemId(i64);

impl MediaItemId {
    /// Return the inner integer value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MediaItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MediaItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

impl From<i64> for MediaItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<MediaItemId> for i64 {
    fn from(id: MediaItemId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let id = MediaItemId::from(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<MediaItemId>().unwrap(), id);
        assert!("abc".parse::<MediaItemId>().is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let id = MediaItemId::from(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: MediaItemId = serde_json::from_str("7").unwrap();
        assert_eq!(back.get(), 7);
    }
}
