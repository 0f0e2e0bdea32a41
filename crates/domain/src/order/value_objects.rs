//! Value objects for the order domain.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Human readable order number, rendered as `OC-000042`.
///
/// Numbers come from an increment-and-read sequence owned by the
/// repository and are never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderNumber(u64);

impl OrderNumber {
    const PREFIX: &'static str = "OC-";

    /// Wraps a raw sequence value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:06}", Self::PREFIX, self.0)
    }
}

/// Error returned for strings that are not order numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid order number: {0}")]
pub struct InvalidOrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(Self::PREFIX)
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(OrderNumber)
            .ok_or_else(|| InvalidOrderNumber(s.to_string()))
    }
}

impl Serialize for OrderNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
