//! Canonical wallet address type.
//!
//! Addresses arrive from webhooks, API clients, and persisted index entries
//! with inconsistent casing.  [`Address`] stores the canonical lower-case
//! form so that every lookup key in the system agrees.

use serde::{Deserialize, Serialize};

/// A canonical (lower-case) `0x`-prefixed hex wallet address.
///
/// Construct via [`Address::parse`], which validates the shape and
/// normalizes casing.  The inner string is guaranteed to match
/// `^0x[0-9a-f]{40}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

/// Errors produced when parsing a wallet address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 42 characters, got {0}")]
    BadLength(usize),
    #[error("address contains non-hex characters")]
    NonHex,
}

impl Address {
    /// Parse and normalize a wallet address.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AddressError::Empty);
        }
        if !raw.starts_with("0x") && !raw.starts_with("0X") {
            return Err(AddressError::MissingPrefix);
        }
        if raw.len() != 42 {
            return Err(AddressError::BadLength(raw.len()));
        }
        let hex = &raw[2..];
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressError::NonHex);
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the canonical string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}
