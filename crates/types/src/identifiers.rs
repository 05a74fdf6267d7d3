//! Account and asset identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from parsing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("Account id must be `name@domain`, got `{0}`")]
    BadAccountId(String),

    #[error("Asset id must be `asset#domain`, got `{0}`")]
    BadAssetId(String),
}

/// `name@domain` account identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId {
    pub name: String,
    pub domain: String,
}

impl AccountId {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        AccountId {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Split `name@domain` into its two labels.
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        match s.split_once('@') {
            Some((name, domain)) if !name.is_empty() && !domain.is_empty() => {
                Ok(AccountId::new(name, domain))
            }
            _ => Err(IdParseError::BadAccountId(s.to_owned())),
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.domain)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.domain)
    }
}

/// `asset#domain` asset identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId {
    pub name: String,
    pub domain: String,
}

impl AssetId {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        AssetId {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Split `asset#domain` into its two labels.
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        match s.split_once('#') {
            Some((name, domain)) if !name.is_empty() && !domain.is_empty() => {
                Ok(AssetId::new(name, domain))
            }
            _ => Err(IdParseError::BadAssetId(s.to_owned())),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.domain)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_parse() {
        let id = AccountId::parse("alice@wonderland").unwrap();
        assert_eq!(id.name, "alice");
        assert_eq!(id.domain, "wonderland");
        assert_eq!(id.to_string(), "alice@wonderland");
    }

    #[test]
    fn account_id_rejects_malformed() {
        assert!(AccountId::parse("alice").is_err());
        assert!(AccountId::parse("@wonderland").is_err());
        assert!(AccountId::parse("alice@").is_err());
    }

    #[test]
    fn asset_id_parse() {
        let id = AssetId::parse("coin#wonderland").unwrap();
        assert_eq!(id.name, "coin");
        assert_eq!(id.domain, "wonderland");
        assert!(AssetId::parse("coin@wonderland").is_err());
    }
}
