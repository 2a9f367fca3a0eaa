//! Key selectors address a set of keys: exact match, prefix, token
//! containment, and their combinations.

use crate::keys::{CacheKey, KeyToken};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySelector {
    Exact(CacheKey),
    Prefix(CacheKey),
    Contains(KeyToken),
    Any(Vec<KeySelector>),
    All(Vec<KeySelector>),
}

impl KeySelector {
    pub fn exact(key: CacheKey) -> Self {
        KeySelector::Exact(key)
    }

    pub fn prefix(key: CacheKey) -> Self {
        KeySelector::Prefix(key)
    }

    pub fn contains(token: KeyToken) -> Self {
        KeySelector::Contains(token)
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            KeySelector::Exact(k) => k == key,
            KeySelector::Prefix(prefix) => key.starts_with(prefix),
            KeySelector::Contains(token) => key.contains(token),
            KeySelector::Any(selectors) => selectors.iter().any(|s| s.matches(key)),
            // An empty conjunction matches nothing
            KeySelector::All(selectors) => {
                !selectors.is_empty() && selectors.iter().all(|s| s.matches(key))
            }
        }
    }
}

impl From<CacheKey> for KeySelector {
    fn from(key: CacheKey) -> Self {
        KeySelector::Exact(key)
    }
}
