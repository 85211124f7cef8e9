use std::collections::{BTreeMap, HashMap};

use crate::cache::CacheError;

/// Key and field of one `HGET` in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyFieldPair {
    pub key: String,
    pub field: String,
}

impl KeyFieldPair {
    pub fn new(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            field: field.into(),
        }
    }
}

/// Field and value of one hash entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValuePair {
    pub field: String,
    pub value: String,
}

impl FieldValuePair {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Arguments accepted by `mset` and `mset_with_ttl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MSetArgs {
    /// Ordered key/value pairs.
    Pairs(Vec<(String, String)>),
    /// Alternating key, value, key, value...
    Flat(Vec<String>),
    /// Key to value map; ordered by key.
    Map(BTreeMap<String, String>),
}

impl MSetArgs {
    pub fn into_pairs(self) -> Result<Vec<(String, String)>, CacheError> {
        let pairs = match self {
            MSetArgs::Pairs(pairs) => pairs,
            MSetArgs::Map(map) => map.into_iter().collect(),
            MSetArgs::Flat(flat) => {
                if flat.len() % 2 != 0 {
                    return Err(CacheError::InvalidParameter(format!(
                        "mset expects key/value pairs, got {} values",
                        flat.len()
                    )));
                }
                let mut iter = flat.into_iter();
                let mut pairs = Vec::with_capacity(iter.len() / 2);
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    pairs.push((key, value));
                }
                pairs
            }
        };

        if pairs.is_empty() {
            return Err(CacheError::InvalidParameter(
                "mset needs at least one key/value pair".to_string(),
            ));
        }
        Ok(pairs)
    }
}

impl From<Vec<(String, String)>> for MSetArgs {
    fn from(pairs: Vec<(String, String)>) -> Self {
        MSetArgs::Pairs(pairs)
    }
}

impl From<&[(&str, &str)]> for MSetArgs {
    fn from(pairs: &[(&str, &str)]) -> Self {
        MSetArgs::Pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl From<Vec<String>> for MSetArgs {
    fn from(flat: Vec<String>) -> Self {
        MSetArgs::Flat(flat)
    }
}

impl From<BTreeMap<String, String>> for MSetArgs {
    fn from(map: BTreeMap<String, String>) -> Self {
        MSetArgs::Map(map)
    }
}

impl From<HashMap<String, String>> for MSetArgs {
    fn from(map: HashMap<String, String>) -> Self {
        MSetArgs::Map(map.into_iter().collect())
    }
}
