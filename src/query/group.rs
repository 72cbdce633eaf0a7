use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

use super::normalize::{normalize_query, NormalizedQuery};
use crate::error::ParseError;

/// Identifier shared by queries that are equal after normalization
///
/// Grouping is exact. Whether two queries of different groups are close
/// enough to share thresholds is decided by the similarity threshold used
/// by the metrics store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn from_normalized(normalized: &NormalizedQuery) -> Self {
        Self(format!(
            "{}|{}",
            normalized.canonical_text,
            normalized.structure_tokens.join("|")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex digest, used in sample ids
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.0.as_bytes());
        hex::encode(&hash[..8])
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GroupKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Compute the group key of a query
pub fn get_query_group(query: &str) -> Result<GroupKey, ParseError> {
    let normalized = normalize_query(query)?;
    Ok(GroupKey::from_normalized(&normalized))
}
