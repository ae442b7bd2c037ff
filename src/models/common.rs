// Shared model types

use serde::{Deserialize, Deserializer, Serialize};

/// Standard response envelope: every resource endpoint wraps its payload in `data`
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Resource identifier
///
/// The API returns ids as strings or integers depending on the backing
/// store; both are normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => ResourceId(s),
            RawId::Signed(n) => ResourceId(n.to_string()),
            RawId::Unsigned(n) => ResourceId(n.to_string()),
            RawId::Float(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                ResourceId((n as i64).to_string())
            }
            RawId::Float(n) => ResourceId(n.to_string()),
        })
    }
}

/// Pagination and sort parameters shared by list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOptions {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<String>,
}

impl PageOptions {
    /// Append non-empty parameters to a query
    pub(crate) fn append_to(&self, query: &mut Vec<(&'static str, String)>) {
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }
        if let Some(page) = self.page.filter(|p| *p > 0) {
            query.push(("page", page.to_string()));
        }
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            query.push(("sort", sort.to_string()));
        }
    }
}
