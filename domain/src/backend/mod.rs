//! Backend endpoints
//!
//! A backend is an independent tool-serving node reachable over HTTP. The
//! aggregator keeps them in a [`BackendSet`], deduplicated by normalized URL.

use crate::core::error::DomainError;
use std::collections::HashSet;

/// Normalized base address of a tool-serving backend.
///
/// Normalization trims whitespace, requires an `http` or `https` scheme,
/// lowercases scheme and authority, and drops trailing slashes, so
/// `HTTP://Host:8000/` and `http://host:8000` are the same backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendEndpoint {
    url: String,
}

impl BackendEndpoint {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let invalid = |reason: &str| DomainError::InvalidEndpoint {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(invalid("scheme must be http or https"));
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(invalid("missing host"));
        }

        let path = path.trim_end_matches('/');
        Ok(Self {
            url: format!("{}://{}{}", scheme, authority.to_ascii_lowercase(), path),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Absolute URL for a path below this backend (`path` starts with `/`)
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

impl std::fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl std::str::FromStr for BackendEndpoint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Unordered, deduplicated set of backends.
///
/// Iteration order is unspecified; callers that merge per-backend results
/// in iteration order inherit that non-determinism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSet {
    endpoints: HashSet<BackendEndpoint>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and collect URLs; fails on the first invalid one
    pub fn from_urls<I, S>(urls: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for url in urls {
            set.insert(BackendEndpoint::parse(url.as_ref())?);
        }
        Ok(set)
    }

    /// Returns `true` if the endpoint was not already present
    pub fn insert(&mut self, endpoint: BackendEndpoint) -> bool {
        self.endpoints.insert(endpoint)
    }

    pub fn contains(&self, endpoint: &BackendEndpoint) -> bool {
        self.endpoints.contains(endpoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendEndpoint> {
        self.endpoints.iter()
    }

    /// First endpoint in iteration order (no load balancing)
    pub fn first(&self) -> Option<&BackendEndpoint> {
        self.endpoints.iter().next()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl FromIterator<BackendEndpoint> for BackendSet {
    fn from_iter<T: IntoIterator<Item = BackendEndpoint>>(iter: T) -> Self {
        Self {
            endpoints: iter.into_iter().collect(),
        }
    }
}
