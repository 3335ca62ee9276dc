//! Keys, names and entries for the asset caches.

use chrono::{DateTime, Utc};
use reqwest::Method;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

use crate::net::Response;

/// Identity of a cached request: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
  pub method: Method,
  pub url: Url,
}

impl RequestKey {
  pub fn new(method: &Method, url: &Url) -> Self {
    let mut url = url.clone();
    // Fragments never reach the server
    url.set_fragment(None);
    Self {
      method: method.clone(),
      url,
    }
  }

  pub fn get(url: &Url) -> Self {
    Self::new(&Method::GET, url)
  }

  /// SHA256 hash for stable, fixed-length storage keys
  pub fn hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for RequestKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.method, self.url)
  }
}

/// The two logical caches of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
  /// Fixed manifest, filled once at install
  Static,
  /// Grows at runtime as resources are fetched
  Dynamic,
}

impl CacheKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      CacheKind::Static => "static",
      CacheKind::Dynamic => "dynamic",
    }
  }
}

/// Full versioned cache name, e.g. `budget-static-v3`.
pub fn cache_name(prefix: &str, kind: CacheKind, version: &str) -> String {
  if prefix.is_empty() {
    format!("{}-{}", kind.as_str(), version)
  } else {
    format!("{}-{}-{}", prefix, kind.as_str(), version)
  }
}

/// Whether `name` belongs to the generation tagged `version`.
pub fn has_version(name: &str, version: &str) -> bool {
  name
    .strip_suffix(version)
    .is_some_and(|rest| rest.ends_with('-'))
}

/// A stored response together with when it was stored.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  pub cached_at: DateTime<Utc>,
}
