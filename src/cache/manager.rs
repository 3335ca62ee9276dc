//! Versioned static/dynamic asset caches.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::{Origin, Url};

use super::storage::CacheStorage;
use super::types::{cache_name, has_version, CacheKind, CachedResponse, RequestKey};
use crate::net::{Fetcher, Request, Response};

/// Outcome of filling a cache from a list of URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
  pub stored: usize,
  pub failed_same_origin: Vec<Url>,
  pub failed_cross_origin: Vec<Url>,
}

impl ProvisionReport {
  pub fn failed(&self) -> usize {
    self.failed_same_origin.len() + self.failed_cross_origin.len()
  }
}

/// Manages the current generation of static and dynamic caches.
///
/// All operations degrade instead of failing: storage and network errors are
/// logged and reported as misses.
pub struct AssetCacheManager<S: CacheStorage> {
  storage: Arc<S>,
  prefix: String,
  version: String,
}

impl<S: CacheStorage> AssetCacheManager<S> {
  pub fn new(storage: S, prefix: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      storage: Arc::new(storage),
      prefix: prefix.into(),
      version: version.into(),
    }
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn name(&self, kind: CacheKind) -> String {
    cache_name(&self.prefix, kind, &self.version)
  }

  /// Fetch every manifest URL into the static cache.
  ///
  /// Failures never abort the run; they are logged and listed in the report,
  /// split by whether the URL shares `origin`.
  pub async fn provision_static<F: Fetcher>(
    &self,
    fetcher: &F,
    manifest: &[Url],
    origin: &Url,
  ) -> ProvisionReport {
    self.fill(CacheKind::Static, fetcher, manifest, &origin.origin()).await
  }

  /// Best-effort fill of the dynamic cache, used for third-party assets.
  pub async fn prefetch_dynamic<F: Fetcher>(
    &self,
    fetcher: &F,
    urls: &[Url],
    origin: &Url,
  ) -> ProvisionReport {
    self.fill(CacheKind::Dynamic, fetcher, urls, &origin.origin()).await
  }

  async fn fill<F: Fetcher>(
    &self,
    kind: CacheKind,
    fetcher: &F,
    urls: &[Url],
    origin: &Origin,
  ) -> ProvisionReport {
    let name = self.name(kind);
    if let Err(e) = self.storage.open_cache(&name) {
      warn!(cache = %name, error = %e, "failed to open cache");
    }

    let fetches = urls.iter().map(|url| async move {
      let result = fetcher.fetch(&Request::get(url.clone())).await;
      (url, result)
    });

    let mut report = ProvisionReport::default();
    for (url, result) in join_all(fetches).await {
      let stored = match result {
        Ok(response) if response.is_ok() => self.put(kind, &RequestKey::get(url), &response),
        Ok(response) => {
          debug!(%url, status = response.status, "not caching unsuccessful response");
          false
        }
        Err(e) => {
          debug!(%url, error = %e, "fetch failed");
          false
        }
      };

      if stored {
        report.stored += 1;
      } else if url.origin() == *origin {
        report.failed_same_origin.push(url.clone());
      } else {
        report.failed_cross_origin.push(url.clone());
      }
    }

    if report.failed() > 0 {
      warn!(
        cache = %name,
        stored = report.stored,
        failed_same_origin = report.failed_same_origin.len(),
        failed_cross_origin = report.failed_cross_origin.len(),
        "CacheProvisionPartialFailure"
      );
    } else {
      info!(cache = %name, stored = report.stored, "cache provisioned");
    }

    report
  }

  /// Delete every cache whose version tag is not `current`.
  ///
  /// Returns the names that were actually deleted. A failed delete is logged
  /// and the prune moves on to the next cache.
  pub fn prune_stale(&self, current: &str) -> Vec<String> {
    let names = match self.storage.cache_names() {
      Ok(names) => names,
      Err(e) => {
        warn!(error = %e, "CachePruneFailure: could not list caches");
        return Vec::new();
      }
    };

    let mut deleted = Vec::new();
    for name in names.into_iter().filter(|n| !has_version(n, current)) {
      match self.storage.delete_cache(&name) {
        Ok(_) => {
          info!(cache = %name, "deleted stale cache");
          deleted.push(name);
        }
        Err(e) => warn!(cache = %name, error = %e, "CachePruneFailure"),
      }
    }
    deleted
  }

  /// Look up a request in the current generation, newest copy first.
  pub fn get(&self, key: &RequestKey) -> Option<CachedResponse> {
    self
      .get_in(CacheKind::Dynamic, key)
      .or_else(|| self.get_in(CacheKind::Static, key))
  }

  /// Look up a request in one cache of the current generation.
  pub fn get_in(&self, kind: CacheKind, key: &RequestKey) -> Option<CachedResponse> {
    let name = self.name(kind);
    match self.storage.lookup(&name, key) {
      Ok(found) => found,
      Err(e) => {
        warn!(cache = %name, %key, error = %e, "cache lookup failed");
        None
      }
    }
  }

  /// Store a copy of `response` if it is a 200. Returns whether it was stored.
  pub fn put(&self, kind: CacheKind, key: &RequestKey, response: &Response) -> bool {
    if !response.is_ok() {
      return false;
    }

    let name = self.name(kind);
    match self.storage.store(&name, key, response) {
      Ok(()) => true,
      Err(e) => {
        warn!(cache = %name, %key, error = %e, "cache write failed");
        false
      }
    }
  }

  /// Every cache name with its entry count, for reporting.
  pub fn inventory(&self) -> color_eyre::Result<Vec<(String, usize)>> {
    self
      .storage
      .cache_names()?
      .into_iter()
      .map(|name| {
        let count = self.storage.entry_count(&name)?;
        Ok((name, count))
      })
      .collect()
  }
}

impl<S: CacheStorage> Clone for AssetCacheManager<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      prefix: self.prefix.clone(),
      version: self.version.clone(),
    }
  }
}
