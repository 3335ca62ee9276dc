use crate::net::Response;

/// Caching strategy applied to a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
  /// Straight to the network, nothing cached
  Passthrough,
  /// Network, then cached copy, then app shell
  NetworkFirst,
  /// Cached copy now, refresh the cache in the background
  StaleWhileRevalidate,
  /// Cached copy if any, else network
  CacheFirst { store_when: StoreWhen },
}

/// Which network responses a cache-first route keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWhen {
  /// Any 200, including opaque cross-origin images
  Ok,
  /// Same-origin 200 only
  BasicOk,
}

impl StoreWhen {
  pub fn allows(&self, response: &Response) -> bool {
    match self {
      StoreWhen::Ok => response.is_ok(),
      StoreWhen::BasicOk => response.is_basic_ok(),
    }
  }
}
