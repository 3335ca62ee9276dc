//! Request routing for the offline layer.
//!
//! Every intercepted request is matched against an ordered rule table and
//! answered by the policy of the first matching rule. The router always
//! produces a response: when the network and every cache fail, callers get
//! the app shell or a synthetic 503.

mod policy;
mod rules;

pub use rules::RouteContext;

use policy::{Policy, StoreWhen};
use rules::{default_rules, Rule};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{AssetCacheManager, CacheKind, CacheStorage, CachedResponse, RequestKey};
use crate::net::{Fetcher, Request, Response};

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
  /// Fresh from the network
  Network,
  /// Served from a cache
  Cache,
  /// Network unavailable, served the cached app shell
  Shell,
  /// Nothing available, synthetic offline response
  Offline,
  /// Bypassed the cache entirely
  Passthrough,
}

impl RouteSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      RouteSource::Network => "network",
      RouteSource::Cache => "cache",
      RouteSource::Shell => "shell",
      RouteSource::Offline => "offline",
      RouteSource::Passthrough => "passthrough",
    }
  }
}

/// Result of routing one request.
#[derive(Debug)]
pub struct Routed {
  pub response: Response,
  pub source: RouteSource,
  /// Name of the rule that matched
  pub rule: &'static str,
  /// When the served copy was cached, if it came from a cache
  pub cached_at: Option<DateTime<Utc>>,
  /// Background cache refresh, when one was started. The response does not
  /// wait for it.
  pub revalidation: Option<JoinHandle<()>>,
}

impl Routed {
  fn new(response: Response, source: RouteSource) -> Self {
    Self {
      response,
      source,
      rule: "",
      cached_at: None,
      revalidation: None,
    }
  }

  fn from_cache(cached: CachedResponse, source: RouteSource) -> Self {
    let mut routed = Self::new(cached.response, source);
    routed.cached_at = Some(cached.cached_at);
    routed
  }
}

/// Routes requests between the network and the asset caches.
pub struct Router<S: CacheStorage, F: Fetcher> {
  cache: AssetCacheManager<S>,
  fetcher: F,
  rules: Vec<Rule>,
  ctx: RouteContext,
}

impl<S: CacheStorage, F: Fetcher> Router<S, F> {
  pub fn new(cache: AssetCacheManager<S>, fetcher: F, ctx: RouteContext) -> Self {
    Self {
      cache,
      fetcher,
      rules: default_rules(),
      ctx,
    }
  }

  /// Answer a request according to the first matching rule.
  pub async fn handle(&self, request: Request) -> Routed {
    let Some(rule) = self.rules.iter().find(|r| (r.matches)(&request, &self.ctx)) else {
      // Tables without a catch-all fall back to the network
      return self.passthrough(request).await;
    };

    debug!(rule = rule.name, method = %request.method, url = %request.url, "routing");

    let mut routed = match rule.policy {
      Policy::Passthrough => self.passthrough(request).await,
      Policy::NetworkFirst => self.network_first(request).await,
      Policy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
      Policy::CacheFirst { store_when } => self.cache_first(request, store_when).await,
    };
    routed.rule = rule.name;
    routed
  }

  async fn passthrough(&self, request: Request) -> Routed {
    match self.fetcher.fetch(&request).await {
      Ok(response) => Routed::new(response, RouteSource::Passthrough),
      Err(e) => {
        debug!(url = %request.url, error = %e, "passthrough failed");
        Routed::new(Response::offline(), RouteSource::Offline)
      }
    }
  }

  async fn network_first(&self, request: Request) -> Routed {
    let key = request.key();
    match self.fetcher.fetch(&request).await {
      Ok(response) => {
        self.cache.put(CacheKind::Dynamic, &key, &response);
        Routed::new(response, RouteSource::Network)
      }
      Err(e) => {
        debug!(url = %request.url, error = %e, "network failed, trying cache");
        match self.cache.get_in(CacheKind::Dynamic, &key) {
          Some(cached) => Routed::from_cache(cached, RouteSource::Cache),
          None => self.shell_or_offline(),
        }
      }
    }
  }

  async fn stale_while_revalidate(&self, request: Request) -> Routed {
    let key = request.key();

    if let Some(cached) = self.cache.get(&key) {
      let cache = self.cache.clone();
      let fetcher = self.fetcher.clone();
      let handle = tokio::spawn(async move {
        match fetcher.fetch(&request).await {
          Ok(response) => {
            if cache.put(CacheKind::Dynamic, &key, &response) {
              debug!(%key, "revalidated");
            }
          }
          Err(e) => debug!(%key, error = %e, "revalidation failed"),
        }
      });

      let mut routed = Routed::from_cache(cached, RouteSource::Cache);
      routed.revalidation = Some(handle);
      return routed;
    }

    match self.fetcher.fetch(&request).await {
      Ok(response) => {
        self.cache.put(CacheKind::Dynamic, &key, &response);
        Routed::new(response, RouteSource::Network)
      }
      Err(e) => {
        debug!(%key, error = %e, "asset unavailable");
        self.fallback(&request)
      }
    }
  }

  async fn cache_first(&self, request: Request, store_when: StoreWhen) -> Routed {
    let key = request.key();

    if let Some(cached) = self.cache.get(&key) {
      return Routed::from_cache(cached, RouteSource::Cache);
    }

    match self.fetcher.fetch(&request).await {
      Ok(response) => {
        if store_when.allows(&response) {
          self.cache.put(CacheKind::Dynamic, &key, &response);
        }
        Routed::new(response, RouteSource::Network)
      }
      Err(e) => {
        debug!(%key, error = %e, "network failed with nothing cached");
        self.fallback(&request)
      }
    }
  }

  /// Last resort once the network failed: navigations get the shell.
  fn fallback(&self, request: &Request) -> Routed {
    if request.is_navigation() {
      self.shell_or_offline()
    } else {
      Routed::new(Response::offline(), RouteSource::Offline)
    }
  }

  fn shell_or_offline(&self) -> Routed {
    match self.cache.get(&RequestKey::get(&self.ctx.app_shell)) {
      Some(shell) => Routed::from_cache(shell, RouteSource::Shell),
      None => {
        warn!(shell = %self.ctx.app_shell, "offline with no cached app shell");
        Routed::new(Response::offline(), RouteSource::Offline)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStorage;
  use crate::net::testing::ScriptedFetcher;
  use crate::net::{RequestMode, ResponseKind};
  use reqwest::Method;
  use std::sync::Arc;
  use tokio::sync::Semaphore;
  use url::Url;

  const ORIGIN: &str = "https://budget.example/";

  fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
  }

  fn ok(body: &str) -> Response {
    Response::new(200, body, ResponseKind::Basic)
  }

  fn ctx() -> RouteContext {
    RouteContext {
      app_shell: url("/"),
      tracking_hosts: vec!["google-analytics.com".to_string()],
      asset_hosts: vec!["cdn.jsdelivr.net".to_string()],
    }
  }

  fn router(fetcher: ScriptedFetcher) -> Router<SqliteStorage, ScriptedFetcher> {
    let cache = AssetCacheManager::new(SqliteStorage::open_in_memory().unwrap(), "budget", "v1");
    Router::new(cache, fetcher, ctx())
  }

  fn page(path: &str) -> Request {
    Request::get(url(path))
      .with_header("accept", "text/html")
      .with_mode(RequestMode::Navigate)
  }

  #[tokio::test]
  async fn test_html_network_first_stores_copy() {
    let fetcher = ScriptedFetcher::offline();
    fetcher.respond(url("/index.html").as_str(), ok("<h1>live</h1>"));
    let router = router(fetcher);

    let routed = router.handle(page("/index.html")).await;
    assert_eq!(routed.rule, "html");
    assert_eq!(routed.source, RouteSource::Network);

    let stored = router
      .cache
      .get_in(CacheKind::Dynamic, &RequestKey::get(&url("/index.html")))
      .unwrap();
    assert_eq!(stored.response.body, b"<h1>live</h1>");
  }

  #[tokio::test]
  async fn test_html_offline_serves_cached_copy() {
    let router = router(ScriptedFetcher::offline());
    let key = RequestKey::get(&url("/index.html"));
    router.cache.put(CacheKind::Dynamic, &key, &ok("<h1>cached</h1>"));
    router
      .cache
      .put(CacheKind::Static, &RequestKey::get(&url("/")), &ok("<h1>shell</h1>"));

    let routed = router.handle(page("/index.html")).await;
    assert_eq!(routed.source, RouteSource::Cache);
    assert_eq!(routed.response.body, b"<h1>cached</h1>");
  }

  #[tokio::test]
  async fn test_html_offline_without_copy_serves_shell() {
    let router = router(ScriptedFetcher::offline());
    router
      .cache
      .put(CacheKind::Static, &RequestKey::get(&url("/")), &ok("<h1>shell</h1>"));

    let routed = router.handle(page("/index.html")).await;
    assert_eq!(routed.source, RouteSource::Shell);
    assert_eq!(routed.response.body, b"<h1>shell</h1>");
  }

  #[tokio::test]
  async fn test_html_offline_with_empty_cache_is_503() {
    let router = router(ScriptedFetcher::offline());

    let routed = router.handle(page("/index.html")).await;
    assert_eq!(routed.source, RouteSource::Offline);
    assert_eq!(routed.response.status, 503);
  }

  #[tokio::test]
  async fn test_stylesheet_served_stale_then_revalidated() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = ScriptedFetcher::gated(gate.clone());
    fetcher.respond(url("/app.css").as_str(), ok("body{color:red}"));
    let router = router(fetcher.clone());
    let key = RequestKey::get(&url("/app.css"));
    router.cache.put(CacheKind::Static, &key, &ok("body{}"));

    // The network is held back, so this only returns if it does not wait.
    let routed = router.handle(Request::get(url("/app.css"))).await;
    assert_eq!(routed.rule, "static-asset");
    assert_eq!(routed.source, RouteSource::Cache);
    assert_eq!(routed.response.body, b"body{}");
    assert_eq!(router.cache.get(&key).unwrap().response.body, b"body{}");

    gate.add_permits(1);
    routed.revalidation.unwrap().await.unwrap();

    assert_eq!(fetcher.call_count(url("/app.css").as_str()), 1);
    assert_eq!(router.cache.get(&key).unwrap().response.body, b"body{color:red}");
  }

  #[tokio::test]
  async fn test_script_without_copy_waits_for_network() {
    let fetcher = ScriptedFetcher::offline();
    fetcher.respond(url("/app.js").as_str(), ok("main()"));
    let router = router(fetcher);

    let routed = router.handle(Request::get(url("/app.js"))).await;
    assert_eq!(routed.source, RouteSource::Network);
    assert!(routed.revalidation.is_none());
    assert_eq!(
      router.cache.get(&RequestKey::get(&url("/app.js"))).unwrap().response.body,
      b"main()"
    );
  }

  #[tokio::test]
  async fn test_post_never_touches_cache() {
    let fetcher = ScriptedFetcher::offline();
    fetcher.respond(url("/app.css").as_str(), ok("from network"));
    let router = router(fetcher.clone());
    let get_key = RequestKey::get(&url("/app.css"));
    router.cache.put(CacheKind::Static, &get_key, &ok("cached"));

    let post = Request::new(Method::POST, url("/app.css")).with_body(b"x=1".to_vec());
    let routed = router.handle(post).await;

    assert_eq!(routed.rule, "non-get");
    assert_eq!(routed.source, RouteSource::Passthrough);
    assert_eq!(routed.response.body, b"from network");
    assert_eq!(fetcher.calls(), vec![(Method::POST, url("/app.css").to_string())]);

    let post_key = RequestKey::new(&Method::POST, &url("/app.css"));
    assert!(router.cache.get(&post_key).is_none());
    assert_eq!(router.cache.get(&get_key).unwrap().response.body, b"cached");
  }

  #[tokio::test]
  async fn test_tracking_request_is_not_cached() {
    let collect = "https://www.google-analytics.com/collect?v=2";
    let fetcher = ScriptedFetcher::offline();
    fetcher.respond(collect, ok(""));
    let router = router(fetcher);

    let routed = router.handle(Request::get(Url::parse(collect).unwrap())).await;
    assert_eq!(routed.source, RouteSource::Passthrough);
    assert!(router.cache.get(&RequestKey::get(&Url::parse(collect).unwrap())).is_none());
  }

  #[tokio::test]
  async fn test_image_cache_first_stores_opaque_200() {
    let logo = "https://images.example/logo.png";
    let fetcher = ScriptedFetcher::offline();
    fetcher.respond(logo, Response::new(200, "PNG", ResponseKind::Opaque));
    let router = router(fetcher.clone());

    let first = router.handle(Request::get(Url::parse(logo).unwrap())).await;
    assert_eq!(first.source, RouteSource::Network);

    fetcher.forget(logo);
    let second = router.handle(Request::get(Url::parse(logo).unwrap())).await;
    assert_eq!(second.source, RouteSource::Cache);
    assert_eq!(second.response.body, b"PNG");
    assert_eq!(fetcher.call_count(logo), 1);
  }

  #[tokio::test]
  async fn test_default_route_only_stores_basic_responses() {
    let feed = "https://api.example/rates.json";
    let fetcher = ScriptedFetcher::offline();
    fetcher.respond(feed, Response::new(200, "{}", ResponseKind::Cors));
    fetcher.respond(url("/manifest.json").as_str(), ok("{\"name\":\"Budget\"}"));
    let router = router(fetcher);

    router.handle(Request::get(Url::parse(feed).unwrap())).await;
    router.handle(Request::get(url("/manifest.json"))).await;

    assert!(router.cache.get(&RequestKey::get(&Url::parse(feed).unwrap())).is_none());
    assert!(router.cache.get(&RequestKey::get(&url("/manifest.json"))).is_some());
  }

  #[tokio::test]
  async fn test_default_route_offline_fallbacks() {
    let router = router(ScriptedFetcher::offline());
    router
      .cache
      .put(CacheKind::Static, &RequestKey::get(&url("/")), &ok("<h1>shell</h1>"));

    let data = router.handle(Request::get(url("/data.json"))).await;
    assert_eq!(data.source, RouteSource::Offline);
    assert_eq!(data.response.status, 503);

    let nav = Request::get(url("/reports")).with_mode(RequestMode::Navigate);
    let routed = router.handle(nav).await;
    assert_eq!(routed.rule, "default");
    assert_eq!(routed.source, RouteSource::Shell);
  }
}
