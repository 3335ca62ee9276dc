//! Ordered routing table: the first rule whose predicate matches decides the
//! caching policy for a request.

use reqwest::Method;
use url::Url;

use super::policy::{Policy, StoreWhen};
use crate::net::Request;

const STYLE_SCRIPT_FONT: &[&str] = &["css", "js", "mjs", "woff", "woff2", "ttf", "otf", "eot"];
const IMAGES: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "avif"];

/// Facts about the deployment the predicates need.
#[derive(Debug, Clone)]
pub struct RouteContext {
  /// Root document served when a navigation cannot be answered
  pub app_shell: Url,
  /// Analytics hosts that must never be cached
  pub tracking_hosts: Vec<String>,
  /// CDN and font hosts treated like local static assets
  pub asset_hosts: Vec<String>,
}

/// One routing rule.
#[derive(Clone, Copy)]
pub struct Rule {
  pub name: &'static str,
  pub matches: fn(&Request, &RouteContext) -> bool,
  pub policy: Policy,
}

impl std::fmt::Debug for Rule {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Rule")
      .field("name", &self.name)
      .field("policy", &self.policy)
      .finish_non_exhaustive()
  }
}

/// The routing table, highest priority first. The last rule matches everything.
pub fn default_rules() -> Vec<Rule> {
  vec![
    Rule {
      name: "non-get",
      matches: |req, _| req.method != Method::GET,
      policy: Policy::Passthrough,
    },
    Rule {
      name: "tracking",
      matches: |req, ctx| host_in(&req.url, &ctx.tracking_hosts),
      policy: Policy::Passthrough,
    },
    Rule {
      name: "html",
      matches: |req, _| req.accepts_html(),
      policy: Policy::NetworkFirst,
    },
    Rule {
      name: "static-asset",
      matches: |req, ctx| {
        has_extension(&req.url, STYLE_SCRIPT_FONT) || host_in(&req.url, &ctx.asset_hosts)
      },
      policy: Policy::StaleWhileRevalidate,
    },
    Rule {
      name: "image",
      matches: |req, _| has_extension(&req.url, IMAGES),
      policy: Policy::CacheFirst {
        store_when: StoreWhen::Ok,
      },
    },
    Rule {
      name: "default",
      matches: |_, _| true,
      policy: Policy::CacheFirst {
        store_when: StoreWhen::BasicOk,
      },
    },
  ]
}

/// Whether the URL's host equals, or is a subdomain of, one of `hosts`.
fn host_in(url: &Url, hosts: &[String]) -> bool {
  let Some(host) = url.host_str() else {
    return false;
  };
  hosts.iter().any(|h| {
    host.eq_ignore_ascii_case(h)
      || host
        .to_ascii_lowercase()
        .ends_with(&format!(".{}", h.to_ascii_lowercase()))
  })
}

fn has_extension(url: &Url, extensions: &[&str]) -> bool {
  url
    .path()
    .rsplit('/')
    .next()
    .and_then(|file| file.rsplit_once('.'))
    .is_some_and(|(_, ext)| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ctx() -> RouteContext {
    let origin = Url::parse("https://budget.example/").unwrap();
    RouteContext {
      app_shell: origin,
      tracking_hosts: vec!["google-analytics.com".to_string()],
      asset_hosts: vec!["cdn.jsdelivr.net".to_string()],
    }
  }

  fn rule_for(req: &Request) -> &'static str {
    let ctx = ctx();
    default_rules()
      .into_iter()
      .find(|r| (r.matches)(req, &ctx))
      .map(|r| r.name)
      .unwrap()
  }

  fn get(url: &str) -> Request {
    Request::get(Url::parse(url).unwrap())
  }

  #[test]
  fn test_non_get_wins_over_everything() {
    let req = Request::new(Method::POST, Url::parse("https://budget.example/app.css").unwrap())
      .with_header("accept", "text/html");
    assert_eq!(rule_for(&req), "non-get");
  }

  #[test]
  fn test_tracking_hosts_include_subdomains() {
    assert_eq!(rule_for(&get("https://www.google-analytics.com/collect?v=1")), "tracking");
    assert_eq!(rule_for(&get("https://google-analytics.com/g.js")), "tracking");
  }

  #[test]
  fn test_html_before_extensions() {
    let req = get("https://budget.example/index.html").with_header("accept", "text/html");
    assert_eq!(rule_for(&req), "html");
  }

  #[test]
  fn test_asset_classification() {
    assert_eq!(rule_for(&get("https://budget.example/app.css")), "static-asset");
    assert_eq!(rule_for(&get("https://budget.example/fonts/inter.WOFF2")), "static-asset");
    assert_eq!(rule_for(&get("https://cdn.jsdelivr.net/npm/chart.js@4")), "static-asset");
    assert_eq!(rule_for(&get("https://budget.example/icons/icon-192x192.png")), "image");
    assert_eq!(rule_for(&get("https://budget.example/manifest.json")), "default");
    assert_eq!(rule_for(&get("https://budget.example/js/")), "default");
  }
}
