use reqwest::Method;
use url::Url;

use crate::cache::RequestKey;

/// Header list, kept in the order it was received.
pub type Headers = Vec<(String, String)>;

/// How the page issued the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
  /// Top-level document load
  Navigate,
  /// Ordinary fetch; cross-origin bodies are readable when CORS allows it
  #[default]
  SameOrigin,
  /// Cross-origin request without CORS; the response will be opaque
  NoCors,
}

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub headers: Headers,
  pub body: Option<Vec<u8>>,
  pub mode: RequestMode,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      headers: Vec::new(),
      body: None,
      mode: RequestMode::default(),
    }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url)
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  pub fn with_body(mut self, body: Vec<u8>) -> Self {
    self.body = Some(body);
    self
  }

  pub fn with_mode(mut self, mode: RequestMode) -> Self {
    self.mode = mode;
    self
  }

  /// First value of a header, matched case-insensitively.
  pub fn header(&self, name: &str) -> Option<&str> {
    find_header(&self.headers, name)
  }

  pub fn is_navigation(&self) -> bool {
    self.mode == RequestMode::Navigate
  }

  /// Whether the client declared it wants an HTML document back.
  pub fn accepts_html(&self) -> bool {
    self
      .header("accept")
      .is_some_and(|accept| accept.contains("text/html"))
  }

  pub fn key(&self) -> RequestKey {
    RequestKey::new(&self.method, &self.url)
  }
}

/// Where a response came from, as far as the page can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
  /// Same-origin response with readable body
  Basic,
  /// Cross-origin response allowed by CORS
  Cors,
  /// Cross-origin response the page cannot inspect
  Opaque,
  /// Produced locally, never from the network
  Synthetic,
}

impl ResponseKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseKind::Basic => "basic",
      ResponseKind::Cors => "cors",
      ResponseKind::Opaque => "opaque",
      ResponseKind::Synthetic => "synthetic",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(ResponseKind::Basic),
      "cors" => Some(ResponseKind::Cors),
      "opaque" => Some(ResponseKind::Opaque),
      "synthetic" => Some(ResponseKind::Synthetic),
      _ => None,
    }
  }
}

/// A fully buffered response. Cloning duplicates the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub headers: Headers,
  pub body: Vec<u8>,
  pub kind: ResponseKind,
}

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>, kind: ResponseKind) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.into(),
      kind,
    }
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  /// Placeholder served when neither the network nor any cache can answer.
  pub fn offline() -> Self {
    Self::new(503, "Offline", ResponseKind::Synthetic)
      .with_header("content-type", "text/plain; charset=utf-8")
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    find_header(&self.headers, name)
  }

  /// Exactly 200. Partial content and redirects are not cacheable.
  pub fn is_ok(&self) -> bool {
    self.status == 200
  }

  pub fn is_basic_ok(&self) -> bool {
    self.is_ok() && self.kind == ResponseKind::Basic
  }
}

fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
  headers
    .iter()
    .find(|(k, _)| k.eq_ignore_ascii_case(name))
    .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_accepts_html_checks_accept_header() {
    let url = Url::parse("https://budget.example/").unwrap();
    let page = Request::get(url.clone()).with_header("Accept", "text/html,application/xhtml+xml");
    let json = Request::get(url).with_header("accept", "application/json");

    assert!(page.accepts_html());
    assert!(!json.accepts_html());
  }

  #[test]
  fn test_offline_response_is_synthetic_503() {
    let response = Response::offline();
    assert_eq!(response.status, 503);
    assert_eq!(response.kind, ResponseKind::Synthetic);
    assert!(!response.is_ok());
    assert_eq!(response.header("Content-Type"), Some("text/plain; charset=utf-8"));
  }
}
