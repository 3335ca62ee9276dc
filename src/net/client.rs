use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::types::{Request, RequestMode, Response, ResponseKind};

/// Failure to get any response at all from the network.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
  #[error("network unavailable: {0}")]
  Unavailable(String),
  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

/// Anything that can turn a request into a response over the network.
pub trait Fetcher: Clone + Send + Sync + 'static {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response, NetworkError>> + Send;
}

/// Fetcher backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  pub fn new(origin: Url) -> Result<Self, NetworkError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .map_err(|e| NetworkError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self { client, origin })
  }

  /// No-cors requests never expose a cross-origin body, CORS headers or not.
  fn classify(
    &self,
    mode: RequestMode,
    url: &Url,
    headers: &reqwest::header::HeaderMap,
  ) -> ResponseKind {
    if url.origin() == self.origin.origin() {
      ResponseKind::Basic
    } else if mode != RequestMode::NoCors
      && headers.contains_key(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
    {
      ResponseKind::Cors
    } else {
      ResponseKind::Opaque
    }
  }
}

impl Fetcher for HttpFetcher {
  fn fetch(
    &self,
    request: &Request,
  ) -> impl Future<Output = Result<Response, NetworkError>> + Send {
    let this = self.clone();
    let request = request.clone();

    async move {
      let mut builder = this.client.request(request.method.clone(), request.url.clone());
      for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
      }
      if let Some(body) = request.body {
        builder = builder.body(body);
      }

      let response = builder
        .send()
        .await
        .map_err(|e| {
          NetworkError::Unavailable(format!("{} {}: {}", request.method, request.url, e))
        })?;

      let status = response.status().as_u16();
      let kind = this.classify(request.mode, response.url(), response.headers());
      let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
          value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

      let body = response
        .bytes()
        .await
        .map_err(|e| NetworkError::Unavailable(format!("reading body of {}: {}", request.url, e)))?
        .to_vec();

      debug!(method = %request.method, url = %request.url, status, "fetched");

      Ok(Response {
        status,
        headers,
        body,
        kind,
      })
    }
  }
}
