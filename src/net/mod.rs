//! Request/response types and the network boundary.

mod client;
mod types;

pub use client::{Fetcher, HttpFetcher, NetworkError};
pub use types::{Headers, Request, RequestMode, Response, ResponseKind};

#[cfg(test)]
pub mod testing {
  //! Scripted fetcher for exercising cache policies without a network.

  use super::{Fetcher, NetworkError, Request, Response};
  use reqwest::Method;
  use std::collections::HashMap;
  use std::future::Future;
  use std::sync::{Arc, Mutex};
  use tokio::sync::Semaphore;

  #[derive(Clone, Default)]
  pub struct ScriptedFetcher {
    responses: Arc<Mutex<HashMap<String, Response>>>,
    calls: Arc<Mutex<Vec<(Method, String)>>>,
    gate: Option<Arc<Semaphore>>,
  }

  impl ScriptedFetcher {
    /// A fetcher with nothing scripted: every request fails.
    pub fn offline() -> Self {
      Self::default()
    }

    /// Every fetch waits for a permit on `gate` before answering.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
      Self {
        gate: Some(gate),
        ..Self::default()
      }
    }

    pub fn respond(&self, url: &str, response: Response) -> &Self {
      self
        .responses
        .lock()
        .unwrap()
        .insert(url.to_string(), response);
      self
    }

    pub fn forget(&self, url: &str) {
      self.responses.lock().unwrap().remove(url);
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
      self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
      self
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, u)| u == url)
        .count()
    }
  }

  impl Fetcher for ScriptedFetcher {
    fn fetch(
      &self,
      request: &Request,
    ) -> impl Future<Output = Result<Response, NetworkError>> + Send {
      let this = self.clone();
      let method = request.method.clone();
      let url = request.url.to_string();

      async move {
        if let Some(gate) = &this.gate {
          let permit = gate
            .acquire()
            .await
            .map_err(|e| NetworkError::Unavailable(e.to_string()))?;
          permit.forget();
        }

        this.calls.lock().unwrap().push((method, url.clone()));
        let scripted = this.responses.lock().unwrap().get(&url).cloned();
        scripted.ok_or_else(|| NetworkError::Unavailable(format!("no route to {}", url)))
      }
    }
  }
}
