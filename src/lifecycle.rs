//! Install and activation of a cache generation.
//!
//! A generation moves `Installing -> Installed -> Activating -> Active`.
//! Install fills the caches; activate removes older generations and takes
//! over any open windows. An install that could not cache a single local
//! asset ends `Redundant` so the previous generation keeps serving.

use tracing::{info, warn};
use url::Url;

use crate::cache::{AssetCacheManager, CacheStorage, ProvisionReport};
use crate::net::Fetcher;
use crate::notify::WindowHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  Installing,
  Installed,
  Activating,
  Active,
  /// Install failed; this generation will never activate
  Redundant,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
  #[error("none of the {0} local manifest assets could be cached")]
  NothingCached(usize),
  #[error("cannot {action} while {state:?}")]
  InvalidTransition {
    action: &'static str,
    state: LifecycleState,
  },
}

/// What install achieved.
#[derive(Debug, Clone)]
pub struct InstallReport {
  pub manifest: ProvisionReport,
  pub third_party: ProvisionReport,
}

/// What activation cleaned up.
#[derive(Debug, Clone)]
pub struct ActivateReport {
  pub pruned: Vec<String>,
  pub claimed: usize,
}

/// Drives one cache generation through install and activation.
pub struct Lifecycle<S: CacheStorage, F: Fetcher> {
  state: LifecycleState,
  skip_waiting: bool,
  cache: AssetCacheManager<S>,
  fetcher: F,
  origin: Url,
  manifest: Vec<Url>,
  third_party: Vec<Url>,
}

impl<S: CacheStorage, F: Fetcher> Lifecycle<S, F> {
  pub fn new(
    cache: AssetCacheManager<S>,
    fetcher: F,
    origin: Url,
    manifest: Vec<Url>,
    third_party: Vec<Url>,
  ) -> Self {
    Self {
      state: LifecycleState::Installing,
      skip_waiting: false,
      cache,
      fetcher,
      origin,
      manifest,
      third_party,
    }
  }

  pub fn state(&self) -> LifecycleState {
    self.state
  }

  /// Whether install asked to activate without waiting for old pages to close.
  pub fn skip_waiting(&self) -> bool {
    self.skip_waiting
  }

  /// Populate the static cache from the manifest and prefetch third-party
  /// assets into the dynamic cache.
  pub async fn install(&mut self) -> Result<InstallReport, LifecycleError> {
    self.expect(LifecycleState::Installing, "install")?;
    info!(version = self.cache.version(), "installing");

    let manifest = self
      .cache
      .provision_static(&self.fetcher, &self.manifest, &self.origin)
      .await;

    let local = self
      .manifest
      .iter()
      .filter(|u| u.origin() == self.origin.origin())
      .count();
    if local > 0 && manifest.failed_same_origin.len() == local {
      self.state = LifecycleState::Redundant;
      warn!(version = self.cache.version(), "install failed, nothing cached");
      return Err(LifecycleError::NothingCached(local));
    }

    let third_party = self
      .cache
      .prefetch_dynamic(&self.fetcher, &self.third_party, &self.origin)
      .await;

    self.skip_waiting = true;
    self.state = LifecycleState::Installed;
    info!(
      version = self.cache.version(),
      cached = manifest.stored + third_party.stored,
      "installed"
    );

    Ok(InstallReport {
      manifest,
      third_party,
    })
  }

  /// Drop every other cache generation and claim open windows.
  pub fn activate(&mut self, windows: &impl WindowHost) -> Result<ActivateReport, LifecycleError> {
    self.expect(LifecycleState::Installed, "activate")?;
    self.state = LifecycleState::Activating;

    let pruned = self.cache.prune_stale(self.cache.version());
    let claimed = windows.claim();

    self.state = LifecycleState::Active;
    info!(
      version = self.cache.version(),
      pruned = pruned.len(),
      claimed,
      "activated"
    );

    Ok(ActivateReport { pruned, claimed })
  }

  fn expect(&self, state: LifecycleState, action: &'static str) -> Result<(), LifecycleError> {
    if self.state == state {
      Ok(())
    } else {
      Err(LifecycleError::InvalidTransition {
        action,
        state: self.state,
      })
    }
  }
}
