//! Platform hooks: notification display and application windows.

use color_eyre::Result;
use tracing::debug;
use url::Url;

/// Answer to a notification permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
  Granted,
  Denied,
}

/// A notification ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  /// Page to open when the notification is clicked
  pub url: String,
}

pub type WindowId = u64;

/// An open application window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
  pub id: WindowId,
  pub url: Url,
}

/// Shows notifications to the user.
pub trait NotificationHost: Send + Sync {
  fn request_permission(&self) -> Permission;

  fn show(&self, notification: &Notification) -> Result<()>;
}

/// Open windows of the application.
pub trait WindowHost: Send + Sync {
  fn windows(&self) -> Vec<Window>;

  fn focus(&self, id: WindowId) -> Result<()>;

  fn open_window(&self, url: &Url) -> Result<()>;

  /// Take control of every open window. Returns how many were claimed.
  fn claim(&self) -> usize;
}

/// Host for the command line: notifications go to stdout and there are no
/// windows to focus.
pub struct TerminalHost {
  permission: Permission,
}

impl TerminalHost {
  pub fn new(enabled: bool) -> Self {
    Self {
      permission: if enabled {
        Permission::Granted
      } else {
        Permission::Denied
      },
    }
  }
}

impl NotificationHost for TerminalHost {
  fn request_permission(&self) -> Permission {
    self.permission
  }

  fn show(&self, notification: &Notification) -> Result<()> {
    debug!(icon = %notification.icon, badge = %notification.badge, "showing notification");
    println!("[{}] {}", notification.title, notification.body);
    println!("  -> {}", notification.url);
    Ok(())
  }
}

impl WindowHost for TerminalHost {
  fn windows(&self) -> Vec<Window> {
    Vec::new()
  }

  fn focus(&self, id: WindowId) -> Result<()> {
    println!("focus window {}", id);
    Ok(())
  }

  fn open_window(&self, url: &Url) -> Result<()> {
    println!("open {}", url);
    Ok(())
  }

  fn claim(&self) -> usize {
    0
  }
}
