//! User notifications for upcoming deductions and push messages.

mod host;
mod payload;

pub use host::{
  Notification, NotificationHost, Permission, TerminalHost, Window, WindowHost, WindowId,
};
pub use payload::PushPayload;

use std::sync::OnceLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::budget::Deduction;

/// What a notification click led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
  Dismissed,
  Focused(WindowId),
  Opened(Url),
  /// The host refused to focus or open anything
  Failed,
}

/// Turns reminders and push messages into notifications, and notification
/// clicks into window actions.
pub struct Dispatcher<H: NotificationHost + WindowHost> {
  host: H,
  origin: Url,
  /// Asked at most once per dispatcher, never persisted
  permission: OnceLock<Permission>,
}

impl<H: NotificationHost + WindowHost> Dispatcher<H> {
  pub fn new(host: H, origin: Url) -> Self {
    Self {
      host,
      origin,
      permission: OnceLock::new(),
    }
  }

  pub fn host(&self) -> &H {
    &self.host
  }

  /// Ask the host for permission; later calls return the first answer.
  pub fn request_permission(&self) -> Permission {
    *self.permission.get_or_init(|| {
      let permission = self.host.request_permission();
      info!(?permission, "notification permission");
      permission
    })
  }

  /// Warn about a deduction. Does nothing unless permission was granted.
  /// Returns whether a notification was shown.
  pub fn notify_upcoming(&self, deduction: &Deduction) -> bool {
    if self.permission.get() != Some(&Permission::Granted) {
      debug!(name = %deduction.name, "notifications not permitted, skipping reminder");
      return false;
    }

    let notification = PushPayload {
      title: Some("Upcoming deduction".to_string()),
      body: Some(format!(
        "{}: ${:.2} due {}",
        deduction.name,
        deduction.amount,
        deduction.due_date.format("%A %-d %B")
      )),
      ..PushPayload::default()
    }
    .into_notification();

    self.show(&notification)
  }

  /// Display a push message. Always yields a notification, filling in
  /// defaults for whatever the payload lacks.
  pub fn on_push(&self, data: &[u8]) -> Notification {
    let notification = PushPayload::parse(data).into_notification();
    self.show(&notification);
    notification
  }

  /// Handle a click: focus an open app window, or open one at `url`.
  pub fn on_notification_click(&self, action: Option<&str>, url: Option<&str>) -> ClickOutcome {
    if action == Some("dismiss") {
      return ClickOutcome::Dismissed;
    }

    let origin = self.origin.origin();
    if let Some(window) = self
      .host
      .windows()
      .into_iter()
      .find(|w| w.url.origin() == origin)
    {
      return match self.host.focus(window.id) {
        Ok(()) => ClickOutcome::Focused(window.id),
        Err(e) => {
          warn!(window = window.id, error = %e, "failed to focus window");
          ClickOutcome::Failed
        }
      };
    }

    let target = self.resolve(url.unwrap_or(payload::DEFAULT_URL));
    match self.host.open_window(&target) {
      Ok(()) => ClickOutcome::Opened(target),
      Err(e) => {
        warn!(url = %target, error = %e, "failed to open window");
        ClickOutcome::Failed
      }
    }
  }

  fn resolve(&self, url: &str) -> Url {
    self.origin.join(url).unwrap_or_else(|e| {
      debug!(url, error = %e, "unusable notification url, opening app root");
      self.origin.clone()
    })
  }

  fn show(&self, notification: &Notification) -> bool {
    match self.host.show(notification) {
      Ok(()) => true,
      Err(e) => {
        warn!(title = %notification.title, error = %e, "failed to show notification");
        false
      }
    }
  }
}
