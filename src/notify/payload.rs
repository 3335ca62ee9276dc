use serde::Deserialize;

use super::host::Notification;

pub const DEFAULT_TITLE: &str = "Budget Tracker";
pub const DEFAULT_BODY: &str = "You have a new budget notification";
pub const DEFAULT_ICON: &str = "/icons/icon-192x192.png";
pub const DEFAULT_BADGE: &str = "/icons/icon-72x72.png";
pub const DEFAULT_URL: &str = "/";

/// Push message body. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
  pub title: Option<String>,
  pub body: Option<String>,
  pub icon: Option<String>,
  pub badge: Option<String>,
  pub url: Option<String>,
}

impl PushPayload {
  /// Parse JSON if possible, otherwise use the raw text as the body.
  pub fn parse(data: &[u8]) -> Self {
    if let Ok(payload) = serde_json::from_slice::<PushPayload>(data) {
      return payload;
    }

    let text = String::from_utf8_lossy(data).trim().to_string();
    Self {
      body: Some(text),
      ..Self::default()
    }
  }

  pub fn into_notification(self) -> Notification {
    Notification {
      title: non_empty(self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
      body: non_empty(self.body).unwrap_or_else(|| DEFAULT_BODY.to_string()),
      icon: non_empty(self.icon).unwrap_or_else(|| DEFAULT_ICON.to_string()),
      badge: non_empty(self.badge).unwrap_or_else(|| DEFAULT_BADGE.to_string()),
      url: non_empty(self.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
    }
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_body_gets_default() {
    let n = PushPayload::parse(br#"{"title":"X"}"#).into_notification();
    assert_eq!(n.title, "X");
    assert_eq!(n.body, DEFAULT_BODY);
    assert_eq!(n.icon, DEFAULT_ICON);
    assert_eq!(n.badge, DEFAULT_BADGE);
    assert_eq!(n.url, "/");
  }

  #[test]
  fn test_plain_text_becomes_body() {
    let n = PushPayload::parse(b"Rent is due tomorrow").into_notification();
    assert_eq!(n.title, DEFAULT_TITLE);
    assert_eq!(n.body, "Rent is due tomorrow");
  }

  #[test]
  fn test_empty_payload_uses_defaults() {
    let n = PushPayload::parse(b"").into_notification();
    assert_eq!(n.title, DEFAULT_TITLE);
    assert_eq!(n.body, DEFAULT_BODY);
  }

  #[test]
  fn test_full_payload() {
    let n = PushPayload::parse(
      br#"{"title":"Gym","body":"$19.95 on Monday","icon":"/i.png","badge":"/b.png",
          "url":"/expenses"}"#,
    )
    .into_notification();
    assert_eq!(n.body, "$19.95 on Monday");
    assert_eq!(n.icon, "/i.png");
    assert_eq!(n.badge, "/b.png");
    assert_eq!(n.url, "/expenses");
  }
}
