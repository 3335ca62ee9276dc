//! Calendar export of recurring expenses.
//!
//! The calendar provider itself lives outside this program; we hand it a
//! recurring event and an iCalendar file it can import. Failures here never
//! affect the expense store.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::debug;

use super::schedule::next_due;
use crate::store::{ExpenseRecord, Frequency, RecordId};

/// A recurring calendar event for one expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
  pub title: String,
  pub start: NaiveDateTime,
  pub end: NaiveDateTime,
  /// RFC 5545 RRULE value, without the `RRULE:` prefix
  pub recurrence_rule: String,
  /// Reminders, each this long before `start`
  pub reminder_offsets: Vec<Duration>,
}

impl CalendarEvent {
  pub fn for_expense(record: &ExpenseRecord, today: NaiveDate) -> Self {
    let start =
      next_due(record, today).and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default());
    let day = byday(record.day);
    let recurrence_rule = match record.frequency {
      Frequency::Weekly => format!("FREQ=WEEKLY;BYDAY={}", day),
      Frequency::Fortnightly => format!("FREQ=WEEKLY;INTERVAL=2;BYDAY={}", day),
      Frequency::Monthly => format!("FREQ=MONTHLY;BYDAY=1{}", day),
    };

    Self {
      title: format!("{} (${:.2})", record.name, record.amount),
      start,
      end: start + Duration::minutes(30),
      recurrence_rule,
      reminder_offsets: vec![Duration::days(1), Duration::hours(1)],
    }
  }

  /// Render as a single-event iCalendar document.
  pub fn to_ics(&self, uid: &str, stamp: DateTime<Utc>) -> String {
    const LOCAL: &str = "%Y%m%dT%H%M%S";

    let mut lines = vec![
      "BEGIN:VCALENDAR".to_string(),
      "VERSION:2.0".to_string(),
      "PRODID:-//spendcache//budget reminders//EN".to_string(),
      "BEGIN:VEVENT".to_string(),
      format!("UID:{}", uid),
      format!("DTSTAMP:{}", stamp.format("%Y%m%dT%H%M%SZ")),
      format!("DTSTART:{}", self.start.format(LOCAL)),
      format!("DTEND:{}", self.end.format(LOCAL)),
      format!("RRULE:{}", self.recurrence_rule),
      format!("SUMMARY:{}", escape_text(&self.title)),
    ];

    for offset in &self.reminder_offsets {
      lines.push("BEGIN:VALARM".to_string());
      lines.push("ACTION:DISPLAY".to_string());
      lines.push(format!("DESCRIPTION:{}", escape_text(&self.title)));
      lines.push(format!("TRIGGER:-PT{}M", offset.num_minutes()));
      lines.push("END:VALARM".to_string());
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut ics = lines.join("\r\n");
    ics.push_str("\r\n");
    ics
  }
}

/// Receiver of calendar events for newly added expenses.
pub trait CalendarSink {
  fn publish(&self, id: RecordId, event: &CalendarEvent) -> Result<()>;

  /// Drop whatever `publish` created for a deleted expense.
  fn withdraw(&self, id: RecordId) -> Result<()>;
}

/// Writes one `.ics` file per expense into a directory.
pub struct IcsExporter {
  dir: PathBuf,
}

impl IcsExporter {
  pub fn new(dir: PathBuf) -> Self {
    Self { dir }
  }

  fn path(&self, id: RecordId) -> PathBuf {
    self.dir.join(format!("expense-{}.ics", id))
  }
}

impl CalendarSink for IcsExporter {
  fn publish(&self, id: RecordId, event: &CalendarEvent) -> Result<()> {
    std::fs::create_dir_all(&self.dir)
      .map_err(|e| eyre!("Failed to create {}: {}", self.dir.display(), e))?;

    let path = self.path(id);
    let uid = format!("expense-{}@spendcache", id);
    std::fs::write(&path, event.to_ics(&uid, Utc::now()))
      .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;

    debug!(path = %path.display(), "calendar event exported");
    Ok(())
  }

  fn withdraw(&self, id: RecordId) -> Result<()> {
    let path = self.path(id);
    match std::fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!("Failed to remove {}: {}", path.display(), e)),
    }
  }
}

fn byday(day: Weekday) -> &'static str {
  match day {
    Weekday::Mon => "MO",
    Weekday::Tue => "TU",
    Weekday::Wed => "WE",
    Weekday::Thu => "TH",
    Weekday::Fri => "FR",
    Weekday::Sat => "SA",
    Weekday::Sun => "SU",
  }
}

/// Escape a TEXT value per RFC 5545 section 3.3.11.
fn escape_text(s: &str) -> String {
  s.replace('\\', "\\\\")
    .replace(';', "\\;")
    .replace(',', "\\,")
    .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use rust_decimal::Decimal;

  fn rent() -> ExpenseRecord {
    ExpenseRecord {
      id: 7,
      name: "Rent, flat 2".to_string(),
      amount: Decimal::new(45000, 2),
      frequency: Frequency::Fortnightly,
      day: Weekday::Thu,
      created_on: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
    }
  }

  #[test]
  fn test_event_for_fortnightly_expense() {
    let event = CalendarEvent::for_expense(&rent(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());

    assert_eq!(event.title, "Rent, flat 2 ($450.00)");
    // Anchored on Thursday Oct 1, so Oct 15 then Oct 29
    assert_eq!(
      event.start,
      NaiveDate::from_ymd_opt(2026, 10, 29).unwrap().and_hms_opt(9, 0, 0).unwrap()
    );
    assert_eq!(event.end - event.start, Duration::minutes(30));
    assert_eq!(event.recurrence_rule, "FREQ=WEEKLY;INTERVAL=2;BYDAY=TH");
    assert_eq!(event.reminder_offsets, vec![Duration::days(1), Duration::hours(1)]);
  }

  #[test]
  fn test_ics_rendering() {
    let event = CalendarEvent::for_expense(&rent(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    let stamp = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
    let ics = event.to_ics("expense-7@spendcache", stamp);

    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.contains("DTSTAMP:20261019T083000Z\r\n"));
    assert!(ics.contains("DTSTART:20261029T090000\r\n"));
    assert!(ics.contains("SUMMARY:Rent\\, flat 2 ($450.00)\r\n"));
    assert!(ics.contains("TRIGGER:-PT1440M\r\n"));
    assert!(ics.contains("TRIGGER:-PT60M\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
  }

  #[test]
  fn test_exporter_publish_and_withdraw() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = IcsExporter::new(dir.path().join("calendar"));
    let event = CalendarEvent::for_expense(&rent(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());

    exporter.publish(7, &event).unwrap();
    let path = dir.path().join("calendar").join("expense-7.ics");
    assert!(std::fs::read_to_string(&path).unwrap().contains("UID:expense-7@spendcache"));

    exporter.withdraw(7).unwrap();
    assert!(!path.exists());
    exporter.withdraw(7).unwrap();
  }
}
