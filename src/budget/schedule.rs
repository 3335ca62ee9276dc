//! Due dates for recurring expenses.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::store::{ExpenseRecord, Frequency};

/// A single upcoming payment of a recurring expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
  pub name: String,
  pub amount: Decimal,
  pub due_date: NaiveDate,
}

/// Next date on or after `today` the expense comes out.
///
/// Weekly expenses fall on every `day`. Fortnightly ones fall on every
/// other `day`, counting from the first `day` on or after `created_on`.
/// Monthly ones fall on the first `day` of each month.
pub fn next_due(record: &ExpenseRecord, today: NaiveDate) -> NaiveDate {
  match record.frequency {
    Frequency::Weekly => on_or_after(today, record.day),
    Frequency::Fortnightly => {
      let anchor = on_or_after(record.created_on, record.day);
      let candidate = on_or_after(today, record.day);
      if candidate <= anchor {
        return anchor;
      }
      let weeks = (candidate - anchor).num_days() / 7;
      if weeks % 2 == 0 {
        candidate
      } else {
        candidate + Days::new(7)
      }
    }
    Frequency::Monthly => {
      let this_month = first_in_month(today, record.day);
      if this_month >= today {
        this_month
      } else {
        first_in_month(month_start(today) + Months::new(1), record.day)
      }
    }
  }
}

/// The deduction to warn about next.
///
/// Looks at weekly expenses first, then fortnightly, then monthly; the first
/// frequency with any expenses wins, and within it the nearest due date.
pub fn upcoming_deduction(records: &[ExpenseRecord], today: NaiveDate) -> Option<Deduction> {
  [Frequency::Weekly, Frequency::Fortnightly, Frequency::Monthly]
    .into_iter()
    .find_map(|frequency| {
      records
        .iter()
        .filter(|r| r.frequency == frequency)
        .map(|r| (next_due(r, today), r))
        .min_by_key(|(due, r)| (*due, r.id))
    })
    .map(|(due_date, record)| Deduction {
      name: record.name.clone(),
      amount: record.amount,
      due_date,
    })
}

fn on_or_after(date: NaiveDate, day: Weekday) -> NaiveDate {
  let ahead = (7 + day.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
  date + Days::new(u64::from(ahead))
}

fn month_start(date: NaiveDate) -> NaiveDate {
  date - Days::new(u64::from(date.day0()))
}

fn first_in_month(date: NaiveDate, day: Weekday) -> NaiveDate {
  on_or_after(month_start(date), day)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn record(id: i64, frequency: Frequency, day: Weekday, created_on: NaiveDate) -> ExpenseRecord {
    ExpenseRecord {
      id,
      name: format!("expense {}", id),
      amount: Decimal::new(1000 * id, 2),
      frequency,
      day,
      created_on,
    }
  }

  fn created() -> NaiveDate {
    date(2026, 10, 1)
  }

  #[test]
  fn test_weekly_same_day_is_due_today() {
    // 2026-10-19 is a Monday
    let r = record(1, Frequency::Weekly, Weekday::Mon, created());
    assert_eq!(next_due(&r, date(2026, 10, 19)), date(2026, 10, 19));
    assert_eq!(next_due(&r, date(2026, 10, 20)), date(2026, 10, 26));
  }

  #[test]
  fn test_fortnightly_follows_anchor_parity() {
    // First Friday on or after Oct 1 is Oct 2; then Oct 16, Oct 30...
    let r = record(1, Frequency::Fortnightly, Weekday::Fri, created());
    assert_eq!(next_due(&r, date(2026, 9, 20)), date(2026, 10, 2));
    assert_eq!(next_due(&r, date(2026, 10, 3)), date(2026, 10, 16));
    assert_eq!(next_due(&r, date(2026, 10, 16)), date(2026, 10, 16));
    assert_eq!(next_due(&r, date(2026, 10, 17)), date(2026, 10, 30));
  }

  #[test]
  fn test_monthly_rolls_to_next_month() {
    // First Tuesday of October 2026 is the 6th, of November the 3rd
    let r = record(1, Frequency::Monthly, Weekday::Tue, created());
    assert_eq!(next_due(&r, date(2026, 10, 2)), date(2026, 10, 6));
    assert_eq!(next_due(&r, date(2026, 10, 6)), date(2026, 10, 6));
    assert_eq!(next_due(&r, date(2026, 10, 7)), date(2026, 11, 3));
    assert_eq!(next_due(&r, date(2026, 12, 15)), date(2027, 1, 5));
  }

  #[test]
  fn test_upcoming_prefers_first_non_empty_bucket() {
    // Sunday; the monthly expense is due tomorrow, the weekly ones later
    let today = date(2026, 11, 1);
    let records = vec![
      record(1, Frequency::Monthly, Weekday::Mon, created()),
      record(2, Frequency::Weekly, Weekday::Fri, created()),
      record(3, Frequency::Weekly, Weekday::Thu, created()),
    ];

    let next = upcoming_deduction(&records, today).unwrap();
    assert_eq!(next.name, "expense 3");
    assert_eq!(next.due_date, date(2026, 11, 5));
  }

  #[test]
  fn test_upcoming_falls_through_empty_buckets() {
    let today = date(2026, 10, 19);
    let records = vec![record(4, Frequency::Monthly, Weekday::Wed, created())];

    let next = upcoming_deduction(&records, today).unwrap();
    assert_eq!(next.due_date, date(2026, 11, 4));
    assert_eq!(next.amount, Decimal::new(4000, 2));
    assert!(upcoming_deduction(&[], today).is_none());
  }
}
