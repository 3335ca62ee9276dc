use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the store. Never reused, even after deletion.
pub type RecordId = i64;

/// How often an expense is deducted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Frequency {
  Weekly,
  Fortnightly,
  Monthly,
}

impl Frequency {
  pub fn as_str(&self) -> &'static str {
    match self {
      Frequency::Weekly => "weekly",
      Frequency::Fortnightly => "fortnightly",
      Frequency::Monthly => "monthly",
    }
  }
}

impl fmt::Display for Frequency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

impl FromStr for Frequency {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "weekly" => Ok(Frequency::Weekly),
      "fortnightly" => Ok(Frequency::Fortnightly),
      "monthly" => Ok(Frequency::Monthly),
      other => Err(format!("unknown frequency '{}'", other)),
    }
  }
}

/// Fields supplied by the user when recording an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseInput {
  pub name: String,
  pub amount: Decimal,
  pub frequency: Frequency,
  pub day: Weekday,
}

/// A stored expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRecord {
  pub id: RecordId,
  pub name: String,
  pub amount: Decimal,
  pub frequency: Frequency,
  pub day: Weekday,
  /// Anchors the two-week cycle of fortnightly expenses
  pub created_on: NaiveDate,
}

/// Lowercase full weekday name, the form kept in the database.
pub fn weekday_name(day: Weekday) -> &'static str {
  match day {
    Weekday::Mon => "monday",
    Weekday::Tue => "tuesday",
    Weekday::Wed => "wednesday",
    Weekday::Thu => "thursday",
    Weekday::Fri => "friday",
    Weekday::Sat => "saturday",
    Weekday::Sun => "sunday",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_frequency_parse_is_case_insensitive() {
    assert_eq!("Weekly".parse::<Frequency>(), Ok(Frequency::Weekly));
    assert_eq!(" fortnightly ".parse::<Frequency>(), Ok(Frequency::Fortnightly));
    assert!("yearly".parse::<Frequency>().is_err());
  }

  #[test]
  fn test_weekday_name_parses_back() {
    for day in [Weekday::Mon, Weekday::Thu, Weekday::Sun] {
      assert_eq!(weekday_name(day).parse::<Weekday>().unwrap(), day);
    }
  }
}
