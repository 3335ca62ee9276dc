//! Durable storage for expense records and the budget setting.
//!
//! The store owns its SQLite connection; callers pass the handle around
//! explicitly. Editing an expense is remove + add.

mod types;

pub use types::{weekday_name, ExpenseInput, ExpenseRecord, Frequency, RecordId};

use chrono::{Local, NaiveDate, Weekday};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::db;

const BUDGET_KEY: &str = "budget";

/// Errors surfaced to the user by the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),
  #[error("failed to save: {0}")]
  WriteFailed(String),
  #[error("failed to load: {0}")]
  ReadFailed(String),
  #[error("invalid expense: {0}")]
  Invalid(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Handle to the expense store.
pub struct ExpenseStore {
  conn: Mutex<Connection>,
}

impl ExpenseStore {
  /// Open the store at `path`, creating the database and tables if needed.
  pub fn open(path: &Path) -> StoreResult<Self> {
    let conn = db::connect(path).map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
    debug!(path = %path.display(), "expense store opened");
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Open a private store that lives only as long as the handle.
  #[cfg(test)]
  pub fn open_in_memory() -> StoreResult<Self> {
    let conn = db::connect_in_memory().map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Persist a new expense and return its freshly assigned id.
  pub fn add(&self, input: &ExpenseInput) -> StoreResult<RecordId> {
    self.add_on(input, Local::now().date_naive())
  }

  pub(crate) fn add_on(
    &self,
    input: &ExpenseInput,
    created_on: NaiveDate,
  ) -> StoreResult<RecordId> {
    validate(input)?;

    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::WriteFailed(format!("lock poisoned: {}", e)))?;

    conn
      .execute(
        "INSERT INTO expenses (name, amount, frequency, day, created_on) VALUES (?, ?, ?, ?, ?)",
        params![
          input.name.trim(),
          input.amount.to_string(),
          input.frequency.as_str(),
          weekday_name(input.day),
          created_on.format("%Y-%m-%d").to_string(),
        ],
      )
      .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

    let id = conn.last_insert_rowid();
    debug!(id, name = %input.name, "expense added");
    Ok(id)
  }

  /// All expenses, oldest first.
  pub fn list(&self) -> StoreResult<Vec<ExpenseRecord>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::ReadFailed(format!("lock poisoned: {}", e)))?;

    let mut stmt = conn
      .prepare("SELECT id, name, amount, frequency, day, created_on FROM expenses ORDER BY id")
      .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

    let rows = stmt
      .query_map([], |row| {
        Ok(RawExpense {
          id: row.get(0)?,
          name: row.get(1)?,
          amount: row.get(2)?,
          frequency: row.get(3)?,
          day: row.get(4)?,
          created_on: row.get(5)?,
        })
      })
      .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

    let mut records = Vec::new();
    for row in rows {
      let raw = row.map_err(|e| StoreError::ReadFailed(e.to_string()))?;
      let id = raw.id;
      match raw.decode() {
        Ok(record) => records.push(record),
        Err(e) => warn!(id, error = %e, "skipping undecodable expense row"),
      }
    }

    Ok(records)
  }

  /// Delete an expense. Unknown ids are ignored.
  pub fn remove(&self, id: RecordId) -> StoreResult<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::WriteFailed(format!("lock poisoned: {}", e)))?;

    let deleted = conn
      .execute("DELETE FROM expenses WHERE id = ?", params![id])
      .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

    if deleted == 0 {
      debug!(id, "remove of unknown expense ignored");
    }
    Ok(())
  }

  /// Store the budget amount, replacing any previous value.
  pub fn set_budget(&self, amount: Decimal) -> StoreResult<()> {
    if amount.is_sign_negative() {
      return Err(StoreError::Invalid("budget cannot be negative".to_string()));
    }

    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::WriteFailed(format!("lock poisoned: {}", e)))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
        params![BUDGET_KEY, amount.to_string()],
      )
      .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    Ok(())
  }

  /// The stored budget, if one was ever set.
  pub fn budget(&self) -> StoreResult<Option<Decimal>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| StoreError::ReadFailed(format!("lock poisoned: {}", e)))?;

    let value: Option<String> = conn
      .query_row(
        "SELECT value FROM settings WHERE key = ?",
        params![BUDGET_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

    value
      .map(|v| {
        v.parse::<Decimal>()
          .map_err(|e| StoreError::ReadFailed(format!("bad budget value '{}': {}", v, e)))
      })
      .transpose()
  }
}

fn validate(input: &ExpenseInput) -> StoreResult<()> {
  if input.name.trim().is_empty() {
    return Err(StoreError::Invalid("name is required".to_string()));
  }
  if input.amount <= Decimal::ZERO {
    return Err(StoreError::Invalid("amount must be greater than zero".to_string()));
  }
  Ok(())
}

/// Row as stored, before parsing the text columns.
struct RawExpense {
  id: RecordId,
  name: String,
  amount: String,
  frequency: String,
  day: String,
  created_on: String,
}

impl RawExpense {
  fn decode(self) -> Result<ExpenseRecord, String> {
    let amount = self
      .amount
      .parse::<Decimal>()
      .map_err(|e| format!("amount '{}': {}", self.amount, e))?;
    let frequency = self.frequency.parse::<Frequency>()?;
    let day = self
      .day
      .parse::<Weekday>()
      .map_err(|_| format!("unknown day '{}'", self.day))?;
    let created_on = NaiveDate::parse_from_str(&self.created_on, "%Y-%m-%d")
      .map_err(|e| format!("created_on '{}': {}", self.created_on, e))?;

    Ok(ExpenseRecord {
      id: self.id,
      name: self.name,
      amount,
      frequency,
      day,
      created_on,
    })
  }
}
