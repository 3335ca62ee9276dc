use chrono::Weekday;
use clap::Subcommand;
use rust_decimal::Decimal;

use crate::store::{Frequency, RecordId};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Install the current cache generation and activate it
  Install,

  /// Route a request through the offline cache and print the result
  Fetch {
    /// Absolute URL, or a path relative to the configured origin
    url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Send as a page navigation accepting HTML
    #[arg(long)]
    html: bool,

    /// Write the response body to stdout
    #[arg(long)]
    body: bool,

    /// Request body, sent as-is
    #[arg(short, long)]
    data: Option<String>,
  },

  /// List caches and their entry counts
  Caches,

  /// Manage recurring expenses
  #[command(subcommand)]
  Expense(ExpenseCommand),

  /// Set or show the budget
  #[command(subcommand)]
  Budget(BudgetCommand),

  /// Show the next deduction and send a reminder for it
  Upcoming,

  /// Deliver a push message payload (JSON or plain text)
  Push { payload: String },

  /// Simulate a click on a notification
  Click {
    /// Notification action ("dismiss" closes it)
    #[arg(long)]
    action: Option<String>,

    /// Page to open
    #[arg(long)]
    url: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
  /// Record a new recurring expense
  Add {
    #[arg(long)]
    name: String,

    #[arg(long)]
    amount: Decimal,

    #[arg(long, value_enum)]
    frequency: Frequency,

    /// Day of the week it comes out (e.g. mon, friday)
    #[arg(long)]
    day: Weekday,
  },

  /// List all expenses
  List,

  /// Delete an expense
  Remove { id: RecordId },
}

#[derive(Subcommand, Debug)]
pub enum BudgetCommand {
  /// Set the monthly budget
  Set { amount: Decimal },

  /// Show totals against the budget
  Show,
}
