//! Budget arithmetic on stored expenses: due dates, totals, calendar export.

pub mod calendar;
mod schedule;
mod summary;

pub use schedule::{next_due, upcoming_deduction, Deduction};
pub use summary::BudgetSummary;
