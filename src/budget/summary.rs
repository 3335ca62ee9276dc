use rust_decimal::Decimal;

use crate::store::{ExpenseRecord, Frequency};

/// Monthly view of the budget against all recurring expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetSummary {
  pub budget: Option<Decimal>,
  /// Sum of expenses converted to a per-month amount
  pub monthly_total: Decimal,
  pub remaining: Option<Decimal>,
  /// Share of the budget spent, 0-100+; absent when no budget is set or it is zero
  pub percent_used: Option<Decimal>,
}

impl BudgetSummary {
  /// Totals saturate at `Decimal::MAX` rather than overflow.
  pub fn compute(budget: Option<Decimal>, records: &[ExpenseRecord]) -> Self {
    let monthly_total = records
      .iter()
      .map(|r| monthly_equivalent(r.amount, r.frequency))
      .fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount).unwrap_or(Decimal::MAX)
      })
      .round_dp(2);

    let remaining = budget.map(|b| b.checked_sub(monthly_total).unwrap_or(Decimal::MIN));
    let percent_used = budget.filter(|b| !b.is_zero()).map(|b| {
      monthly_total
        .checked_div(b)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::MAX)
        .round_dp(1)
    });

    Self {
      budget,
      monthly_total,
      remaining,
      percent_used,
    }
  }

  pub fn is_over_budget(&self) -> bool {
    self.remaining.is_some_and(|r| r.is_sign_negative() && !r.is_zero())
  }
}

/// Amount per month for an expense of the given frequency, saturating at
/// `Decimal::MAX`.
pub fn monthly_equivalent(amount: Decimal, frequency: Frequency) -> Decimal {
  let per_year = match frequency {
    Frequency::Weekly => 52,
    Frequency::Fortnightly => 26,
    Frequency::Monthly => return amount,
  };
  amount
    .checked_mul(Decimal::from(per_year))
    .and_then(|yearly| yearly.checked_div(Decimal::from(12)))
    .unwrap_or(Decimal::MAX)
}
