use chrono::{Duration, NaiveDateTime};
use tally_core::{Bill, Money, NewExpense};

/// Loose merchant equality: case-insensitive, and either name may contain the
/// other ("Netflix" settles "Netflix India"). Blank names never match.
pub fn merchants_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// Decides whether an incoming expense settles one of a user's bills.
#[derive(Debug, Clone)]
pub struct BillMatcher {
    /// Inclusive bound on |expense - bill|.
    pub amount_tolerance: Money,
    /// Exclusive bound on the distance from the bill's due date.
    pub date_window_days: i64,
}

impl Default for BillMatcher {
    fn default() -> Self {
        Self {
            amount_tolerance: Money::from_major(10),
            date_window_days: 7,
        }
    }
}

impl BillMatcher {
    pub fn new(amount_tolerance: Money, date_window_days: i64) -> Self {
        Self {
            amount_tolerance,
            date_window_days,
        }
    }

    pub fn is_match(
        &self,
        bill: &Bill,
        merchant: &str,
        amount: Money,
        occurred_at: NaiveDateTime,
    ) -> bool {
        if !merchants_match(&bill.merchant, merchant) {
            return false;
        }
        if (amount - bill.amount).abs() > self.amount_tolerance {
            return false;
        }
        // A bound that falls off the calendar does not constrain.
        let Some(window) = Duration::try_days(self.date_window_days) else {
            return false;
        };
        let after_start = bill
            .due_at
            .checked_sub_signed(window)
            .map_or(true, |start| occurred_at > start);
        let before_end = bill
            .due_at
            .checked_add_signed(window)
            .map_or(true, |end| occurred_at < end);
        after_start && before_end
    }

    /// First bill, in the order given, that `expense` settles.
    pub fn find_match<'a>(&self, expense: &NewExpense, bills: &'a [Bill]) -> Option<&'a Bill> {
        bills
            .iter()
            .find(|b| self.is_match(b, &expense.merchant, expense.amount, expense.occurred_at))
    }
}
