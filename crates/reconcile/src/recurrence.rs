use chrono::{Days, NaiveDate, NaiveDateTime};
use tally_core::{Bill, NewExpense, TransactionKind, DEFAULT_CURRENCY};
use thiserror::Error;

/// Source label of expenses created when a bill is paid by hand and no
/// matching expense exists.
pub const AUTO_PAY_SOURCE: &str = "Bill Auto-Pay";

/// Expenses within this many days of the due date (inclusive) are linked when
/// the user pays a bill.
const LINK_WINDOW_DAYS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Bill cannot be marked as paid before the due date: {due}")]
    NotYetDue { due: NaiveDate },
}

/// Move the bill to its next occurrence. Unknown frequencies keep their date;
/// either way the bill is unpaid afterwards.
pub fn advance(bill: &mut Bill) {
    if let Some(next) = bill.frequency.next_after(bill.due_at) {
        bill.due_at = next;
    }
    bill.is_paid = false;
}

/// Hand-paying is allowed from the due date onwards, compared by calendar day.
pub fn ensure_payable(bill: &Bill, now: NaiveDateTime) -> Result<(), ReconcileError> {
    let due = bill.due_at.date();
    if now.date() < due {
        return Err(ReconcileError::NotYetDue { due });
    }
    Ok(())
}

/// User-initiated payment: checks the due date, stamps `last_paid_at` and
/// advances. On error the bill is untouched.
pub fn pay_by_user(bill: &mut Bill, now: NaiveDateTime) -> Result<(), ReconcileError> {
    ensure_payable(bill, now)?;
    bill.last_paid_at = Some(now);
    advance(bill);
    Ok(())
}

/// Payment detected from an incoming expense. No due-date check, and
/// `last_paid_at` is left as it was.
pub fn pay_by_match(bill: &mut Bill) {
    advance(bill);
}

/// Inclusive range around the current due date in which an existing expense
/// counts as the payment being recorded.
pub fn link_window(bill: &Bill) -> (NaiveDateTime, NaiveDateTime) {
    let days = Days::new(LINK_WINDOW_DAYS);
    (
        bill.due_at.checked_sub_days(days).unwrap_or(bill.due_at),
        bill.due_at.checked_add_days(days).unwrap_or(bill.due_at),
    )
}

/// The expense recorded for a hand-paid bill with nothing to link to. Call
/// before advancing so the notes describe the occurrence being paid.
pub fn auto_pay_expense(bill: &Bill, now: NaiveDateTime) -> NewExpense {
    NewExpense {
        user_id: bill.user_id,
        amount: bill.amount,
        currency: DEFAULT_CURRENCY.to_string(),
        merchant: bill.merchant.clone(),
        category: bill.category,
        kind: TransactionKind::Debited,
        notes: format!("Auto-generated from Bill: {}", bill.note),
        confidence: None,
        provenance: None,
        source: AUTO_PAY_SOURCE.to_string(),
        occurred_at: now,
        notification_id: None,
        linked_bill_id: Some(bill.id),
    }
}
