pub mod inference;
pub mod matcher;
pub mod recurrence;

pub use inference::{infer_bill, suggests_recurring, INFERRED_BILL_NOTE, RECURRING_KEYWORDS};
pub use matcher::{merchants_match, BillMatcher};
pub use recurrence::{
    advance, auto_pay_expense, ensure_payable, link_window, pay_by_match, pay_by_user,
    ReconcileError, AUTO_PAY_SOURCE,
};
