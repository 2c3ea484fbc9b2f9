pub mod bill;
pub mod category;
pub mod expense;
pub mod money;
pub mod notification;
pub mod user;

pub use bill::{Bill, BillId, Frequency, NewBill};
pub use category::Category;
pub use expense::{
    CandidateExpense, Expense, ExpenseId, NewExpense, Provenance, TransactionKind,
    BILL_LINK_MARKER,
};
pub use money::Money;
pub use notification::{Channel, NewNotification, NotificationId, RawNotification};
pub use user::{User, UserId};

/// Currency assumed when neither extraction path names one.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Storage and wire format for every timestamp in the ledger.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
