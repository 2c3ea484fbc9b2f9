use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bill::BillId;
use crate::category::Category;
use crate::money::Money;
use crate::notification::NotificationId;
use crate::user::UserId;

/// Substring that marks an expense as settling a bill. The relation is textual:
/// there is no foreign key behind it.
pub const BILL_LINK_MARKER: &str = "Linked to Bill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenseId(pub i64);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionKind {
    Credited,
    Debited,
    #[default]
    Spent,
    Transfer,
}

impl TransactionKind {
    /// Map the action word of a bank alert (or an AI `type` field) to a kind.
    /// Unknown words mean money went out: `Spent`.
    pub fn from_action(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "credited" | "credit" => TransactionKind::Credited,
            "debited" | "debit" => TransactionKind::Debited,
            "transfer" | "transferred" => TransactionKind::Transfer,
            _ => TransactionKind::Spent,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Credited => write!(f, "Credited"),
            TransactionKind::Debited => write!(f, "Debited"),
            TransactionKind::Spent => write!(f, "Spent"),
            TransactionKind::Transfer => write!(f, "Transfer"),
        }
    }
}

/// Which extraction strategy produced an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "AI")]
    Ai,
    RegexFallback,
}

impl Provenance {
    pub fn label(self) -> &'static str {
        match self {
            Provenance::Ai => "AI",
            Provenance::RegexFallback => "Regex Fallback",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Ai => write!(f, "AI"),
            Provenance::RegexFallback => write!(f, "RegexFallback"),
        }
    }
}

impl std::str::FromStr for Provenance {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AI" => Ok(Provenance::Ai),
            "RegexFallback" => Ok(Provenance::RegexFallback),
            other => Err(format!("Unknown provenance: '{other}'")),
        }
    }
}

/// The structured guess an extraction strategy makes about a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateExpense {
    pub amount: Money,
    pub currency: String,
    pub merchant: String,
    pub category: Category,
    pub kind: TransactionKind,
    pub notes: String,
    /// Only the AI path reports a confidence.
    pub confidence: Option<f32>,
    pub provenance: Provenance,
}

/// An expense ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub user_id: UserId,
    pub amount: Money,
    pub currency: String,
    pub merchant: String,
    pub category: Category,
    pub kind: TransactionKind,
    pub notes: String,
    pub confidence: Option<f32>,
    pub provenance: Option<Provenance>,
    pub source: String,
    pub occurred_at: NaiveDateTime,
    pub notification_id: Option<NotificationId>,
    pub linked_bill_id: Option<BillId>,
}

impl NewExpense {
    /// Mark this expense as settling `bill`. Appends the marker to the notes
    /// at most once; returns whether anything changed.
    pub fn link_to_bill(&mut self, bill_id: BillId, bill_category: Category) -> bool {
        link_notes(&mut self.notes, &mut self.linked_bill_id, bill_id, bill_category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserId,
    pub amount: Money,
    pub currency: String,
    pub merchant: String,
    pub category: Category,
    pub kind: TransactionKind,
    pub notes: String,
    pub confidence: Option<f32>,
    pub provenance: Option<Provenance>,
    pub source: String,
    pub occurred_at: NaiveDateTime,
    pub notification_id: Option<NotificationId>,
    pub linked_bill_id: Option<BillId>,
    pub created_at: NaiveDateTime,
}

impl Expense {
    pub fn is_linked(&self) -> bool {
        self.notes.contains(BILL_LINK_MARKER)
    }

    pub fn link_to_bill(&mut self, bill_id: BillId, bill_category: Category) -> bool {
        link_notes(&mut self.notes, &mut self.linked_bill_id, bill_id, bill_category)
    }
}

fn link_notes(
    notes: &mut String,
    linked: &mut Option<BillId>,
    bill_id: BillId,
    bill_category: Category,
) -> bool {
    if notes.contains(BILL_LINK_MARKER) {
        return false;
    }
    notes.push_str(&format!(" ({BILL_LINK_MARKER}: {bill_category})"));
    *linked = Some(bill_id);
    true
}
