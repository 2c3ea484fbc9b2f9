use chrono::{Days, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::Category;
use crate::money::Money;
use crate::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillId(pub i64);

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How often a bill recurs. Stored rows may carry labels the ledger does not
/// understand; those are kept verbatim and never move the due date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Frequency {
    #[default]
    Monthly,
    Weekly,
    Yearly,
    Other(String),
}

impl Frequency {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "MONTHLY" => Frequency::Monthly,
            "WEEKLY" => Frequency::Weekly,
            "YEARLY" => Frequency::Yearly,
            _ => Frequency::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Yearly => "YEARLY",
            Frequency::Other(s) => s,
        }
    }

    /// One interval after `from`. `None` for unrecognised frequencies (and on
    /// calendar overflow): the caller keeps the date it had.
    pub fn next_after(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Frequency::Monthly => from.checked_add_months(Months::new(1)),
            Frequency::Weekly => from.checked_add_days(Days::new(7)),
            Frequency::Yearly => from.checked_add_months(Months::new(12)),
            Frequency::Other(_) => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring bill. `due_at` is always the next unpaid occurrence: paying
/// advances the record instead of archiving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: BillId,
    pub user_id: UserId,
    pub merchant: String,
    pub category: Category,
    pub note: String,
    pub amount: Money,
    pub due_at: NaiveDateTime,
    pub is_paid: bool,
    pub last_paid_at: Option<NaiveDateTime>,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub user_id: UserId,
    pub merchant: String,
    pub category: Category,
    pub note: String,
    pub amount: Money,
    pub due_at: NaiveDateTime,
    pub frequency: Frequency,
}
