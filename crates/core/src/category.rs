use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of spending categories an expense or bill can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    Transaction,
    Food,
    Travel,
    Groceries,
    Shopping,
    Entertainment,
    Utilities,
    Health,
    Investment,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Transaction,
        Category::Food,
        Category::Travel,
        Category::Groceries,
        Category::Shopping,
        Category::Entertainment,
        Category::Utilities,
        Category::Health,
        Category::Investment,
        Category::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Transaction => "Transaction",
            Category::Food => "Food",
            Category::Travel => "Travel",
            Category::Groceries => "Groceries",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Utilities => "Utilities",
            Category::Health => "Health",
            Category::Investment => "Investment",
            Category::General => "General",
        }
    }

    /// Lenient lookup for labels coming from outside the ledger (AI responses,
    /// stored rows). Anything unrecognised lands in `General`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category: '{s}'"))
    }
}
