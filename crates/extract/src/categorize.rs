use serde::{Deserialize, Serialize};
use std::path::Path;
use tally_core::Category;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CategorizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse rule file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Rule file defines no rules")]
    Empty,
}

/// One ordered keyword set. A rule fires when any keyword is a substring of
/// the lower-cased merchant + context text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<KeywordRule>,
}

/// Keyword sets in evaluation order. Order is part of the contract: the
/// first set that matches decides, so e.g. Food beats Utilities.
const BUILTIN_RULES: &[(Category, &[&str])] = &[
    (Category::Transaction, &["dreamplug", "cred "]),
    (
        Category::Food,
        &[
            "swiggy", "zomato", "food", "restaurant", "starbucks", "cafe", "coffee", "tea",
            "burger", "pizza", "dominos", "kfc", "mcdonalds", "subway", "dining", "eat",
        ],
    ),
    (
        Category::Travel,
        &[
            "uber", "ola", "rapido", "redbus", "irctc", "railway", "metro", "train", "flight",
            "indigo", "vistara", "air india", "makemytrip", "goibibo", "yatra", "booking",
            "petrol", "fuel", "diesel", "shell", "hpcl", "bpcl", "ioc", "fastag", "transport",
        ],
    ),
    (
        Category::Groceries,
        &[
            "bigbasket", "blinkit", "zepto", "instamart", "dmart", "grocery", "supermarket",
            "market", "fresh", "vegetable", "fruit", "milk", "dairy",
        ],
    ),
    (
        Category::Shopping,
        &[
            "amazon", "flipkart", "myntra", "ajio", "meesho", "nykaa", "reliance", "croma",
            "tata", "retail", "mart", "store", "decathlon", "ikea", "zudio", "westside",
            "pantaloons", "cloth", "fashion", "shopping",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "netflix", "spotify", "hotstar", "prime video", "youtube", "movie", "cinema", "pvr",
            "inox", "bookmyshow", "game", "steam", "playstation", "entertainment",
        ],
    ),
    (
        Category::Utilities,
        &[
            "bill", "recharge", "airtel", "jio", "bsnl", "vodafone", "broadband", "hathway",
            "electricity", "bescom", "water", "gas", "utility",
        ],
    ),
    (
        Category::Health,
        &[
            "hospital", "pharmacy", "medicine", "medical", "apollo", "1mg", "pharmeasy",
            "practo", "doctor", "clinic", "lab", "diagnostic", "health",
        ],
    ),
    (
        Category::Investment,
        &[
            "investment", "mutual fund", "sip", "zerodha", "groww", "upstox", "stock", "ppf",
            "lic", "insurance", "premium", "policy",
        ],
    ),
];

/// Maps merchant text to a [`Category`] by scanning keyword sets in order.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<KeywordRule>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(
            BUILTIN_RULES
                .iter()
                .map(|(category, keywords)| KeywordRule::new(*category, keywords))
                .collect(),
        )
    }
}

impl Categorizer {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| KeywordRule {
                category: r.category,
                keywords: r.keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { rules }
    }

    /// Load an ordered `[[rule]]` table. File order is evaluation order.
    pub fn from_toml(toml_content: &str) -> Result<Self, CategorizerError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        if file.rule.is_empty() {
            return Err(CategorizerError::Empty);
        }
        Ok(Self::new(file.rule))
    }

    pub fn from_file(path: &Path) -> Result<Self, CategorizerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn find_matching_rule(&self, merchant: &str, context: &str) -> Option<&KeywordRule> {
        let haystack = format!("{merchant} {context}").to_lowercase();
        self.rules.iter().find(|r| r.matches(&haystack))
    }

    pub fn categorize(&self, merchant: &str, context: &str) -> Category {
        self.find_matching_rule(merchant, context)
            .map(|r| r.category)
            .unwrap_or(Category::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(merchant: &str) -> Category {
        Categorizer::default().categorize(merchant, "")
    }

    #[test]
    fn well_known_merchants() {
        assert_eq!(cat("Swiggy"), Category::Food);
        assert_eq!(cat("Uber"), Category::Travel);
        assert_eq!(cat("BigBasket"), Category::Groceries);
        assert_eq!(cat("Flipkart"), Category::Shopping);
        assert_eq!(cat("Netflix"), Category::Entertainment);
        assert_eq!(cat("Airtel"), Category::Utilities);
        assert_eq!(cat("Apollo Pharmacy"), Category::Health);
        assert_eq!(cat("Zerodha"), Category::Investment);
    }

    #[test]
    fn unknown_merchant_is_general() {
        assert_eq!(cat("Unknown Shop"), Category::General);
        assert_eq!(cat(""), Category::General);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(cat("SWIGGY INSTAMART"), Category::Food);
        assert_eq!(cat("uBeR TrIp"), Category::Travel);
    }

    #[test]
    fn wallet_override_comes_first() {
        // "cred " needs the trailing space, which the merchant/context join supplies.
        assert_eq!(cat("CRED"), Category::Transaction);
        assert_eq!(cat("Dreamplug Food Court"), Category::Transaction);
    }

    #[test]
    fn food_beats_utilities() {
        assert_eq!(cat("Swiggy Bill Payment"), Category::Food);
        assert_eq!(cat("Zomato Recharge"), Category::Food);
    }

    #[test]
    fn travel_beats_shopping() {
        assert_eq!(cat("Indigo Store"), Category::Travel);
    }

    #[test]
    fn context_participates() {
        let c = Categorizer::default();
        assert_eq!(c.categorize("Acme", "towards electricity board"), Category::Utilities);
        assert_eq!(c.categorize("Acme", "towards Acme Store"), Category::Shopping);
    }

    #[test]
    fn deterministic() {
        let c = Categorizer::default();
        let first = c.categorize("Amazon Prime Video", "monthly");
        for _ in 0..10 {
            assert_eq!(c.categorize("Amazon Prime Video", "monthly"), first);
        }
    }

    #[test]
    fn builtin_order_is_pinned() {
        let order: Vec<Category> = Categorizer::default().rules.iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            vec![
                Category::Transaction,
                Category::Food,
                Category::Travel,
                Category::Groceries,
                Category::Shopping,
                Category::Entertainment,
                Category::Utilities,
                Category::Health,
                Category::Investment,
            ]
        );
    }

    #[test]
    fn from_toml_keeps_file_order() {
        let toml = r#"
            [[rule]]
            category = "Utilities"
            keywords = ["Bill"]

            [[rule]]
            category = "Food"
            keywords = ["swiggy"]
        "#;
        let c = Categorizer::from_toml(toml).unwrap();
        assert_eq!(c.categorize("Swiggy Bill", ""), Category::Utilities);
        assert_eq!(c.categorize("Swiggy", ""), Category::Food);
        assert_eq!(c.categorize("Netflix", ""), Category::General);
    }

    #[test]
    fn from_toml_rejects_empty_table() {
        assert!(matches!(Categorizer::from_toml(""), Err(CategorizerError::Empty)));
        assert!(matches!(
            Categorizer::from_toml("[[rule]]\ncategory = \"Nope\"\nkeywords = []"),
            Err(CategorizerError::Toml(_))
        ));
    }

    #[test]
    fn from_file_reads_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "[[rule]]\ncategory = \"Health\"\nkeywords = [\"gym\"]\n").unwrap();
        let c = Categorizer::from_file(&path).unwrap();
        assert_eq!(c.categorize("Cult Gym", ""), Category::Health);
    }
}
