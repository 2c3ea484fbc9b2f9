use std::sync::OnceLock;

use regex::Regex;
use tally_core::{CandidateExpense, Category, Money, Provenance, TransactionKind};

use crate::categorize::Categorizer;
use crate::normalize::strip_html_tags;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_alert,
    r"(?i)(INR|Rs\.?|₹|USD|\$)\s*([\d,.]+)\s+(?:was\s+)?(debited|credited|spent)(?:\s+(?:from|to|on)\b)?\s*(.*)");
re!(re_merchant_label,
    r"(?i)Merchant Name[:\s]+([^\n\r]+)");
re!(re_upi,
    r"(?i)(UPI/(?:P2A|P2M|P2P)/[^\n\r]+)");

pub const BANK_TRANSACTION: &str = "Bank Transaction";
pub const CREDIT_TO_ACCOUNT: &str = "Credit to Account";
const DEFAULT_NOTES: &str = "Auto-parsed from notification";

const MERCHANT_LABEL_MAX: usize = 50;
const UPI_MERCHANT_MAX: usize = 100;

// ── Public extraction API ─────────────────────────────────────────────────────

/// Pattern-matching extraction for bank alerts such as
/// `Rs. 1,250.50 was debited towards Acme Store`.
#[derive(Debug, Clone, Default)]
pub struct RegexExtractor {
    categorizer: Categorizer,
}

impl RegexExtractor {
    pub fn new(categorizer: Categorizer) -> Self {
        Self { categorizer }
    }

    /// Scan `headline` (the subject, or the body for SMS) for an amount and
    /// action word; `body` supplies merchant labels and UPI references.
    /// Returns `None` when no amount is found or it fails to convert.
    pub fn extract(&self, headline: &str, body: &str) -> Option<CandidateExpense> {
        let caps = re_alert().captures(headline)?;
        let currency = currency_code(caps.get(1)?.as_str());
        let amount = Money::parse(caps.get(2)?.as_str()).ok()?;
        let kind = TransactionKind::from_action(caps.get(3)?.as_str());
        let remainder = caps.get(4).map_or("", |m| m.as_str());

        let upi = find_upi_reference(body);
        let merchant = Self::resolve_merchant(kind, remainder, body, upi.as_deref());
        let category = self.resolve_category(kind, &merchant, remainder, upi.is_some());
        let notes = upi.unwrap_or_else(|| DEFAULT_NOTES.to_string());

        Some(CandidateExpense {
            amount,
            currency: currency.to_string(),
            merchant,
            category,
            kind,
            notes,
            confidence: None,
            provenance: Provenance::RegexFallback,
        })
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    fn resolve_merchant(
        kind: TransactionKind,
        remainder: &str,
        body: &str,
        upi: Option<&str>,
    ) -> String {
        if let Some(name) = merchant_label(body) {
            return name;
        }
        if kind == TransactionKind::Credited {
            return CREDIT_TO_ACCOUNT.to_string();
        }
        if let Some(name) = upi.and_then(upi_merchant) {
            return name;
        }
        merchant_from_remainder(remainder)
    }

    // ── Category ──────────────────────────────────────────────────────────────

    fn resolve_category(
        &self,
        kind: TransactionKind,
        merchant: &str,
        remainder: &str,
        has_upi: bool,
    ) -> Category {
        if kind == TransactionKind::Transfer || merchant.eq_ignore_ascii_case(BANK_TRANSACTION) {
            return Category::Transaction;
        }
        match self.categorizer.categorize(merchant, remainder) {
            Category::General if has_upi => Category::Transaction,
            Category::General if kind == TransactionKind::Spent => Category::Utilities,
            other => other,
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn currency_code(token: &str) -> &'static str {
    match token.to_ascii_uppercase().as_str() {
        "USD" | "$" => "USD",
        _ => "INR",
    }
}

fn merchant_label(body: &str) -> Option<String> {
    let c = re_merchant_label().captures(body)?;
    let found = c.get(1)?.as_str().trim();
    let len = found.chars().count();
    (1..=MERCHANT_LABEL_MAX)
        .contains(&len)
        .then(|| found.to_string())
}

fn find_upi_reference(body: &str) -> Option<String> {
    let c = re_upi().captures(body)?;
    let token = strip_html_tags(c.get(1)?.as_str()).trim().to_string();
    (!token.is_empty()).then_some(token)
}

/// Fourth `/`-separated segment of `UPI/P2M/<ref>/<merchant>/...`.
fn upi_merchant(token: &str) -> Option<String> {
    let segment = token.split('/').nth(3)?.trim();
    let len = segment.chars().count();
    (1..=UPI_MERCHANT_MAX)
        .contains(&len)
        .then(|| segment.to_string())
}

fn merchant_from_remainder(remainder: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with `remainder`.
    let lower = remainder.to_ascii_lowercase();
    if let Some(pos) = lower.find("towards") {
        let after = remainder[pos + "towards".len()..].trim();
        let token = after
            .split(|c: char| c.is_whitespace() || c == '.')
            .next()
            .unwrap_or("");
        if !token.is_empty() {
            return token.to_string();
        }
    }
    BANK_TRANSACTION.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
