use chrono::Months;
use tally_core::{Bill, Frequency, NewBill, NewExpense};

/// Phrases that mark a payment as recurring.
pub const RECURRING_KEYWORDS: &[&str] = &["auto pay", "auto-pay", "subscription", "recurring"];

pub const INFERRED_BILL_NOTE: &str = "Auto-detected from notification";

pub fn suggests_recurring(text: &str) -> bool {
    let lower = text.to_lowercase();
    RECURRING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Propose a monthly bill for an unmatched expense whose notification reads
/// like a subscription. Nothing is proposed when the user already tracks a
/// bill under the same merchant name.
pub fn infer_bill(expense: &NewExpense, notification_text: &str, bills: &[Bill]) -> Option<NewBill> {
    if !suggests_recurring(notification_text) {
        return None;
    }
    if bills
        .iter()
        .any(|b| b.merchant.eq_ignore_ascii_case(&expense.merchant))
    {
        return None;
    }
    let due_at = expense.occurred_at.checked_add_months(Months::new(1))?;
    Some(NewBill {
        user_id: expense.user_id,
        merchant: expense.merchant.clone(),
        category: expense.category,
        note: INFERRED_BILL_NOTE.to_string(),
        amount: expense.amount,
        due_at,
        frequency: Frequency::Monthly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tally_core::{BillId, Category, Money, TransactionKind, UserId};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn expense(merchant: &str) -> NewExpense {
        NewExpense {
            user_id: UserId(2),
            amount: Money::from_major(119),
            currency: "INR".into(),
            merchant: merchant.into(),
            category: Category::Entertainment,
            kind: TransactionKind::Debited,
            notes: String::new(),
            confidence: None,
            provenance: None,
            source: "Email (AI)".into(),
            occurred_at: at(2024, 1, 31),
            notification_id: None,
            linked_bill_id: None,
        }
    }

    fn existing(merchant: &str) -> Bill {
        Bill {
            id: BillId(9),
            user_id: UserId(2),
            merchant: merchant.into(),
            category: Category::Entertainment,
            note: String::new(),
            amount: Money::from_major(119),
            due_at: at(2024, 5, 1),
            is_paid: false,
            last_paid_at: None,
            frequency: Frequency::Monthly,
        }
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert!(suggests_recurring("Your SUBSCRIPTION has been renewed"));
        assert!(suggests_recurring("Auto-Pay set up for Spotify"));
        assert!(suggests_recurring("auto pay successful"));
        assert!(suggests_recurring("Recurring mandate executed"));
        assert!(!suggests_recurring("INR 119 debited towards Spotify"));
    }

    #[test]
    fn infers_monthly_bill_a_month_out() {
        let bill = infer_bill(&expense("Spotify"), "Spotify subscription renewed", &[]).unwrap();
        assert_eq!(bill.frequency, Frequency::Monthly);
        assert_eq!(bill.due_at, at(2024, 2, 29));
        assert_eq!(bill.note, INFERRED_BILL_NOTE);
        assert_eq!(bill.merchant, "Spotify");
        assert_eq!(bill.amount, Money::from_major(119));
        assert_eq!(bill.category, Category::Entertainment);
        assert_eq!(bill.user_id, UserId(2));
    }

    #[test]
    fn no_keyword_no_bill() {
        assert!(infer_bill(&expense("Spotify"), "Payment received", &[]).is_none());
    }

    #[test]
    fn existing_bill_with_same_merchant_blocks_inference() {
        let bills = vec![existing("SPOTIFY")];
        assert!(infer_bill(&expense("Spotify"), "subscription", &bills).is_none());
    }

    #[test]
    fn similar_but_different_merchant_does_not_block() {
        let bills = vec![existing("Spotify Family")];
        assert!(infer_bill(&expense("Spotify"), "subscription", &bills).is_some());
    }
}
