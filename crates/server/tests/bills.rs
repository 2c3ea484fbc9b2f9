mod common;

use common::{at, regex_env};
use tally_core::{
    BillId, Category, Money, NewExpense, Provenance, TransactionKind, BILL_LINK_MARKER,
};
use tally_server::ServiceError;
use tally_storage::{get_bill, get_expenses_for_user, insert_expense};

#[tokio::test]
async fn paying_before_due_date_changes_nothing() {
    let env = regex_env().await;
    let bill = env.add_bill("Netflix", 999, at(2024, 7, 1, 0, 0)).await;

    let err = env
        .state
        .bills
        .mark_paid(bill.id, at(2024, 6, 30, 23, 59))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotYetDue { .. }));

    let mut conn = env.pool.acquire().await.unwrap();
    assert_eq!(get_bill(&mut conn, bill.id).await.unwrap().unwrap(), bill);
    assert!(get_expenses_for_user(&mut conn, env.user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn paying_on_due_day_is_allowed() {
    let env = regex_env().await;
    let bill = env.add_bill("Netflix", 999, at(2024, 7, 1, 18, 0)).await;
    let paid = env.state.bills.mark_paid(bill.id, at(2024, 7, 1, 9, 0)).await.unwrap();
    assert_eq!(paid.bill.due_at, at(2024, 8, 1, 18, 0));
}

#[tokio::test]
async fn paying_without_expense_generates_one() {
    let env = regex_env().await;
    let bill = env.add_bill("Gym", 1500, at(2024, 5, 28, 0, 0)).await;
    let now = at(2024, 6, 1, 12, 0);

    let paid = env.state.bills.mark_paid(bill.id, now).await.unwrap();

    assert!(paid.created_expense);
    assert_eq!(paid.expense.source, "Bill Auto-Pay");
    assert_eq!(paid.expense.amount, Money::from_major(1500));
    assert_eq!(paid.expense.kind, TransactionKind::Debited);
    assert_eq!(paid.expense.occurred_at, now);
    assert_eq!(paid.expense.linked_bill_id, Some(bill.id));
    assert_eq!(paid.expense.notes, "Auto-generated from Bill: Gym plan");

    assert_eq!(paid.bill.due_at, at(2024, 6, 28, 0, 0));
    assert_eq!(paid.bill.last_paid_at, Some(now));
    assert!(!paid.bill.is_paid);

    let mut conn = env.pool.acquire().await.unwrap();
    let stored = get_bill(&mut conn, bill.id).await.unwrap().unwrap();
    assert_eq!(stored, paid.bill);
    assert_eq!(get_expenses_for_user(&mut conn, env.user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn paying_links_nearby_expense_instead_of_creating_one() {
    let env = regex_env().await;
    let bill = env.add_bill("Netflix", 999, at(2024, 5, 28, 0, 0)).await;
    let existing = {
        let mut conn = env.pool.acquire().await.unwrap();
        insert_expense(
            &mut conn,
            &NewExpense {
                user_id: env.user.id,
                amount: Money::from_major(999),
                currency: "INR".into(),
                merchant: "Netflix".into(),
                category: Category::Entertainment,
                kind: TransactionKind::Debited,
                notes: "Auto-parsed from notification".into(),
                confidence: None,
                provenance: Some(Provenance::RegexFallback),
                source: "SMS (Regex Fallback)".into(),
                occurred_at: at(2024, 6, 1, 8, 0),
                notification_id: None,
                linked_bill_id: None,
            },
        )
        .await
        .unwrap()
    };

    let paid = env
        .state
        .bills
        .mark_paid(bill.id, at(2024, 6, 2, 10, 0))
        .await
        .unwrap();

    assert!(!paid.created_expense);
    assert_eq!(paid.expense.id, existing.id);
    assert_eq!(paid.expense.linked_bill_id, Some(bill.id));
    assert_eq!(paid.expense.notes.matches(BILL_LINK_MARKER).count(), 1);
    assert_eq!(paid.bill.due_at, at(2024, 6, 28, 0, 0));

    let mut conn = env.pool.acquire().await.unwrap();
    let all = get_expenses_for_user(&mut conn, env.user.id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_linked());
}

#[tokio::test]
async fn expense_outside_window_is_not_linked() {
    let env = regex_env().await;
    let bill = env.add_bill("Netflix", 999, at(2024, 5, 28, 0, 0)).await;
    {
        let mut conn = env.pool.acquire().await.unwrap();
        insert_expense(
            &mut conn,
            &NewExpense {
                user_id: env.user.id,
                amount: Money::from_major(999),
                currency: "INR".into(),
                merchant: "Netflix".into(),
                category: Category::Entertainment,
                kind: TransactionKind::Debited,
                notes: "Auto-parsed from notification".into(),
                confidence: None,
                provenance: Some(Provenance::RegexFallback),
                source: "SMS (Regex Fallback)".into(),
                occurred_at: at(2024, 5, 10, 8, 0),
                notification_id: None,
                linked_bill_id: None,
            },
        )
        .await
        .unwrap();
    }

    let paid = env.state.bills.mark_paid(bill.id, at(2024, 6, 1, 0, 0)).await.unwrap();
    assert!(paid.created_expense);

    let mut conn = env.pool.acquire().await.unwrap();
    assert_eq!(get_expenses_for_user(&mut conn, env.user.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_bill_is_not_found() {
    let env = regex_env().await;
    let err = env
        .state
        .bills
        .mark_paid(BillId(4242), at(2024, 6, 1, 0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BillNotFound(BillId(4242))));
}
