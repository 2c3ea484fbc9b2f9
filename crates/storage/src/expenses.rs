use chrono::NaiveDateTime;
use sqlx::SqliteConnection;
use tally_core::{
    BillId, Category, Expense, ExpenseId, Money, NewExpense, NotificationId, Provenance,
    TransactionKind, UserId,
};

use crate::db::{cents, format_ts, parse_ts};

type ExpenseRow = (
    i64,
    i64,
    i64,
    String,
    String,
    String,
    String,
    String,
    Option<f64>,
    Option<String>,
    String,
    String,
    Option<i64>,
    Option<i64>,
    String,
);

const COLUMNS: &str = "id, user_id, amount_cents, currency, merchant, category, kind, notes, \
                       confidence, provenance, source, occurred_at, notification_id, linked_bill_id, created_at";

fn expense_from_row(r: ExpenseRow) -> Result<Expense, sqlx::Error> {
    Ok(Expense {
        id: ExpenseId(r.0),
        user_id: UserId(r.1),
        amount: Money::from_cents(r.2),
        currency: r.3,
        merchant: r.4,
        category: Category::from_label(&r.5),
        kind: TransactionKind::from_action(&r.6),
        notes: r.7,
        confidence: r.8.map(|c| c as f32),
        provenance: r.9.and_then(|p| p.parse::<Provenance>().ok()),
        source: r.10,
        occurred_at: parse_ts(&r.11)?,
        notification_id: r.12.map(NotificationId),
        linked_bill_id: r.13.map(BillId),
        created_at: parse_ts(&r.14)?,
    })
}

fn rows_to_expenses(rows: Vec<ExpenseRow>) -> Result<Vec<Expense>, sqlx::Error> {
    rows.into_iter().map(expense_from_row).collect()
}

pub async fn insert_expense(
    conn: &mut SqliteConnection,
    e: &NewExpense,
) -> Result<Expense, sqlx::Error> {
    let row = sqlx::query_as::<_, ExpenseRow>(&format!(
        "INSERT INTO expenses (user_id, amount_cents, currency, merchant, category, kind, notes, \
         confidence, provenance, source, occurred_at, notification_id, linked_bill_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(e.user_id.0)
    .bind(cents(e.amount)?)
    .bind(&e.currency)
    .bind(&e.merchant)
    .bind(e.category.as_str())
    .bind(e.kind.to_string())
    .bind(&e.notes)
    .bind(e.confidence.map(f64::from))
    .bind(e.provenance.map(|p| p.to_string()))
    .bind(&e.source)
    .bind(format_ts(e.occurred_at))
    .bind(e.notification_id.map(|n| n.0))
    .bind(e.linked_bill_id.map(|b| b.0))
    .fetch_one(&mut *conn)
    .await?;
    expense_from_row(row)
}

pub async fn get_expense(
    conn: &mut SqliteConnection,
    id: ExpenseId,
) -> Result<Option<Expense>, sqlx::Error> {
    let row = sqlx::query_as::<_, ExpenseRow>(&format!("SELECT {COLUMNS} FROM expenses WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(expense_from_row).transpose()
}

/// Persist a bill link made with [`Expense::link_to_bill`].
pub async fn update_expense_link(
    conn: &mut SqliteConnection,
    expense: &Expense,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE expenses SET notes = ?, linked_bill_id = ? WHERE id = ?")
        .bind(&expense.notes)
        .bind(expense.linked_bill_id.map(|b| b.0))
        .bind(expense.id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Expenses with exactly this merchant and amount, dated within
/// `[start, end]` (both inclusive), oldest row first.
pub async fn find_expenses_for_bill(
    conn: &mut SqliteConnection,
    user_id: UserId,
    merchant: &str,
    amount: Money,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Expense>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
        "SELECT {COLUMNS} FROM expenses \
         WHERE user_id = ? AND merchant = ? AND amount_cents = ? AND occurred_at >= ? AND occurred_at <= ? \
         ORDER BY id"
    ))
    .bind(user_id.0)
    .bind(merchant)
    .bind(cents(amount)?)
    .bind(format_ts(start))
    .bind(format_ts(end))
    .fetch_all(&mut *conn)
    .await?;
    rows_to_expenses(rows)
}

/// Expenses dated strictly after `after`, newest first.
pub async fn get_expenses_since(
    conn: &mut SqliteConnection,
    user_id: UserId,
    after: NaiveDateTime,
) -> Result<Vec<Expense>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
        "SELECT {COLUMNS} FROM expenses WHERE user_id = ? AND occurred_at > ? ORDER BY occurred_at DESC, id DESC"
    ))
    .bind(user_id.0)
    .bind(format_ts(after))
    .fetch_all(&mut *conn)
    .await?;
    rows_to_expenses(rows)
}

pub async fn get_expenses_for_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Vec<Expense>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
        "SELECT {COLUMNS} FROM expenses WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id.0)
    .fetch_all(&mut *conn)
    .await?;
    rows_to_expenses(rows)
}
