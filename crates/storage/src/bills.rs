use sqlx::SqliteConnection;
use tally_core::{Bill, BillId, Category, Frequency, Money, NewBill, UserId};

use crate::db::{cents, format_ts, parse_opt_ts, parse_ts};

type BillRow = (
    i64,
    i64,
    String,
    String,
    String,
    i64,
    String,
    bool,
    Option<String>,
    String,
);

const COLUMNS: &str =
    "id, user_id, merchant, category, note, amount_cents, due_at, is_paid, last_paid_at, frequency";

fn bill_from_row(r: BillRow) -> Result<Bill, sqlx::Error> {
    Ok(Bill {
        id: BillId(r.0),
        user_id: UserId(r.1),
        merchant: r.2,
        category: Category::from_label(&r.3),
        note: r.4,
        amount: Money::from_cents(r.5),
        due_at: parse_ts(&r.6)?,
        is_paid: r.7,
        last_paid_at: parse_opt_ts(r.8)?,
        frequency: Frequency::parse(&r.9),
    })
}

pub async fn insert_bill(conn: &mut SqliteConnection, b: &NewBill) -> Result<Bill, sqlx::Error> {
    let row = sqlx::query_as::<_, BillRow>(&format!(
        "INSERT INTO bills (user_id, merchant, category, note, amount_cents, due_at, frequency) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(b.user_id.0)
    .bind(&b.merchant)
    .bind(b.category.as_str())
    .bind(&b.note)
    .bind(cents(b.amount)?)
    .bind(format_ts(b.due_at))
    .bind(b.frequency.as_str())
    .fetch_one(&mut *conn)
    .await?;
    bill_from_row(row)
}

pub async fn get_bill(conn: &mut SqliteConnection, id: BillId) -> Result<Option<Bill>, sqlx::Error> {
    let row = sqlx::query_as::<_, BillRow>(&format!("SELECT {COLUMNS} FROM bills WHERE id = ?"))
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(bill_from_row).transpose()
}

/// All of a user's bills in insertion order; matching is first-wins over
/// this order.
pub async fn get_bills_for_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Vec<Bill>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BillRow>(&format!(
        "SELECT {COLUMNS} FROM bills WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id.0)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(bill_from_row).collect()
}

/// Write back the mutable recurrence state.
pub async fn update_bill_state(conn: &mut SqliteConnection, b: &Bill) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bills SET due_at = ?, is_paid = ?, last_paid_at = ? WHERE id = ?")
        .bind(format_ts(b.due_at))
        .bind(b.is_paid)
        .bind(b.last_paid_at.map(format_ts))
        .bind(b.id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
