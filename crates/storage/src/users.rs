use sqlx::SqliteConnection;
use tally_core::{User, UserId};

type UserRow = (i64, String, Option<String>, Option<String>);

fn user_from_row(r: UserRow) -> User {
    User {
        id: UserId(r.0),
        email: r.1,
        mobile_number: r.2,
        display_name: r.3,
    }
}

pub async fn insert_user(
    conn: &mut SqliteConnection,
    email: &str,
    mobile_number: Option<&str>,
    display_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, mobile_number, display_name) VALUES (?, ?, ?) RETURNING id, email, mobile_number, display_name",
    )
    .bind(email.trim())
    .bind(mobile_number.map(str::trim))
    .bind(display_name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(user_from_row(row))
}

pub async fn get_user(conn: &mut SqliteConnection, id: UserId) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, mobile_number, display_name FROM users WHERE id = ?",
    )
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(user_from_row))
}

/// Case-insensitive: the column is declared `COLLATE NOCASE`.
pub async fn find_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, mobile_number, display_name FROM users WHERE email = ?",
    )
    .bind(email.trim())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(user_from_row))
}

pub async fn find_user_by_mobile(
    conn: &mut SqliteConnection,
    mobile_number: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, mobile_number, display_name FROM users WHERE lower(mobile_number) = lower(?)",
    )
    .bind(mobile_number.trim())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(user_from_row))
}
