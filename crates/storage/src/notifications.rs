use chrono::NaiveDateTime;
use sqlx::SqliteConnection;
use tally_core::{Channel, NotificationId, RawNotification, UserId};

use crate::db::{decode_error, format_ts, parse_ts};

/// A validated notification about to be written.
#[derive(Debug, Clone)]
pub struct NotificationInsert {
    pub user_id: UserId,
    pub channel: Channel,
    pub message_id: String,
    pub sender: String,
    pub subject: Option<String>,
    pub body: String,
    pub received_at: NaiveDateTime,
    pub fingerprint: String,
}

type NotificationRow = (
    i64,
    i64,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
);

const COLUMNS: &str =
    "id, user_id, channel, message_id, sender, subject, body, received_at, fingerprint, created_at";

fn notification_from_row(r: NotificationRow) -> Result<RawNotification, sqlx::Error> {
    let channel = r.2.parse::<Channel>().map_err(|e| decode_error(&r.2, e))?;
    Ok(RawNotification {
        id: NotificationId(r.0),
        user_id: UserId(r.1),
        channel,
        message_id: r.3,
        sender: r.4,
        subject: r.5,
        body: r.6,
        received_at: parse_ts(&r.7)?,
        fingerprint: r.8,
        created_at: parse_ts(&r.9)?,
    })
}

pub async fn insert_notification(
    conn: &mut SqliteConnection,
    n: &NotificationInsert,
) -> Result<RawNotification, sqlx::Error> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!(
        "INSERT INTO notifications (user_id, channel, message_id, sender, subject, body, received_at, fingerprint) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(n.user_id.0)
    .bind(n.channel.to_string())
    .bind(&n.message_id)
    .bind(&n.sender)
    .bind(&n.subject)
    .bind(&n.body)
    .bind(format_ts(n.received_at))
    .bind(&n.fingerprint)
    .fetch_one(&mut *conn)
    .await?;
    notification_from_row(row)
}

/// Message ids are the caller's, so they are only unique per user and channel.
pub async fn find_notification_by_message_id(
    conn: &mut SqliteConnection,
    user_id: UserId,
    channel: Channel,
    message_id: &str,
) -> Result<Option<RawNotification>, sqlx::Error> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!(
        "SELECT {COLUMNS} FROM notifications WHERE user_id = ? AND channel = ? AND message_id = ?"
    ))
    .bind(user_id.0)
    .bind(channel.to_string())
    .bind(message_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(notification_from_row).transpose()
}

/// Secondary duplicate lookup: the fingerprint narrows via its index, the
/// triple comparison guards against hash collisions. `subject IS ?` treats
/// two missing subjects as equal.
pub async fn find_notification_by_fingerprint(
    conn: &mut SqliteConnection,
    user_id: UserId,
    fingerprint: &str,
    sender: &str,
    subject: Option<&str>,
    received_at: NaiveDateTime,
) -> Result<Option<RawNotification>, sqlx::Error> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!(
        "SELECT {COLUMNS} FROM notifications \
         WHERE user_id = ? AND fingerprint = ? AND sender = ? AND subject IS ? AND received_at = ? \
         ORDER BY id LIMIT 1"
    ))
    .bind(user_id.0)
    .bind(fingerprint)
    .bind(sender)
    .bind(subject)
    .bind(format_ts(received_at))
    .fetch_optional(&mut *conn)
    .await?;
    row.map(notification_from_row).transpose()
}

pub async fn count_notifications(conn: &mut SqliteConnection, user_id: UserId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
        .bind(user_id.0)
        .fetch_one(&mut *conn)
        .await
}
