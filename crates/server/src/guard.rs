use chrono::{DateTime, NaiveDateTime, Timelike};
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use tally_core::{Channel, RawNotification, UserId, TIMESTAMP_FORMAT};
use tally_storage::{find_notification_by_fingerprint, find_notification_by_message_id};
use tracing::debug;

const LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Best-effort parse of a caller-supplied receive time, truncated to whole
/// seconds. RFC 3339 input keeps its wall-clock time (the offset is dropped,
/// not applied). Anything unparseable, or nothing at all, becomes `now`.
pub fn parse_received_at(raw: Option<&str>, now: NaiveDateTime) -> NaiveDateTime {
    let parsed = raw.map(str::trim).filter(|s| !s.is_empty()).and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.naive_local())
            .ok()
            .or_else(|| {
                LOCAL_FORMATS
                    .iter()
                    .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            })
    });
    let ts = parsed.unwrap_or_else(|| {
        debug!(raw = ?raw, "Unparseable or missing timestamp, using current time");
        now
    });
    ts.with_nanosecond(0).unwrap_or(ts)
}

fn to_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-256 over sender, subject and received time, as lowercase hex.
pub fn fingerprint(sender: &str, subject: Option<&str>, received_at: NaiveDateTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sender.as_bytes());
    hasher.update([0u8]);
    hasher.update(subject.unwrap_or_default().as_bytes());
    hasher.update([0u8]);
    hasher.update(received_at.format(TIMESTAMP_FORMAT).to_string().as_bytes());
    to_hex(&hasher.finalize())
}

/// Look for an already-stored copy of this notification for `user_id`:
/// first by the client's message id on that channel, then by (sender,
/// subject, received time).
pub async fn find_duplicate(
    conn: &mut SqliteConnection,
    user_id: UserId,
    channel: Channel,
    message_id: &str,
    sender: &str,
    subject: Option<&str>,
    received_at: NaiveDateTime,
) -> Result<Option<RawNotification>, sqlx::Error> {
    if let Some(existing) =
        find_notification_by_message_id(conn, user_id, channel, message_id).await?
    {
        return Ok(Some(existing));
    }
    let fp = fingerprint(sender, subject, received_at);
    find_notification_by_fingerprint(conn, user_id, &fp, sender, subject, received_at).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn rfc3339_keeps_wall_clock() {
        assert_eq!(parse_received_at(Some("2024-01-09T18:30:00Z"), now()), ts(18, 30, 0));
        assert_eq!(parse_received_at(Some("2024-01-09T18:30:00+05:30"), now()), ts(18, 30, 0));
    }

    #[test]
    fn local_formats_and_truncation() {
        assert_eq!(parse_received_at(Some("2024-01-09T18:30:05.789"), now()), ts(18, 30, 5));
        assert_eq!(parse_received_at(Some("2024-01-09 18:30:05"), now()), ts(18, 30, 5));
        assert_eq!(parse_received_at(Some("2024-01-09T18:30:05.5Z"), now()), ts(18, 30, 5));
    }

    #[test]
    fn garbage_falls_back_to_now() {
        assert_eq!(parse_received_at(Some("yesterday"), now()), now());
        assert_eq!(parse_received_at(Some("  "), now()), now());
        assert_eq!(parse_received_at(None, now()), now());
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishing() {
        let a = fingerprint("+919800000001", None, ts(1, 2, 3));
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint("+919800000001", None, ts(1, 2, 3)));
        assert_ne!(a, fingerprint("+919800000001", Some("x"), ts(1, 2, 3)));
        assert_ne!(a, fingerprint("+919800000001", None, ts(1, 2, 4)));
        assert_ne!(
            fingerprint("ab", Some("c"), ts(1, 2, 3)),
            fingerprint("a", Some("bc"), ts(1, 2, 3))
        );
    }
}
