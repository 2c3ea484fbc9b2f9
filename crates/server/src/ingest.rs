use std::sync::{Arc, OnceLock};

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use sqlx::SqliteConnection;
use tally_core::{Bill, Channel, Expense, NewNotification, RawNotification, User};
use tally_extract::{strip_html_tags, ExtractionPipeline};
use tally_reconcile::{infer_bill, pay_by_match, BillMatcher};
use tally_storage::{
    find_user_by_email, find_user_by_mobile, get_bills_for_user, insert_bill, insert_expense,
    insert_notification, update_bill_state, DbPool, NotificationInsert,
};
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::guard;
use crate::locks::UserLocks;

pub const MAX_SMS_BODY_CHARS: usize = 2_000;
pub const MAX_EMAIL_BODY_CHARS: usize = 100_000;

fn phone_pattern() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("invalid regex"))
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum IngestOutcome {
    /// Seen before; nothing was written.
    Duplicate { notification: RawNotification },
    /// Stored. `expense` is `None` when nothing could be extracted.
    #[serde(rename_all = "camelCase")]
    Recorded {
        notification: RawNotification,
        expense: Option<Expense>,
        matched_bill: Option<Bill>,
        inferred_bill: Option<Bill>,
    },
}

impl IngestOutcome {
    pub fn notification(&self) -> &RawNotification {
        match self {
            IngestOutcome::Duplicate { notification } => notification,
            IngestOutcome::Recorded { notification, .. } => notification,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate { .. })
    }
}

/// Validated and sanitized caller input.
#[derive(Debug, Clone)]
struct Accepted {
    channel: Channel,
    message_id: String,
    sender: String,
    subject: Option<String>,
    body: String,
    received_at: Option<String>,
}

fn validate(input: NewNotification) -> Result<Accepted, ServiceError> {
    let message_id = input.message_id.trim().to_string();
    if message_id.is_empty() {
        return Err(ServiceError::InvalidInput("message id must not be empty".into()));
    }
    let sender = input.sender.trim().to_string();
    if sender.is_empty() {
        return Err(ServiceError::InvalidInput("sender must not be empty".into()));
    }
    if input.body.trim().is_empty() {
        return Err(ServiceError::InvalidInput("body must not be empty".into()));
    }

    let (body, limit) = match input.channel {
        Channel::Sms => {
            if !phone_pattern().is_match(&sender) {
                return Err(ServiceError::InvalidInput(format!(
                    "'{sender}' is not a valid phone number"
                )));
            }
            (strip_html_tags(&input.body), MAX_SMS_BODY_CHARS)
        }
        Channel::Email => (input.body, MAX_EMAIL_BODY_CHARS),
    };
    if body.chars().count() > limit {
        return Err(ServiceError::InvalidInput(format!(
            "body exceeds maximum allowed length ({limit} characters)"
        )));
    }

    Ok(Accepted {
        channel: input.channel,
        message_id,
        sender,
        subject: input
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        body,
        received_at: input.received_at,
    })
}

async fn resolve_user(
    conn: &mut SqliteConnection,
    channel: Channel,
    sender: &str,
) -> Result<Option<User>, sqlx::Error> {
    match channel {
        Channel::Sms => find_user_by_mobile(conn, sender).await,
        Channel::Email => find_user_by_email(conn, sender).await,
    }
}

/// Turns inbound notifications into expenses and bill updates.
pub struct IngestService {
    pool: DbPool,
    pipeline: ExtractionPipeline,
    matcher: BillMatcher,
    locks: Arc<UserLocks>,
}

impl IngestService {
    pub fn new(
        pool: DbPool,
        pipeline: ExtractionPipeline,
        matcher: BillMatcher,
        locks: Arc<UserLocks>,
    ) -> Self {
        Self {
            pool,
            pipeline,
            matcher,
            locks,
        }
    }

    pub async fn ingest(&self, input: NewNotification) -> Result<IngestOutcome, ServiceError> {
        self.ingest_at(input, Local::now().naive_local()).await
    }

    /// `now` stands in for a missing or unparseable receive time.
    pub async fn ingest_at(
        &self,
        input: NewNotification,
        now: NaiveDateTime,
    ) -> Result<IngestOutcome, ServiceError> {
        let n = validate(input)?;
        let received_at = guard::parse_received_at(n.received_at.as_deref(), now);

        let user = {
            let mut conn = self.pool.acquire().await?;
            resolve_user(&mut conn, n.channel, &n.sender).await?
        }
        .ok_or_else(|| ServiceError::UnknownSender(n.sender.clone()))?;

        let _guard = self.locks.lock(user.id).await;

        let existing = {
            let mut conn = self.pool.acquire().await?;
            guard::find_duplicate(
                &mut conn,
                user.id,
                n.channel,
                &n.message_id,
                &n.sender,
                n.subject.as_deref(),
                received_at,
            )
            .await?
        };
        if let Some(notification) = existing {
            info!(message_id = %n.message_id, existing_id = %notification.id, "Duplicate notification ignored");
            return Ok(IngestOutcome::Duplicate { notification });
        }

        // Extraction may call out over the network: no connection is held.
        let candidate = self
            .pipeline
            .extract_parts(&n.sender, n.subject.as_deref(), &n.body)
            .await;

        let mut tx = self.pool.begin().await?;

        let notification = insert_notification(
            &mut tx,
            &NotificationInsert {
                user_id: user.id,
                channel: n.channel,
                fingerprint: guard::fingerprint(&n.sender, n.subject.as_deref(), received_at),
                message_id: n.message_id,
                sender: n.sender,
                subject: n.subject,
                body: n.body,
                received_at,
            },
        )
        .await?;

        let Some(candidate) = candidate else {
            tx.commit().await?;
            warn!(notification_id = %notification.id, "Notification stored without an expense");
            return Ok(IngestOutcome::Recorded {
                notification,
                expense: None,
                matched_bill: None,
                inferred_bill: None,
            });
        };

        let mut new_expense = ExtractionPipeline::to_new_expense(&notification, candidate);
        let bills = get_bills_for_user(&mut tx, user.id).await?;

        let mut matched_bill = None;
        let mut inferred_bill = None;
        if let Some(hit) = self.matcher.find_match(&new_expense, &bills) {
            let mut bill = hit.clone();
            pay_by_match(&mut bill);
            update_bill_state(&mut tx, &bill).await?;
            new_expense.link_to_bill(bill.id, bill.category);
            info!(bill_id = %bill.id, merchant = %bill.merchant, next_due = %bill.due_at, "Bill paid via transaction match");
            matched_bill = Some(bill);
        } else if let Some(proposal) = infer_bill(&new_expense, &notification.full_text(), &bills) {
            let bill = insert_bill(&mut tx, &proposal).await?;
            info!(bill_id = %bill.id, merchant = %bill.merchant, "Recurring bill inferred from notification");
            inferred_bill = Some(bill);
        }

        let expense = insert_expense(&mut tx, &new_expense).await?;
        tx.commit().await?;

        info!(
            expense_id = %expense.id,
            amount = %expense.amount,
            merchant = %expense.merchant,
            source = %expense.source,
            "Expense recorded"
        );

        Ok(IngestOutcome::Recorded {
            notification,
            expense: Some(expense),
            matched_bill,
            inferred_bill,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(channel: Channel, sender: &str, body: &str) -> NewNotification {
        NewNotification {
            channel,
            message_id: "m-1".into(),
            sender: sender.into(),
            subject: None,
            body: body.into(),
            received_at: None,
        }
    }

    #[test]
    fn sms_sender_must_be_a_phone_number() {
        assert!(validate(input(Channel::Sms, "+919800000001", "hi")).is_ok());
        assert!(validate(input(Channel::Sms, "9800000001", "hi")).is_ok());
        assert!(validate(input(Channel::Sms, "VM-HDFCBK", "hi")).is_err());
        assert!(validate(input(Channel::Sms, "+12345", "hi")).is_err());
    }

    #[test]
    fn body_limits_depend_on_channel() {
        let long = "a".repeat(MAX_SMS_BODY_CHARS + 1);
        assert!(validate(input(Channel::Sms, "+919800000001", &long)).is_err());
        assert!(validate(input(Channel::Email, "a@example.com", &long)).is_ok());
        let huge = "a".repeat(MAX_EMAIL_BODY_CHARS + 1);
        assert!(validate(input(Channel::Email, "a@example.com", &huge)).is_err());
    }

    #[test]
    fn empty_fields_are_rejected() {
        assert!(validate(input(Channel::Email, "a@example.com", "  ")).is_err());
        let mut no_id = input(Channel::Email, "a@example.com", "body");
        no_id.message_id = " ".into();
        assert!(matches!(validate(no_id), Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn sms_html_is_stripped_and_blank_subject_dropped() {
        let mut n = input(Channel::Sms, "+919800000001", "<b>INR 10</b> spent");
        n.subject = Some("   ".into());
        let accepted = validate(n).unwrap();
        assert_eq!(accepted.body, "INR 10 spent");
        assert_eq!(accepted.subject, None);
    }
}
