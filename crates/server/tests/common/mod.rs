#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tally_core::{Bill, Category, Channel, Frequency, Money, NewBill, NewNotification, User};
use tally_extract::{Categorizer, ExtractionBackend, ExtractionPipeline};
use tally_server::{state_with_pipeline, AppState, Config};
use tally_storage::{create_db, insert_bill, insert_user, DbPool};
use tempfile::TempDir;

pub struct TestEnv {
    // Keeps the database file alive for the duration of the test.
    _dir: TempDir,
    pub pool: DbPool,
    pub state: AppState,
    pub user: User,
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub async fn env_with(pipeline: ExtractionPipeline) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_db(&dir.path().join("tally.db")).await.unwrap();
    let user = {
        let mut conn = pool.acquire().await.unwrap();
        insert_user(&mut conn, "asha@example.com", Some("+919800000001"), Some("Asha"))
            .await
            .unwrap()
    };
    let state = state_with_pipeline(&Config::default(), pool.clone(), pipeline);
    TestEnv {
        _dir: dir,
        pool,
        state,
        user,
    }
}

pub async fn regex_env() -> TestEnv {
    env_with(ExtractionPipeline::regex_only(Categorizer::default())).await
}

pub async fn backend_env(backend: Arc<dyn ExtractionBackend>) -> TestEnv {
    env_with(ExtractionPipeline::new(backend, Categorizer::default())).await
}

impl TestEnv {
    pub async fn add_bill(&self, merchant: &str, amount: i64, due_at: NaiveDateTime) -> Bill {
        let mut conn = self.pool.acquire().await.unwrap();
        insert_bill(
            &mut conn,
            &NewBill {
                user_id: self.user.id,
                merchant: merchant.into(),
                category: Category::Entertainment,
                note: format!("{merchant} plan"),
                amount: Money::from_major(amount),
                due_at,
                frequency: Frequency::Monthly,
            },
        )
        .await
        .unwrap()
    }
}

pub fn email(message_id: &str, subject: &str, body: &str, received_at: &str) -> NewNotification {
    NewNotification {
        channel: Channel::Email,
        message_id: message_id.into(),
        sender: "asha@example.com".into(),
        subject: Some(subject.into()),
        body: body.into(),
        received_at: Some(received_at.into()),
    }
}

pub fn sms(message_id: &str, body: &str, received_at: &str) -> NewNotification {
    NewNotification {
        channel: Channel::Sms,
        message_id: message_id.into(),
        sender: "+919800000001".into(),
        subject: None,
        body: body.into(),
        received_at: Some(received_at.into()),
    }
}
