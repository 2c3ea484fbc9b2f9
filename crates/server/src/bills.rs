use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tally_core::{Bill, BillId, Expense};
use tally_reconcile::{auto_pay_expense, ensure_payable, link_window, pay_by_user};
use tally_storage::{
    find_expenses_for_bill, get_bill, insert_expense, update_bill_state, update_expense_link,
    DbPool,
};
use tracing::info;

use crate::error::ServiceError;
use crate::locks::UserLocks;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidBill {
    pub bill: Bill,
    /// The expense recorded for this payment: an existing one that was
    /// linked, or a newly generated one.
    pub expense: Expense,
    pub created_expense: bool,
}

pub struct BillService {
    pool: DbPool,
    locks: Arc<UserLocks>,
}

impl BillService {
    pub fn new(pool: DbPool, locks: Arc<UserLocks>) -> Self {
        Self { pool, locks }
    }

    pub async fn mark_paid_now(&self, bill_id: BillId) -> Result<PaidBill, ServiceError> {
        self.mark_paid(bill_id, Local::now().naive_local()).await
    }

    /// User-initiated payment. Allowed from the due date on; records or links
    /// the matching expense, stamps `last_paid_at` and advances the bill, all
    /// in one transaction.
    pub async fn mark_paid(
        &self,
        bill_id: BillId,
        now: NaiveDateTime,
    ) -> Result<PaidBill, ServiceError> {
        let owner = {
            let mut conn = self.pool.acquire().await?;
            get_bill(&mut conn, bill_id).await?
        }
        .ok_or(ServiceError::BillNotFound(bill_id))?
        .user_id;

        let _guard = self.locks.lock(owner).await;
        let mut tx = self.pool.begin().await?;

        // Re-read under the lock: a concurrent notification may have advanced it.
        let mut bill = get_bill(&mut tx, bill_id)
            .await?
            .ok_or(ServiceError::BillNotFound(bill_id))?;
        ensure_payable(&bill, now)?;

        let (start, end) = link_window(&bill);
        let existing =
            find_expenses_for_bill(&mut tx, bill.user_id, &bill.merchant, bill.amount, start, end)
                .await?
                .into_iter()
                .next();

        let (expense, created_expense) = match existing {
            Some(mut expense) => {
                if expense.link_to_bill(bill.id, bill.category) {
                    update_expense_link(&mut tx, &expense).await?;
                }
                (expense, false)
            }
            None => {
                let expense = insert_expense(&mut tx, &auto_pay_expense(&bill, now)).await?;
                (expense, true)
            }
        };

        pay_by_user(&mut bill, now)?;
        update_bill_state(&mut tx, &bill).await?;
        tx.commit().await?;

        info!(
            bill_id = %bill.id,
            expense_id = %expense.id,
            created_expense,
            next_due = %bill.due_at,
            "Bill marked as paid"
        );

        Ok(PaidBill {
            bill,
            expense,
            created_expense,
        })
    }
}
