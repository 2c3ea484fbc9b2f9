pub mod bills;
pub mod db;
pub mod expenses;
pub mod notifications;
pub mod users;

pub use bills::{get_bill, get_bills_for_user, insert_bill, update_bill_state};
pub use db::{create_db, DbPool};
pub use expenses::{
    find_expenses_for_bill, get_expense, get_expenses_for_user, get_expenses_since,
    insert_expense, update_expense_link,
};
pub use notifications::{
    count_notifications, find_notification_by_fingerprint, find_notification_by_message_id,
    insert_notification, NotificationInsert,
};
pub use users::{find_user_by_email, find_user_by_mobile, get_user, insert_user};
