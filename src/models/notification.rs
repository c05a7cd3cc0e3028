use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Booking,
    Payment,
    Coupon,
    Subscription,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Booking => "booking",
            NotificationKind::Payment => "payment",
            NotificationKind::Coupon => "coupon",
            NotificationKind::Subscription => "subscription",
            NotificationKind::System => "system",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "booking" => NotificationKind::Booking,
            "payment" => NotificationKind::Payment,
            "coupon" => NotificationKind::Coupon,
            "subscription" => NotificationKind::Subscription,
            _ => NotificationKind::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}
