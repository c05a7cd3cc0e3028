pub mod address;
pub mod admin;
pub mod auth;
pub mod booking;
pub mod coupon;
pub mod dashboard;
pub mod format;
pub mod insurance;
pub mod notification;
pub mod order;
pub mod payment;
pub mod sms;
pub mod subscription;
pub mod terms;

use chrono::{Duration, NaiveDate, Utc};

/// Business dates follow Korea Standard Time (UTC+9, no DST).
pub fn today() -> NaiveDate {
    (Utc::now() + Duration::hours(9)).date_naive()
}
