use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i64,
}

impl BookingItem {
    pub fn subtotal(&self) -> i64 {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub items: Vec<BookingItem>,
    pub total_quantity: i64,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub insurance_premium: i64,
    pub final_amount: i64,
    pub status: BookingStatus,
    pub address_id: Option<String>,
    pub request_note: Option<String>,
    pub user_coupon_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    PickedUp,
    Sharpening,
    Shipping,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::PickedUp,
        BookingStatus::Sharpening,
        BookingStatus::Shipping,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::PickedUp => "picked_up",
            BookingStatus::Sharpening => "sharpening",
            BookingStatus::Shipping => "shipping",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Forward-only progression; cancellation is possible until pickup.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, PickedUp)
                | (Confirmed, Cancelled)
                | (PickedUp, Sharpening)
                | (Sharpening, Shipping)
                | (Shipping, Completed)
        )
    }

    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(BookingStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_status() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("unknown"), None);
    }

    #[test]
    fn progression_is_forward_only() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Shipping.can_transition_to(BookingStatus::Completed));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Shipping));
    }

    #[test]
    fn cancellation_only_before_pickup() {
        assert!(BookingStatus::Pending.is_cancellable());
        assert!(BookingStatus::Confirmed.is_cancellable());
        assert!(!BookingStatus::PickedUp.is_cancellable());
        assert!(!BookingStatus::Cancelled.is_cancellable());
    }
}
