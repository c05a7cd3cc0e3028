use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Fixed,
    Percentage,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Fixed => "fixed",
            DiscountType::Percentage => "percentage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(DiscountType::Fixed),
            "percentage" => Some(DiscountType::Percentage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: i64,
    pub max_discount_amount: Option<i64>,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub is_active: bool,
}

impl Coupon {
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.valid_from <= date && date <= self.valid_until
    }

    /// Codes can be registered ahead of the usage window, not after it.
    pub fn is_registrable_on(&self, date: NaiveDate) -> bool {
        self.is_active && date <= self.valid_until
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCoupon {
    pub id: String,
    pub user_id: String,
    pub coupon: Coupon,
    pub is_used: bool,
    pub used_at: Option<NaiveDateTime>,
    pub booking_id: Option<String>,
    pub issued_at: NaiveDateTime,
}

impl UserCoupon {
    pub fn is_usable_on(&self, date: NaiveDate) -> bool {
        !self.is_used && self.coupon.is_valid_on(date)
    }
}
