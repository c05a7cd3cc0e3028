use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(BillingCycle::Monthly),
            "yearly" => Some(BillingCycle::Yearly),
            _ => None,
        }
    }

    /// Last day (inclusive) of a period starting on `start`.
    pub fn period_end(&self, start: NaiveDate) -> NaiveDate {
        let months = match self {
            BillingCycle::Monthly => Months::new(1),
            BillingCycle::Yearly => Months::new(12),
        };
        start
            .checked_add_months(months)
            .and_then(|d| d.pred_opt())
            .unwrap_or(start)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub billing_cycle: BillingCycle,
    pub usage_limit: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancelled" => SubscriptionStatus::Cancelled,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: String,
    pub user_id: String,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub usage_count: i64,
}

impl UserSubscription {
    pub fn remaining_usage(&self) -> i64 {
        (self.plan.usage_limit - self.usage_count).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn monthly_period_ends_day_before_next_month() {
        assert_eq!(BillingCycle::Monthly.period_end(date("2025-06-15")), date("2025-07-14"));
        assert_eq!(BillingCycle::Monthly.period_end(date("2025-01-31")), date("2025-02-27"));
    }

    #[test]
    fn yearly_period_spans_twelve_months() {
        assert_eq!(BillingCycle::Yearly.period_end(date("2025-03-01")), date("2026-02-28"));
    }
}
