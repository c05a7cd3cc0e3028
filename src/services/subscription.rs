use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::{new_id, queries};
use crate::errors::AppError;
use crate::models::{BillingCycle, SubscriptionPlan, SubscriptionStatus, UserSubscription};

/// The user's active subscription. One whose period has ended is expired on the way.
pub fn current(
    conn: &Connection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<UserSubscription>, AppError> {
    let Some(subscription) = queries::get_active_subscription(conn, user_id)? else {
        return Ok(None);
    };

    if subscription.period_end < today {
        queries::update_subscription_status(conn, &subscription.id, SubscriptionStatus::Expired)?;
        tracing::info!(subscription_id = %subscription.id, "subscription expired");
        return Ok(None);
    }

    Ok(Some(subscription))
}

pub fn subscribe(
    conn: &Connection,
    user_id: &str,
    plan_id: &str,
    today: NaiveDate,
) -> Result<UserSubscription, AppError> {
    let plan = queries::get_plan(conn, plan_id)?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::not_found("구독 상품을 찾을 수 없습니다"))?;

    if current(conn, user_id, today)?.is_some() {
        return Err(AppError::conflict("이미 이용 중인 구독이 있습니다"));
    }

    let subscription = UserSubscription {
        id: new_id(),
        user_id: user_id.to_string(),
        period_start: today,
        period_end: plan.billing_cycle.period_end(today),
        plan,
        status: SubscriptionStatus::Active,
        usage_count: 0,
    };
    queries::insert_subscription(conn, &subscription)?;
    Ok(subscription)
}

pub fn cancel(conn: &Connection, user_id: &str, today: NaiveDate) -> Result<UserSubscription, AppError> {
    let mut subscription = current(conn, user_id, today)?
        .ok_or_else(|| AppError::not_found("이용 중인 구독이 없습니다"))?;
    queries::update_subscription_status(conn, &subscription.id, SubscriptionStatus::Cancelled)?;
    subscription.status = SubscriptionStatus::Cancelled;
    Ok(subscription)
}

/// Deducts `quantity` knives from the active subscription.
pub fn consume(
    conn: &Connection,
    user_id: &str,
    quantity: i64,
    today: NaiveDate,
) -> Result<UserSubscription, AppError> {
    let mut subscription = current(conn, user_id, today)?
        .ok_or_else(|| AppError::validation("이용 중인 구독이 없습니다"))?;

    if subscription.remaining_usage() < quantity {
        return Err(AppError::validation(format!(
            "구독 잔여 횟수가 부족합니다 (남은 횟수: {})",
            subscription.remaining_usage()
        )));
    }

    queries::adjust_subscription_usage(conn, &subscription.id, quantity)?;
    subscription.usage_count += quantity;
    Ok(subscription)
}

/// Returns usage taken by a cancelled booking. A subscription that has since ended gets nothing back.
pub fn give_back(conn: &Connection, user_id: &str, quantity: i64) -> Result<(), AppError> {
    if let Some(subscription) = queries::get_active_subscription(conn, user_id)? {
        queries::adjust_subscription_usage(conn, &subscription.id, -quantity)?;
    }
    Ok(())
}

// ── Admin ──

#[derive(Debug, Deserialize)]
pub struct PlanInput {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub billing_cycle: BillingCycle,
    pub usage_limit: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl PlanInput {
    fn into_plan(self, id: String) -> Result<SubscriptionPlan, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("상품 이름을 입력해주세요"));
        }
        if self.price < 0 {
            return Err(AppError::validation("가격은 0 이상이어야 합니다"));
        }
        if self.usage_limit < 1 {
            return Err(AppError::validation("이용 횟수는 1 이상이어야 합니다"));
        }
        Ok(SubscriptionPlan {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price,
            billing_cycle: self.billing_cycle,
            usage_limit: self.usage_limit,
            is_active: self.is_active,
        })
    }
}

pub fn create_plan(conn: &Connection, input: PlanInput) -> Result<SubscriptionPlan, AppError> {
    let plan = input.into_plan(new_id())?;
    queries::insert_plan(conn, &plan)?;
    Ok(plan)
}

pub fn update_plan(conn: &Connection, id: &str, input: PlanInput) -> Result<SubscriptionPlan, AppError> {
    let plan = input.into_plan(id.to_string())?;
    if !queries::update_plan(conn, &plan)? {
        return Err(AppError::not_found("구독 상품을 찾을 수 없습니다"));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup() -> (Connection, String, SubscriptionPlan) {
        let conn = db::init_db(":memory:").unwrap();
        let (user, _) = queries::find_or_create_user(&conn, "01012345678").unwrap();
        let plan = create_plan(
            &conn,
            PlanInput {
                name: "월간 4회".to_string(),
                description: None,
                price: 19900,
                billing_cycle: BillingCycle::Monthly,
                usage_limit: 4,
                is_active: true,
            },
        )
        .unwrap();
        (conn, user.id, plan)
    }

    #[test]
    fn subscribe_sets_period_and_refuses_second() {
        let (conn, user_id, plan) = setup();
        let sub = subscribe(&conn, &user_id, &plan.id, day("2025-06-15")).unwrap();
        assert_eq!(sub.period_end, day("2025-07-14"));
        assert_eq!(sub.remaining_usage(), 4);

        let again = subscribe(&conn, &user_id, &plan.id, day("2025-06-20"));
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[test]
    fn ended_subscription_expires_on_lookup() {
        let (conn, user_id, plan) = setup();
        subscribe(&conn, &user_id, &plan.id, day("2025-06-15")).unwrap();

        assert!(current(&conn, &user_id, day("2025-07-14")).unwrap().is_some());
        assert!(current(&conn, &user_id, day("2025-07-15")).unwrap().is_none());
        assert!(queries::get_active_subscription(&conn, &user_id).unwrap().is_none());
    }

    #[test]
    fn consume_respects_remaining_usage() {
        let (conn, user_id, plan) = setup();
        subscribe(&conn, &user_id, &plan.id, day("2025-06-15")).unwrap();

        let sub = consume(&conn, &user_id, 3, day("2025-06-16")).unwrap();
        assert_eq!(sub.remaining_usage(), 1);
        assert!(matches!(consume(&conn, &user_id, 2, day("2025-06-16")), Err(AppError::Validation(_))));

        give_back(&conn, &user_id, 3).unwrap();
        let sub = current(&conn, &user_id, day("2025-06-17")).unwrap().unwrap();
        assert_eq!(sub.usage_count, 0);
    }

    #[test]
    fn cancel_ends_subscription() {
        let (conn, user_id, plan) = setup();
        subscribe(&conn, &user_id, &plan.id, day("2025-06-15")).unwrap();
        let cancelled = cancel(&conn, &user_id, day("2025-06-16")).unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(matches!(cancel(&conn, &user_id, day("2025-06-16")), Err(AppError::NotFound(_))));
    }
}
