use rusqlite::{params, Connection, OptionalExtension};

use super::{bool_at, date_at, fmt_date, invalid_column};
use crate::db::now_timestamp;
use crate::models::{BillingCycle, SubscriptionPlan, SubscriptionStatus, UserSubscription};

// ── Plans ──

const PLAN_COLUMNS: &str =
    "p.id, p.name, p.description, p.price, p.billing_cycle, p.usage_limit, p.is_active";

fn parse_plan_at(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<SubscriptionPlan> {
    let cycle_str: String = row.get(offset + 4)?;
    Ok(SubscriptionPlan {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        price: row.get(offset + 3)?,
        billing_cycle: BillingCycle::parse(&cycle_str)
            .ok_or_else(|| invalid_column(offset + 4, "billing cycle", &cycle_str))?,
        usage_limit: row.get(offset + 5)?,
        is_active: bool_at(row, offset + 6)?,
    })
}

pub fn list_plans(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<SubscriptionPlan>> {
    let filter = if active_only { "WHERE p.is_active = 1" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAN_COLUMNS} FROM subscription_plans p {filter} ORDER BY p.price ASC"
    ))?;
    let rows = stmt.query_map([], |row| parse_plan_at(row, 0))?;

    let mut plans = vec![];
    for row in rows {
        plans.push(row?);
    }
    Ok(plans)
}

pub fn get_plan(conn: &Connection, id: &str) -> anyhow::Result<Option<SubscriptionPlan>> {
    let plan = conn
        .query_row(
            &format!("SELECT {PLAN_COLUMNS} FROM subscription_plans p WHERE p.id = ?1"),
            params![id],
            |row| parse_plan_at(row, 0),
        )
        .optional()?;
    Ok(plan)
}

pub fn insert_plan(conn: &Connection, plan: &SubscriptionPlan) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO subscription_plans (id, name, description, price, billing_cycle, usage_limit, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            plan.id,
            plan.name,
            plan.description,
            plan.price,
            plan.billing_cycle.as_str(),
            plan.usage_limit,
            plan.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn update_plan(conn: &Connection, plan: &SubscriptionPlan) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE subscription_plans SET
           name = ?1, description = ?2, price = ?3, billing_cycle = ?4, usage_limit = ?5, is_active = ?6
         WHERE id = ?7",
        params![
            plan.name,
            plan.description,
            plan.price,
            plan.billing_cycle.as_str(),
            plan.usage_limit,
            plan.is_active as i32,
            plan.id,
        ],
    )?;
    Ok(count > 0)
}

// ── User Subscriptions ──

const SUBSCRIPTION_COLUMNS: &str =
    "s.id, s.user_id, s.status, s.period_start, s.period_end, s.usage_count";

fn parse_subscription_row(row: &rusqlite::Row) -> rusqlite::Result<UserSubscription> {
    let status_str: String = row.get(2)?;
    Ok(UserSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        status: SubscriptionStatus::parse(&status_str),
        period_start: date_at(row, 3)?,
        period_end: date_at(row, 4)?,
        usage_count: row.get(5)?,
        plan: parse_plan_at(row, 6)?,
    })
}

pub fn get_active_subscription(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Option<UserSubscription>> {
    let subscription = conn
        .query_row(
            &format!(
                "SELECT {SUBSCRIPTION_COLUMNS}, {PLAN_COLUMNS}
                 FROM user_subscriptions s JOIN subscription_plans p ON p.id = s.plan_id
                 WHERE s.user_id = ?1 AND s.status = 'active'
                 ORDER BY s.created_at DESC LIMIT 1"
            ),
            params![user_id],
            parse_subscription_row,
        )
        .optional()?;
    Ok(subscription)
}

pub fn insert_subscription(conn: &Connection, subscription: &UserSubscription) -> anyhow::Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO user_subscriptions (id, user_id, plan_id, status, period_start, period_end, usage_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            subscription.id,
            subscription.user_id,
            subscription.plan.id,
            subscription.status.as_str(),
            fmt_date(&subscription.period_start),
            fmt_date(&subscription.period_end),
            subscription.usage_count,
            now,
        ],
    )?;
    Ok(())
}

pub fn update_subscription_status(
    conn: &Connection,
    id: &str,
    status: SubscriptionStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE user_subscriptions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

/// Adds `delta` (negative to give usage back) without going below zero.
pub fn adjust_subscription_usage(conn: &Connection, id: &str, delta: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE user_subscriptions SET usage_count = MAX(usage_count + ?1, 0), updated_at = ?2 WHERE id = ?3",
        params![delta, now_timestamp(), id],
    )?;
    Ok(count > 0)
}
