use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{in_transaction, ok, ApiResult};
use crate::models::{NotificationKind, UserSubscription};
use crate::services::format::format_date;
use crate::services::{auth, notification, subscription, today};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SubscriptionView {
    pub subscription: Option<UserSubscription>,
    pub remaining_usage: i64,
}

// GET /api/subscriptions/me
pub async fn my_subscription(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<SubscriptionView> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    let subscription = subscription::current(&db, &user.id, today())?;
    ok(SubscriptionView {
        remaining_usage: subscription.as_ref().map_or(0, UserSubscription::remaining_usage),
        subscription,
    })
}

// POST /api/subscriptions
#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: String,
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SubscribeRequest>,
) -> ApiResult<UserSubscription> {
    let user = auth::require_user(&state, &headers)?;
    let subscription = in_transaction(&state, |conn, outbox| {
        let subscription = subscription::subscribe(conn, &user.id, &body.plan_id, today())?;
        outbox.push(notification::create(
            conn,
            &user.id,
            NotificationKind::Subscription,
            "구독 시작",
            &format!(
                "{} 구독이 시작되었습니다. ({}까지)",
                subscription.plan.name,
                format_date(&subscription.period_end)
            ),
        )?);
        Ok(subscription)
    })?;
    ok(subscription)
}

// POST /api/subscriptions/me/cancel
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<UserSubscription> {
    let user = auth::require_user(&state, &headers)?;
    let subscription = in_transaction(&state, |conn, outbox| {
        let subscription = subscription::cancel(conn, &user.id, today())?;
        outbox.push(notification::create(
            conn,
            &user.id,
            NotificationKind::Subscription,
            "구독 해지",
            &format!("{} 구독이 해지되었습니다.", subscription.plan.name),
        )?);
        Ok(subscription)
    })?;
    ok(subscription)
}
