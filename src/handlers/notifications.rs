use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::{ok, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::Notification;
use crate::services::{auth, notification};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

// GET /api/notifications
#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Notification>> {
    let user = auth::require_user(&state, &headers)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let db = state.conn()?;
    ok(queries::list_notifications(&db, &user.id, limit)?)
}

// GET /api/notifications/unread-count
#[derive(Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<UnreadCount> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    ok(UnreadCount {
        count: queries::count_unread_notifications(&db, &user.id)?,
    })
}

// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    notification::mark_read(&db, &user.id, &id)?;
    ok(())
}

// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<UnreadCount> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    queries::mark_all_notifications_read(&db, &user.id)?;
    ok(UnreadCount { count: 0 })
}

// GET /api/notifications/events (SSE)
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource sends the session cookie along with the request.
    let user = auth::require_user(&state, &headers)?;
    let user_id = user.id;

    let rx = state.notifications_tx.subscribe();
    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification) if notification.user_id == user_id => {
            let data = serde_json::to_string(&notification).unwrap_or_default();
            Some(Ok::<_, Infallible>(Event::default().data(data).event("notification")))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "notification stream lagged");
            None
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok::<_, Infallible>(Event::default().comment("keepalive")),
    );

    Ok(Sse::new(StreamExt::merge(live_stream, keepalive_stream)))
}
