use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;

pub const REVENUE_MONTHS: usize = 6;

#[derive(Debug, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub revenue: i64,
    pub bookings: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_bookings: i64,
    pub today_bookings: i64,
    pub pending_bank_transfers: i64,
    pub total_revenue: i64,
    pub bookings_by_status: BTreeMap<String, i64>,
    pub monthly: Vec<MonthlyPoint>,
}

pub fn build(conn: &Connection, today: NaiveDate) -> Result<DashboardStats, AppError> {
    // Every status is reported, zero when absent.
    let mut bookings_by_status: BTreeMap<String, i64> = BookingStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for (status, count) in queries::count_bookings_by_status(conn)? {
        bookings_by_status.insert(status, count);
    }

    let monthly = queries::get_monthly_revenue(conn, today, REVENUE_MONTHS)?
        .into_iter()
        .map(|m| MonthlyPoint {
            month: m.month,
            revenue: m.revenue,
            bookings: m.bookings,
        })
        .collect();

    Ok(DashboardStats {
        total_users: queries::count_users(conn)?,
        total_bookings: queries::count_bookings(conn)?,
        today_bookings: queries::count_bookings_on(conn, &today)?,
        pending_bank_transfers: queries::count_pending_bank_transfers(conn)?,
        total_revenue: queries::total_paid_revenue(conn)?,
        bookings_by_status,
        monthly,
    })
}
