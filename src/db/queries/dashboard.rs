use chrono::{Datelike, Months, NaiveDate};
use rusqlite::{params, Connection};

use super::fmt_date;

pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: i64,
    pub bookings: i64,
}

pub fn count_bookings_by_status(conn: &Connection) -> anyhow::Result<Vec<(String, i64)>> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status ORDER BY status ASC")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut counts = vec![];
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

pub fn count_bookings_on(conn: &Connection, date: &NaiveDate) -> anyhow::Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE booking_date = ?1 AND status != 'cancelled'",
        params![fmt_date(date)],
        |row| row.get(0),
    )?)
}

/// Paid revenue and booking counts for the `months` months ending at `today`'s month, oldest first.
pub fn get_monthly_revenue(
    conn: &Connection,
    today: NaiveDate,
    months: usize,
) -> anyhow::Result<Vec<MonthlyRevenue>> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    let mut result = Vec::with_capacity(months);

    for i in 0..months {
        let date = first_of_month
            .checked_sub_months(Months::new(i as u32))
            .unwrap_or(first_of_month);
        let month = date.format("%Y-%m").to_string();

        let revenue: i64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM payments
             WHERE status = 'paid' AND substr(COALESCE(paid_at, created_at), 1, 7) = ?1",
            params![month],
            |row| row.get(0),
        )?;
        let bookings: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE substr(created_at, 1, 7) = ?1 AND status != 'cancelled'",
            params![month],
            |row| row.get(0),
        )?;

        result.push(MonthlyRevenue {
            month,
            revenue,
            bookings,
        });
    }

    // Return oldest first
    result.reverse();
    Ok(result)
}
