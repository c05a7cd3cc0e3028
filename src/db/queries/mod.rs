//! Plain query functions over a borrowed `Connection`.
//!
//! Every function also accepts a `rusqlite::Transaction` through deref, which is
//! how multi-step writes (the order wizard, cancellations) stay atomic.

mod admins;
mod bookings;
mod catalog;
mod coupons;
mod dashboard;
mod notifications;
mod payments;
mod subscriptions;
mod terms;
mod users;

pub use admins::*;
pub use bookings::*;
pub use catalog::*;
pub use coupons::*;
pub use dashboard::*;
pub use notifications::*;
pub use payments::*;
pub use subscriptions::*;
pub use terms::*;
pub use users::*;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;

use super::{DATE_FORMAT, TIMESTAMP_FORMAT};

fn invalid_column(idx: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("invalid {what}: {value}").into(),
    )
}

fn timestamp_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|_| invalid_column(idx, "timestamp", &raw))
}

fn opt_timestamp_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
            .map_err(|_| invalid_column(idx, "timestamp", &s))
    })
    .transpose()
}

fn date_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|_| invalid_column(idx, "date", &raw))
}

fn opt_date_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|_| invalid_column(idx, "date", &s)))
        .transpose()
}

fn bool_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<bool> {
    Ok(row.get::<_, i64>(idx)? != 0)
}

fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn fmt_opt_date(date: &Option<NaiveDate>) -> Option<String> {
    date.as_ref().map(fmt_date)
}
