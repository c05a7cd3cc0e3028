use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::{new_id, queries, DATE_FORMAT};
use crate::errors::AppError;
use crate::models::{
    Booking, BookingItem, BookingStatus, InsurancePolicy, Notification, NotificationKind,
    PaymentStatus,
};
use crate::services::format::{booking_status_label, format_date_with_weekday, format_time_label};
use crate::services::insurance::{self, InsuranceRequest};
use crate::services::{coupon, notification, payment};

pub const MAX_ITEM_QUANTITY: i64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct NewBookingItem {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub booking_date: String,
    pub booking_time: String,
    pub items: Vec<NewBookingItem>,
    pub address_id: Option<String>,
    pub request_note: Option<String>,
    pub user_coupon_id: Option<String>,
    pub insurance: Option<InsuranceRequest>,
}

fn parse_schedule(req: &NewBooking, today: NaiveDate) -> Result<(NaiveDate, String), AppError> {
    let date = NaiveDate::parse_from_str(req.booking_date.trim(), DATE_FORMAT)
        .map_err(|_| AppError::validation("예약 날짜 형식이 올바르지 않습니다 (YYYY-MM-DD)"))?;
    if date < today {
        return Err(AppError::validation("지난 날짜는 예약할 수 없습니다"));
    }

    let time = NaiveTime::parse_from_str(req.booking_time.trim(), "%H:%M")
        .map_err(|_| AppError::validation("예약 시간 형식이 올바르지 않습니다 (HH:MM)"))?;
    Ok((date, time.format("%H:%M").to_string()))
}

/// Prices each line from the catalog; client-sent prices are never trusted.
fn price_items(conn: &Connection, items: &[NewBookingItem]) -> Result<Vec<BookingItem>, AppError> {
    if items.is_empty() {
        return Err(AppError::validation("서비스를 하나 이상 선택해주세요"));
    }

    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        if !(1..=MAX_ITEM_QUANTITY).contains(&item.quantity) {
            return Err(AppError::validation(format!(
                "수량은 1~{MAX_ITEM_QUANTITY}개 사이여야 합니다"
            )));
        }
        let product = queries::get_product(conn, &item.product_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::not_found("선택한 서비스를 찾을 수 없습니다"))?;
        priced.push(BookingItem {
            product_id: product.id,
            name: product.name,
            unit_price: product.discount_price,
            quantity: item.quantity,
        });
    }
    Ok(priced)
}

/// Creates a pending booking, redeeming the coupon and attaching insurance when requested.
pub fn create_booking(
    conn: &Connection,
    user_id: &str,
    req: &NewBooking,
    today: NaiveDate,
    outbox: &mut Vec<Notification>,
) -> Result<Booking, AppError> {
    let (booking_date, booking_time) = parse_schedule(req, today)?;
    let items = price_items(conn, &req.items)?;
    let total_amount: i64 = items.iter().map(BookingItem::subtotal).sum();
    let total_quantity: i64 = items.iter().map(|i| i.quantity).sum();

    if let Some(address_id) = &req.address_id {
        queries::get_address(conn, address_id)?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| AppError::not_found("배송지를 찾을 수 없습니다"))?;
    }

    let discount_amount = match &req.user_coupon_id {
        Some(id) => coupon::check_applicable(conn, user_id, id, total_amount, today)?.1,
        None => 0,
    };

    let premium = match &req.insurance {
        Some(ins) => Some(insurance::calculate_premium(ins.coverage_amount, total_quantity)?),
        None => None,
    };
    let insurance_premium = premium.as_ref().map_or(0, |q| q.premium);

    let now = chrono::Utc::now().naive_utc();
    let booking = Booking {
        id: new_id(),
        user_id: user_id.to_string(),
        booking_date,
        booking_time,
        items,
        total_quantity,
        total_amount,
        discount_amount,
        insurance_premium,
        final_amount: (total_amount - discount_amount).max(0) + insurance_premium,
        status: BookingStatus::Pending,
        address_id: req.address_id.clone(),
        request_note: req
            .request_note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        user_coupon_id: req.user_coupon_id.clone(),
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(conn, &booking)?;

    if let Some(id) = &booking.user_coupon_id {
        if !queries::mark_user_coupon_used(conn, id, &booking.id)? {
            return Err(AppError::conflict("이미 사용한 쿠폰입니다"));
        }
    }

    if let Some(quote) = premium {
        queries::insert_insurance_policy(
            conn,
            &InsurancePolicy {
                id: new_id(),
                user_id: user_id.to_string(),
                booking_id: booking.id.clone(),
                knife_count: quote.knife_count,
                coverage_amount: quote.coverage_amount,
                premium: quote.premium,
            },
        )?;
    }

    tracing::info!(
        booking_id = %booking.id,
        user_id,
        final_amount = booking.final_amount,
        "booking created"
    );

    outbox.push(notification::create(
        conn,
        user_id,
        NotificationKind::Booking,
        "예약 접수",
        &format!(
            "{} {} 예약이 접수되었습니다.",
            format_date_with_weekday(&booking.booking_date),
            format_time_label(&booking.booking_time)
        ),
    )?);

    Ok(booking)
}

pub fn get_for_user(conn: &Connection, user_id: &str, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking(conn, booking_id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| AppError::not_found("예약을 찾을 수 없습니다"))
}

/// Cancels a booking and unwinds everything attached to it: the payment is
/// cancelled or refunded, the coupon restored and subscription usage returned.
/// `user_id` restricts the cancellation to the booking's owner.
pub fn cancel_booking(
    conn: &Connection,
    booking_id: &str,
    user_id: Option<&str>,
    outbox: &mut Vec<Notification>,
) -> Result<Booking, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .filter(|b| user_id.map_or(true, |uid| b.user_id == uid))
        .ok_or_else(|| AppError::not_found("예약을 찾을 수 없습니다"))?;

    if !booking.status.is_cancellable() {
        return Err(AppError::conflict(format!(
            "{} 상태의 예약은 취소할 수 없습니다",
            booking_status_label(booking.status)
        )));
    }

    queries::update_booking_status(conn, &booking.id, BookingStatus::Cancelled)?;

    for p in queries::list_payments_for_booking(conn, &booking.id)? {
        match p.status {
            PaymentStatus::Pending => {
                payment::transition(conn, &p.id, PaymentStatus::Cancelled, None, outbox)?;
            }
            PaymentStatus::Paid => {
                payment::transition(conn, &p.id, PaymentStatus::Refunded, None, outbox)?;
            }
            _ => {}
        }
    }

    if let Some(id) = &booking.user_coupon_id {
        queries::restore_user_coupon(conn, id)?;
    }

    tracing::info!(booking_id = %booking.id, by_owner = user_id.is_some(), "booking cancelled");

    outbox.push(notification::create(
        conn,
        &booking.user_id,
        NotificationKind::Booking,
        "예약 취소",
        &format!(
            "{} 예약이 취소되었습니다.",
            format_date_with_weekday(&booking.booking_date)
        ),
    )?);

    queries::get_booking(conn, &booking.id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("booking {} vanished", booking.id)))
}

/// Back-office status change. Cancellation goes through [`cancel_booking`].
pub fn update_status(
    conn: &Connection,
    booking_id: &str,
    next: BookingStatus,
    outbox: &mut Vec<Notification>,
) -> Result<Booking, AppError> {
    if next == BookingStatus::Cancelled {
        return cancel_booking(conn, booking_id, None, outbox);
    }

    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::not_found("예약을 찾을 수 없습니다"))?;
    if !booking.status.can_transition_to(next) {
        return Err(AppError::conflict(format!(
            "{}에서 {}(으)로 변경할 수 없습니다",
            booking_status_label(booking.status),
            booking_status_label(next)
        )));
    }

    queries::update_booking_status(conn, &booking.id, next)?;
    outbox.push(notification::create(
        conn,
        &booking.user_id,
        NotificationKind::Booking,
        "예약 상태 변경",
        &format!("예약 상태가 '{}'(으)로 변경되었습니다.", booking_status_label(next)),
    )?);

    queries::get_booking(conn, &booking.id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("booking {} vanished", booking.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Coupon, DiscountType, Product};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct Fixture {
        conn: Connection,
        user_id: String,
        product_id: String,
    }

    fn setup() -> Fixture {
        let conn = db::init_db(":memory:").unwrap();
        let (user, _) = queries::find_or_create_user(&conn, "01012345678").unwrap();
        let product = Product {
            id: new_id(),
            name: "일반 칼 연마".to_string(),
            description: None,
            market_price: 15000,
            discount_price: 9900,
            image_url: None,
            is_active: true,
            sort_order: 0,
        };
        queries::insert_product(&conn, &product).unwrap();
        Fixture {
            conn,
            user_id: user.id,
            product_id: product.id,
        }
    }

    fn request(f: &Fixture, quantity: i64) -> NewBooking {
        NewBooking {
            booking_date: "2025-06-20".to_string(),
            booking_time: "14:00".to_string(),
            items: vec![NewBookingItem {
                product_id: f.product_id.clone(),
                quantity,
            }],
            address_id: None,
            request_note: Some("  ".to_string()),
            user_coupon_id: None,
            insurance: None,
        }
    }

    #[test]
    fn totals_come_from_catalog_prices() {
        let f = setup();
        let mut outbox = vec![];
        let booking = create_booking(&f.conn, &f.user_id, &request(&f, 3), day("2025-06-15"), &mut outbox).unwrap();
        assert_eq!(booking.total_amount, 29700);
        assert_eq!(booking.total_quantity, 3);
        assert_eq!(booking.final_amount, 29700);
        assert_eq!(booking.request_note, None);
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let f = setup();
        let today = day("2025-06-15");
        let mut outbox = vec![];

        let mut past = request(&f, 1);
        past.booking_date = "2025-06-14".to_string();
        assert!(matches!(create_booking(&f.conn, &f.user_id, &past, today, &mut outbox), Err(AppError::Validation(_))));

        let mut bad_time = request(&f, 1);
        bad_time.booking_time = "25:00".to_string();
        assert!(matches!(create_booking(&f.conn, &f.user_id, &bad_time, today, &mut outbox), Err(AppError::Validation(_))));

        assert!(matches!(create_booking(&f.conn, &f.user_id, &request(&f, 0), today, &mut outbox), Err(AppError::Validation(_))));
        assert!(matches!(create_booking(&f.conn, &f.user_id, &request(&f, 51), today, &mut outbox), Err(AppError::Validation(_))));

        let mut empty = request(&f, 1);
        empty.items.clear();
        assert!(matches!(create_booking(&f.conn, &f.user_id, &empty, today, &mut outbox), Err(AppError::Validation(_))));

        queries::deactivate_product(&f.conn, &f.product_id).unwrap();
        assert!(matches!(create_booking(&f.conn, &f.user_id, &request(&f, 1), today, &mut outbox), Err(AppError::NotFound(_))));
    }

    #[test]
    fn coupon_discount_excludes_insurance_premium() {
        let f = setup();
        let coupon = Coupon {
            id: new_id(),
            code: "TENOFF".to_string(),
            name: "10% 할인".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 10,
            min_order_amount: 0,
            max_discount_amount: None,
            valid_from: day("2025-01-01"),
            valid_until: day("2025-12-31"),
            is_active: true,
        };
        queries::insert_coupon(&f.conn, &coupon).unwrap();
        let user_coupon_id = queries::issue_user_coupon(&f.conn, &f.user_id, &coupon.id).unwrap();

        let mut req = request(&f, 2);
        req.user_coupon_id = Some(user_coupon_id.clone());
        req.insurance = Some(InsuranceRequest { coverage_amount: 30_000 });

        let mut outbox = vec![];
        let booking = create_booking(&f.conn, &f.user_id, &req, day("2025-06-15"), &mut outbox).unwrap();
        assert_eq!(booking.total_amount, 19800);
        assert_eq!(booking.discount_amount, 1980);
        assert_eq!(booking.insurance_premium, 1200);
        assert_eq!(booking.final_amount, 19800 - 1980 + 1200);

        let policy = queries::get_insurance_for_booking(&f.conn, &booking.id).unwrap().unwrap();
        assert_eq!(policy.knife_count, 2);

        let used = queries::get_user_coupon(&f.conn, &user_coupon_id).unwrap().unwrap();
        assert!(used.is_used);

        let reuse = create_booking(&f.conn, &f.user_id, &req, day("2025-06-15"), &mut outbox);
        assert!(matches!(reuse, Err(AppError::Conflict(_))));

        cancel_booking(&f.conn, &booking.id, Some(&f.user_id), &mut outbox).unwrap();
        let restored = queries::get_user_coupon(&f.conn, &user_coupon_id).unwrap().unwrap();
        assert!(!restored.is_used);
    }

    #[test]
    fn cancel_only_before_pickup_and_by_owner() {
        let f = setup();
        let mut outbox = vec![];
        let booking = create_booking(&f.conn, &f.user_id, &request(&f, 1), day("2025-06-15"), &mut outbox).unwrap();

        let stranger = cancel_booking(&f.conn, &booking.id, Some("someone-else"), &mut outbox);
        assert!(matches!(stranger, Err(AppError::NotFound(_))));

        update_status(&f.conn, &booking.id, BookingStatus::Confirmed, &mut outbox).unwrap();
        update_status(&f.conn, &booking.id, BookingStatus::PickedUp, &mut outbox).unwrap();

        let late = cancel_booking(&f.conn, &booking.id, Some(&f.user_id), &mut outbox);
        assert!(matches!(late, Err(AppError::Conflict(_))));

        let skip = update_status(&f.conn, &booking.id, BookingStatus::Completed, &mut outbox);
        assert!(matches!(skip, Err(AppError::Conflict(_))));
    }
}
