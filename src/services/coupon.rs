use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{new_id, queries};
use crate::errors::AppError;
use crate::models::{Coupon, DiscountType, UserCoupon};
use crate::services::format::format_currency;

/// Discount for `amount` under the coupon's rule. Never exceeds `amount`;
/// zero when the order is below the coupon's minimum.
pub fn calculate_discount(coupon: &Coupon, amount: i64) -> i64 {
    if amount <= 0 || amount < coupon.min_order_amount {
        return 0;
    }

    let raw = match coupon.discount_type {
        DiscountType::Fixed => coupon.discount_value,
        DiscountType::Percentage => {
            let pct = i128::from(amount) * i128::from(coupon.discount_value) / 100;
            i64::try_from(pct.clamp(0, i128::from(amount))).unwrap_or(amount)
        }
    };
    let capped = match coupon.max_discount_amount {
        Some(max) if max > 0 => raw.min(max),
        _ => raw,
    };
    capped.clamp(0, amount)
}

#[derive(Debug, Serialize)]
pub struct UserCouponView {
    #[serde(flatten)]
    pub user_coupon: UserCoupon,
    pub usable: bool,
    pub description: String,
}

/// `"3,000원 할인"` / `"10% 할인 (최대 5,000원)"`, plus the minimum order if any.
pub fn describe(coupon: &Coupon) -> String {
    let mut text = match coupon.discount_type {
        DiscountType::Fixed => format!("{} 할인", format_currency(coupon.discount_value)),
        DiscountType::Percentage => match coupon.max_discount_amount {
            Some(max) => format!("{}% 할인 (최대 {})", coupon.discount_value, format_currency(max)),
            None => format!("{}% 할인", coupon.discount_value),
        },
    };
    if coupon.min_order_amount > 0 {
        text.push_str(&format!(", {} 이상 주문 시", format_currency(coupon.min_order_amount)));
    }
    text
}

pub fn list_for_user(
    conn: &Connection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<UserCouponView>, AppError> {
    let coupons = queries::list_user_coupons(conn, user_id)?;
    Ok(coupons
        .into_iter()
        .map(|uc| UserCouponView {
            usable: uc.is_usable_on(today),
            description: describe(&uc.coupon),
            user_coupon: uc,
        })
        .collect())
}

fn issue(conn: &Connection, user_id: &str, coupon: &Coupon) -> Result<UserCoupon, AppError> {
    if queries::user_has_coupon(conn, user_id, &coupon.id)? {
        return Err(AppError::conflict("이미 등록된 쿠폰입니다"));
    }
    let id = queries::issue_user_coupon(conn, user_id, &coupon.id)?;
    queries::get_user_coupon(conn, &id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("user coupon {id} missing after insert")))
}

/// Customer-entered coupon code.
pub fn register_code(
    conn: &Connection,
    user_id: &str,
    code: &str,
    today: NaiveDate,
) -> Result<UserCoupon, AppError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::validation("쿠폰 코드를 입력해주세요"));
    }

    let coupon = queries::get_coupon_by_code(conn, &code)?
        .ok_or_else(|| AppError::not_found("존재하지 않는 쿠폰 코드입니다"))?;
    if !coupon.is_registrable_on(today) {
        return Err(AppError::validation("만료되었거나 사용할 수 없는 쿠폰입니다"));
    }

    issue(conn, user_id, &coupon)
}

/// Admin issuance to a specific user.
pub fn issue_to_user(conn: &Connection, coupon_id: &str, user_id: &str) -> Result<UserCoupon, AppError> {
    let coupon = queries::get_coupon(conn, coupon_id)?
        .ok_or_else(|| AppError::not_found("쿠폰을 찾을 수 없습니다"))?;
    issue(conn, user_id, &coupon)
}

/// Ensures the user's coupon can be applied to an order of `amount`; returns it with the discount.
pub fn check_applicable(
    conn: &Connection,
    user_id: &str,
    user_coupon_id: &str,
    amount: i64,
    today: NaiveDate,
) -> Result<(UserCoupon, i64), AppError> {
    let user_coupon = queries::get_user_coupon(conn, user_coupon_id)?
        .filter(|uc| uc.user_id == user_id)
        .ok_or_else(|| AppError::not_found("쿠폰을 찾을 수 없습니다"))?;

    if user_coupon.is_used {
        return Err(AppError::conflict("이미 사용한 쿠폰입니다"));
    }
    if !user_coupon.coupon.is_valid_on(today) {
        return Err(AppError::validation("사용 기간이 아니거나 만료된 쿠폰입니다"));
    }
    if amount < user_coupon.coupon.min_order_amount {
        return Err(AppError::validation(format!(
            "{} 이상 주문 시 사용할 수 있는 쿠폰입니다",
            format_currency(user_coupon.coupon.min_order_amount)
        )));
    }

    let discount = calculate_discount(&user_coupon.coupon, amount);
    Ok((user_coupon, discount))
}

#[derive(Debug, Serialize)]
pub struct CouponQuote {
    pub user_coupon_id: String,
    pub amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
}

/// Upper bound for amounts sent to the preview endpoint.
pub const MAX_PREVIEW_AMOUNT: i64 = 100_000_000;

pub fn preview(
    conn: &Connection,
    user_id: &str,
    user_coupon_id: &str,
    amount: i64,
    today: NaiveDate,
) -> Result<CouponQuote, AppError> {
    if !(0..=MAX_PREVIEW_AMOUNT).contains(&amount) {
        return Err(AppError::validation("금액이 올바르지 않습니다"));
    }
    let (user_coupon, discount) = check_applicable(conn, user_id, user_coupon_id, amount, today)?;
    Ok(CouponQuote {
        user_coupon_id: user_coupon.id,
        amount,
        discount_amount: discount,
        final_amount: amount - discount,
    })
}

// ── Admin ──

#[derive(Debug, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub min_order_amount: i64,
    pub max_discount_amount: Option<i64>,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl CouponInput {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("쿠폰 이름을 입력해주세요"));
        }
        match self.discount_type {
            DiscountType::Fixed if self.discount_value <= 0 => {
                return Err(AppError::validation("할인 금액은 0보다 커야 합니다"));
            }
            DiscountType::Percentage if !(1..=100).contains(&self.discount_value) => {
                return Err(AppError::validation("할인율은 1~100 사이여야 합니다"));
            }
            _ => {}
        }
        if self.min_order_amount < 0 || self.max_discount_amount.is_some_and(|m| m < 0) {
            return Err(AppError::validation("금액은 0 이상이어야 합니다"));
        }
        if self.valid_from > self.valid_until {
            return Err(AppError::validation("사용 기간의 시작일이 종료일보다 늦습니다"));
        }
        Ok(())
    }

    fn into_coupon(self, id: String) -> Coupon {
        Coupon {
            id,
            code: self.code.trim().to_uppercase(),
            name: self.name.trim().to_string(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount,
            max_discount_amount: self.max_discount_amount,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
        }
    }
}

pub fn create_coupon(conn: &Connection, input: CouponInput) -> Result<Coupon, AppError> {
    input.validate()?;
    if input.code.trim().is_empty() {
        return Err(AppError::validation("쿠폰 코드를 입력해주세요"));
    }
    let coupon = input.into_coupon(new_id());
    if queries::get_coupon_by_code(conn, &coupon.code)?.is_some() {
        return Err(AppError::conflict("이미 존재하는 쿠폰 코드입니다"));
    }
    queries::insert_coupon(conn, &coupon)?;
    Ok(coupon)
}

/// The code is fixed once issued; only the rule and window change.
pub fn update_coupon(conn: &Connection, id: &str, input: CouponInput) -> Result<Coupon, AppError> {
    input.validate()?;
    let existing = queries::get_coupon(conn, id)?
        .ok_or_else(|| AppError::not_found("쿠폰을 찾을 수 없습니다"))?;
    let mut coupon = input.into_coupon(existing.id);
    coupon.code = existing.code;
    queries::update_coupon(conn, &coupon)?;
    Ok(coupon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        Coupon {
            id: "c1".to_string(),
            code: "WELCOME".to_string(),
            name: "첫 주문 할인".to_string(),
            discount_type,
            discount_value: value,
            min_order_amount: 0,
            max_discount_amount: None,
            valid_from: day("2025-01-01"),
            valid_until: day("2025-12-31"),
            is_active: true,
        }
    }

    #[test]
    fn fixed_discount_never_exceeds_amount() {
        let c = coupon(DiscountType::Fixed, 3000);
        assert_eq!(calculate_discount(&c, 20000), 3000);
        assert_eq!(calculate_discount(&c, 2000), 2000);
        assert_eq!(calculate_discount(&c, 0), 0);
    }

    #[test]
    fn percentage_discount_floors_and_caps() {
        let mut c = coupon(DiscountType::Percentage, 15);
        assert_eq!(calculate_discount(&c, 9900), 1485);
        assert_eq!(calculate_discount(&c, 333), 49);

        c.max_discount_amount = Some(1000);
        assert_eq!(calculate_discount(&c, 9900), 1000);
    }

    #[test]
    fn percentage_of_huge_amount_does_not_overflow() {
        let c = coupon(DiscountType::Percentage, 10);
        assert_eq!(calculate_discount(&c, i64::MAX / 5), i64::MAX / 50);
        assert_eq!(calculate_discount(&c, i64::MAX), i64::MAX / 10);
    }

    #[test]
    fn below_minimum_order_gives_nothing() {
        let mut c = coupon(DiscountType::Fixed, 5000);
        c.min_order_amount = 30000;
        assert_eq!(calculate_discount(&c, 29999), 0);
        assert_eq!(calculate_discount(&c, 30000), 5000);
    }

    #[test]
    fn describe_mentions_cap_and_minimum() {
        let mut c = coupon(DiscountType::Percentage, 10);
        c.max_discount_amount = Some(5000);
        c.min_order_amount = 20000;
        assert_eq!(describe(&c), "10% 할인 (최대 5,000원), 20,000원 이상 주문 시");
        assert_eq!(describe(&coupon(DiscountType::Fixed, 3000)), "3,000원 할인");
    }

    fn input(code: &str) -> CouponInput {
        CouponInput {
            code: code.to_string(),
            name: "가을 할인".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 10,
            min_order_amount: 10000,
            max_discount_amount: Some(3000),
            valid_from: day("2025-09-01"),
            valid_until: day("2025-11-30"),
            is_active: true,
        }
    }

    #[test]
    fn create_rejects_bad_rules() {
        let conn = db::init_db(":memory:").unwrap();

        let mut bad = input("AUTUMN");
        bad.discount_value = 120;
        assert!(matches!(create_coupon(&conn, bad), Err(AppError::Validation(_))));

        let mut reversed = input("AUTUMN");
        reversed.valid_from = day("2025-12-01");
        assert!(matches!(create_coupon(&conn, reversed), Err(AppError::Validation(_))));

        let created = create_coupon(&conn, input(" autumn ")).unwrap();
        assert_eq!(created.code, "AUTUMN");
        assert!(matches!(create_coupon(&conn, input("AUTUMN")), Err(AppError::Conflict(_))));
    }

    #[test]
    fn register_and_apply_flow() {
        let conn = db::init_db(":memory:").unwrap();
        let (user, _) = queries::find_or_create_user(&conn, "01012345678").unwrap();
        create_coupon(&conn, input("AUTUMN")).unwrap();

        let out_of_window = register_code(&conn, &user.id, "autumn", day("2025-12-15"));
        assert!(matches!(out_of_window, Err(AppError::Validation(_))));

        let uc = register_code(&conn, &user.id, "autumn", day("2025-10-01")).unwrap();
        let duplicate = register_code(&conn, &user.id, "AUTUMN", day("2025-10-01"));
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let too_small = check_applicable(&conn, &user.id, &uc.id, 5000, day("2025-10-01"));
        assert!(matches!(too_small, Err(AppError::Validation(_))));

        let quote = preview(&conn, &user.id, &uc.id, 40000, day("2025-10-01")).unwrap();
        assert_eq!(quote.discount_amount, 3000);
        assert_eq!(quote.final_amount, 37000);

        let views = list_for_user(&conn, &user.id, day("2025-10-01")).unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].usable);
    }

    #[test]
    fn early_registration_is_allowed_but_not_usable_yet() {
        let conn = db::init_db(":memory:").unwrap();
        let (user, _) = queries::find_or_create_user(&conn, "01012345678").unwrap();
        create_coupon(&conn, input("AUTUMN")).unwrap();

        let uc = register_code(&conn, &user.id, "autumn", day("2025-08-15")).unwrap();
        let early = check_applicable(&conn, &user.id, &uc.id, 40000, day("2025-08-15"));
        assert!(matches!(early, Err(AppError::Validation(_))));

        let views = list_for_user(&conn, &user.id, day("2025-08-15")).unwrap();
        assert!(!views[0].usable);
    }

    #[test]
    fn preview_rejects_out_of_range_amounts() {
        let conn = db::init_db(":memory:").unwrap();
        let (user, _) = queries::find_or_create_user(&conn, "01012345678").unwrap();
        create_coupon(&conn, input("AUTUMN")).unwrap();
        let uc = register_code(&conn, &user.id, "AUTUMN", day("2025-10-01")).unwrap();

        for amount in [-1, MAX_PREVIEW_AMOUNT + 1, i64::MAX] {
            let res = preview(&conn, &user.id, &uc.id, amount, day("2025-10-01"));
            assert!(matches!(res, Err(AppError::Validation(_))), "amount {amount}");
        }
        let quote = preview(&conn, &user.id, &uc.id, MAX_PREVIEW_AMOUNT, day("2025-10-01")).unwrap();
        assert_eq!(quote.discount_amount, 3000);
    }
}
