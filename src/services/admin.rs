//! Back-office operations: admin accounts, catalog and banners.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::db::{new_id, queries};
use crate::errors::AppError;
use crate::models::{Admin, AdminRole, Banner, Product, UserCoupon};
use crate::services::auth::hash_password;
use crate::services::coupon;
use crate::services::format::normalize_phone;

const MIN_PASSWORD_LEN: usize = 8;

/// Creates the first super admin from `ADMIN_USERNAME` / `ADMIN_PASSWORD` when none exist.
pub fn bootstrap_super_admin(conn: &Connection, config: &AppConfig) -> Result<Option<Admin>, AppError> {
    if queries::count_admins(conn)? > 0 {
        return Ok(None);
    }
    if config.admin_username.is_empty() || config.admin_password.is_empty() {
        tracing::warn!("no admin accounts exist and ADMIN_USERNAME/ADMIN_PASSWORD are not set");
        return Ok(None);
    }

    let admin = create_admin(
        conn,
        NewAdmin {
            username: config.admin_username.clone(),
            password: config.admin_password.clone(),
            name: "최고 관리자".to_string(),
            role: AdminRole::SuperAdmin,
        },
    )?;
    tracing::info!(username = %admin.username, "bootstrapped super admin");
    Ok(Some(admin))
}

#[derive(Debug, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: AdminRole,
}

fn default_role() -> AdminRole {
    AdminRole::Admin
}

pub fn create_admin(conn: &Connection, req: NewAdmin) -> Result<Admin, AppError> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() || req.name.trim().is_empty() {
        return Err(AppError::validation("아이디와 이름을 입력해주세요"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "비밀번호는 {MIN_PASSWORD_LEN}자 이상이어야 합니다"
        )));
    }
    if queries::get_admin_by_username(conn, &username)?.is_some() {
        return Err(AppError::conflict("이미 사용 중인 아이디입니다"));
    }

    let admin = Admin {
        id: new_id(),
        username,
        password_hash: hash_password(&req.password)?,
        name: req.name.trim().to_string(),
        role: req.role,
        is_active: true,
        last_login_at: None,
    };
    queries::insert_admin(conn, &admin)?;
    Ok(admin)
}

pub fn deactivate_admin(conn: &Connection, acting: &Admin, id: &str) -> Result<(), AppError> {
    if acting.id == id {
        return Err(AppError::validation("자기 자신은 비활성화할 수 없습니다"));
    }
    if !queries::set_admin_active(conn, id, false)? {
        return Err(AppError::not_found("관리자를 찾을 수 없습니다"));
    }
    queries::delete_sessions_for_subject(conn, id)?;
    Ok(())
}

// ── Products ──

#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub market_price: i64,
    pub discount_price: i64,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i64,
}

fn default_true() -> bool {
    true
}

impl ProductInput {
    fn into_product(self, id: String) -> Result<Product, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("상품 이름을 입력해주세요"));
        }
        if self.discount_price < 0 || self.market_price < 0 {
            return Err(AppError::validation("가격은 0 이상이어야 합니다"));
        }
        if self.discount_price > self.market_price {
            return Err(AppError::validation("할인가는 정상가보다 클 수 없습니다"));
        }
        Ok(Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            market_price: self.market_price,
            discount_price: self.discount_price,
            image_url: self.image_url,
            is_active: self.is_active,
            sort_order: self.sort_order,
        })
    }
}

pub fn create_product(conn: &Connection, input: ProductInput) -> Result<Product, AppError> {
    let product = input.into_product(new_id())?;
    queries::insert_product(conn, &product)?;
    Ok(product)
}

pub fn update_product(conn: &Connection, id: &str, input: ProductInput) -> Result<Product, AppError> {
    let product = input.into_product(id.to_string())?;
    if !queries::update_product(conn, &product)? {
        return Err(AppError::not_found("상품을 찾을 수 없습니다"));
    }
    Ok(product)
}

// ── Banners ──

#[derive(Debug, Deserialize)]
pub struct BannerInput {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub starts_at: Option<NaiveDate>,
    pub ends_at: Option<NaiveDate>,
}

impl BannerInput {
    fn into_banner(self, id: String) -> Result<Banner, AppError> {
        if self.title.trim().is_empty() || self.image_url.trim().is_empty() {
            return Err(AppError::validation("제목과 이미지를 입력해주세요"));
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if start > end {
                return Err(AppError::validation("노출 시작일이 종료일보다 늦습니다"));
            }
        }
        Ok(Banner {
            id,
            title: self.title.trim().to_string(),
            image_url: self.image_url.trim().to_string(),
            link_url: self.link_url,
            sort_order: self.sort_order,
            is_active: self.is_active,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        })
    }
}

pub fn create_banner(conn: &Connection, input: BannerInput) -> Result<Banner, AppError> {
    let banner = input.into_banner(new_id())?;
    queries::insert_banner(conn, &banner)?;
    Ok(banner)
}

pub fn update_banner(conn: &Connection, id: &str, input: BannerInput) -> Result<Banner, AppError> {
    let banner = input.into_banner(id.to_string())?;
    if !queries::update_banner(conn, &banner)? {
        return Err(AppError::not_found("배너를 찾을 수 없습니다"));
    }
    Ok(banner)
}

// ── Coupons ──

/// Issues a coupon to the customer registered with `phone`.
pub fn issue_coupon_by_phone(conn: &Connection, coupon_id: &str, phone: &str) -> Result<UserCoupon, AppError> {
    let phone = normalize_phone(phone).ok_or_else(|| AppError::validation("휴대폰 번호 형식이 올바르지 않습니다"))?;
    let user = queries::get_user_by_phone(conn, &phone)?
        .ok_or_else(|| AppError::not_found("해당 번호로 가입한 회원이 없습니다"))?;
    coupon::issue_to_user(conn, coupon_id, &user.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::auth::authenticate_admin;

    fn product_input(market: i64, discount: i64) -> ProductInput {
        ProductInput {
            name: "일반 칼 연마".to_string(),
            description: None,
            market_price: market,
            discount_price: discount,
            image_url: None,
            is_active: true,
            sort_order: 0,
        }
    }

    #[test]
    fn discount_price_cannot_exceed_market_price() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(matches!(create_product(&conn, product_input(10000, 12000)), Err(AppError::Validation(_))));
        assert!(matches!(create_product(&conn, product_input(10000, -1)), Err(AppError::Validation(_))));

        let product = create_product(&conn, product_input(15000, 9900)).unwrap();
        let updated = update_product(&conn, &product.id, product_input(15000, 15000)).unwrap();
        assert_eq!(updated.discount_price, 15000);
        assert!(matches!(update_product(&conn, "missing", product_input(1, 1)), Err(AppError::NotFound(_))));
    }

    #[test]
    fn admin_accounts_are_unique_and_can_log_in() {
        let conn = db::init_db(":memory:").unwrap();
        let req = |username: &str, password: &str| NewAdmin {
            username: username.to_string(),
            password: password.to_string(),
            name: "운영자".to_string(),
            role: AdminRole::Admin,
        };

        assert!(matches!(create_admin(&conn, req("ops", "short")), Err(AppError::Validation(_))));
        let admin = create_admin(&conn, req("Ops", "long-enough-pw")).unwrap();
        assert_eq!(admin.username, "ops");
        assert!(matches!(create_admin(&conn, req("ops", "long-enough-pw")), Err(AppError::Conflict(_))));

        assert!(authenticate_admin(&conn, "ops", "long-enough-pw").is_ok());
        assert!(authenticate_admin(&conn, "ops", "wrong-password").is_err());
    }

    #[test]
    fn deactivated_admin_cannot_log_in() {
        let conn = db::init_db(":memory:").unwrap();
        let boss = create_admin(
            &conn,
            NewAdmin {
                username: "boss".to_string(),
                password: "boss-password".to_string(),
                name: "대표".to_string(),
                role: AdminRole::SuperAdmin,
            },
        )
        .unwrap();
        let staff = create_admin(
            &conn,
            NewAdmin {
                username: "staff".to_string(),
                password: "staff-password".to_string(),
                name: "직원".to_string(),
                role: AdminRole::Admin,
            },
        )
        .unwrap();

        assert!(matches!(deactivate_admin(&conn, &boss, &boss.id), Err(AppError::Validation(_))));
        deactivate_admin(&conn, &boss, &staff.id).unwrap();
        assert!(authenticate_admin(&conn, "staff", "staff-password").is_err());
    }

    #[test]
    fn banner_window_must_be_ordered() {
        let conn = db::init_db(":memory:").unwrap();
        let input = BannerInput {
            title: "여름 이벤트".to_string(),
            image_url: "/summer.png".to_string(),
            link_url: None,
            sort_order: 0,
            is_active: true,
            starts_at: NaiveDate::from_ymd_opt(2025, 8, 1),
            ends_at: NaiveDate::from_ymd_opt(2025, 7, 1),
        };
        assert!(matches!(create_banner(&conn, input), Err(AppError::Validation(_))));
    }
}
