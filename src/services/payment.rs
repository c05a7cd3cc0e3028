//! Payment creation, the status state machine and provider callbacks.

use base64::Engine;
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::config::AppConfig;
use crate::db::{new_id, queries};
use crate::errors::AppError;
use crate::models::{
    BookingStatus, Notification, NotificationKind, Payment, PaymentMethod, PaymentStatus,
};
use crate::services::format::{format_currency, payment_method_label, payment_status_label};
use crate::services::{notification, subscription};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub booking_id: String,
    pub method: PaymentMethod,
    pub depositor_name: Option<String>,
}

/// Opens a payment for a pending booking. Subscription and zero-amount payments settle immediately.
pub fn create_payment(
    conn: &Connection,
    config: &AppConfig,
    user_id: &str,
    req: &NewPayment,
    today: NaiveDate,
    outbox: &mut Vec<Notification>,
) -> Result<Payment, AppError> {
    let booking = queries::get_booking(conn, &req.booking_id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| AppError::not_found("예약을 찾을 수 없습니다"))?;

    if booking.status != BookingStatus::Pending {
        return Err(AppError::conflict("결제할 수 없는 예약 상태입니다"));
    }

    let existing = queries::list_payments_for_booking(conn, &booking.id)?;
    if existing.iter().any(|p| p.status.is_open()) {
        return Err(AppError::conflict("이미 결제가 진행 중인 예약입니다"));
    }

    let now = chrono::Utc::now().naive_utc();
    let mut payment = Payment {
        id: new_id(),
        booking_id: booking.id.clone(),
        user_id: user_id.to_string(),
        method: req.method,
        amount: booking.final_amount,
        status: PaymentStatus::Pending,
        bank_name: None,
        account_number: None,
        depositor_name: None,
        provider_tx_id: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };

    match req.method {
        PaymentMethod::BankTransfer => {
            let depositor = req
                .depositor_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| AppError::validation("입금자명을 입력해주세요"))?;
            payment.depositor_name = Some(depositor.to_string());
            payment.bank_name = Some(config.bank_name.clone());
            payment.account_number = Some(config.bank_account_number.clone());
        }
        PaymentMethod::Subscription => {
            subscription::consume(conn, user_id, booking.total_quantity, today)?;
            payment.amount = 0;
        }
        _ => {}
    }

    queries::insert_payment(conn, &payment)?;
    tracing::info!(
        payment_id = %payment.id,
        booking_id = %booking.id,
        method = payment.method.as_str(),
        amount = payment.amount,
        "payment created"
    );

    if payment.amount == 0 {
        return transition(conn, &payment.id, PaymentStatus::Paid, None, outbox);
    }
    Ok(payment)
}

/// Moves a payment along `pending → paid | failed | cancelled`, `paid → refunded`
/// and applies the booking and notification side effects. Re-applying the
/// current status is a no-op.
pub fn transition(
    conn: &Connection,
    payment_id: &str,
    next: PaymentStatus,
    provider_tx_id: Option<&str>,
    outbox: &mut Vec<Notification>,
) -> Result<Payment, AppError> {
    let payment = queries::get_payment(conn, payment_id)?
        .ok_or_else(|| AppError::not_found("결제를 찾을 수 없습니다"))?;

    if payment.status == next {
        return Ok(payment);
    }
    if !payment.status.can_transition_to(next) {
        return Err(AppError::conflict(format!(
            "결제 상태를 {}에서 {}(으)로 변경할 수 없습니다",
            payment.status.as_str(),
            next.as_str()
        )));
    }

    queries::update_payment_status(conn, &payment.id, next, provider_tx_id)?;
    tracing::info!(
        payment_id = %payment.id,
        from = payment.status.as_str(),
        to = next.as_str(),
        "payment status changed"
    );

    let amount = format_currency(payment.amount);
    let method = payment_method_label(payment.method);
    match next {
        PaymentStatus::Paid => {
            if let Some(booking) = queries::get_booking(conn, &payment.booking_id)? {
                if booking.status == BookingStatus::Pending {
                    queries::update_booking_status(conn, &booking.id, BookingStatus::Confirmed)?;
                }
            }
            outbox.push(notification::create(
                conn,
                &payment.user_id,
                NotificationKind::Payment,
                "결제 완료",
                &format!("{method} {amount} 결제가 완료되어 예약이 확정되었습니다."),
            )?);
        }
        PaymentStatus::Failed => {
            outbox.push(notification::create(
                conn,
                &payment.user_id,
                NotificationKind::Payment,
                "결제 실패",
                &format!("{method} {amount} 결제에 실패했습니다. 다시 시도해주세요."),
            )?);
        }
        PaymentStatus::Refunded => {
            if payment.method == PaymentMethod::Subscription {
                if let Some(booking) = queries::get_booking(conn, &payment.booking_id)? {
                    subscription::give_back(conn, &payment.user_id, booking.total_quantity)?;
                }
            }
            // Subscription and fully discounted payments have nothing to refund.
            if payment.amount > 0 {
                outbox.push(notification::create(
                    conn,
                    &payment.user_id,
                    NotificationKind::Payment,
                    "환불 완료",
                    &format!("{amount} 환불이 처리되었습니다."),
                )?);
            }
        }
        PaymentStatus::Cancelled | PaymentStatus::Pending => {}
    }

    queries::get_payment(conn, &payment.id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("payment {} vanished", payment.id)))
}

/// A payment as shown to clients, with its Korean status and method labels.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub status_label: &'static str,
    pub method_label: &'static str,
}

impl From<Payment> for PaymentView {
    fn from(payment: Payment) -> Self {
        Self {
            status_label: payment_status_label(payment.status),
            method_label: payment_method_label(payment.method),
            payment,
        }
    }
}

// ── Next step ──

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BankAccount {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    pub amount: i64,
}

/// Where the client goes after a payment is created.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum OrderNext {
    Checkout { redirect_url: String },
    Complete { bank_account: Option<BankAccount> },
}

pub fn next_step(config: &AppConfig, payment: &Payment) -> Result<OrderNext, AppError> {
    if payment.status != PaymentStatus::Pending {
        return Ok(OrderNext::Complete { bank_account: None });
    }

    if payment.method.uses_checkout() {
        let amount = payment.amount.to_string();
        let url = reqwest::Url::parse_with_params(
            &config.payment_checkout_url,
            &[
                ("payment_id", payment.id.as_str()),
                ("amount", amount.as_str()),
                ("method", payment.method.as_str()),
            ],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid PAYMENT_CHECKOUT_URL: {e}")))?;
        return Ok(OrderNext::Checkout {
            redirect_url: url.to_string(),
        });
    }

    let bank_account = (payment.method == PaymentMethod::BankTransfer).then(|| BankAccount {
        bank_name: payment.bank_name.clone().unwrap_or_else(|| config.bank_name.clone()),
        account_number: payment
            .account_number
            .clone()
            .unwrap_or_else(|| config.bank_account_number.clone()),
        account_holder: config.bank_account_holder.clone(),
        amount: payment.amount,
    });
    Ok(OrderNext::Complete { bank_account })
}

// ── Provider callback ──

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub provider_tx_id: Option<String>,
}

pub fn sign_webhook(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
    mac.update(body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Checks `X-Signature` against the raw body. An empty secret disables the check.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    if secret.is_empty() {
        return true;
    }
    let Some(signature) = signature else {
        return false;
    };
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };

    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

pub fn apply_webhook(
    conn: &Connection,
    event: &WebhookEvent,
    outbox: &mut Vec<Notification>,
) -> Result<Payment, AppError> {
    if !matches!(event.status, PaymentStatus::Paid | PaymentStatus::Failed) {
        return Err(AppError::validation("지원하지 않는 결제 상태입니다"));
    }
    transition(
        conn,
        &event.payment_id,
        event.status,
        event.provider_tx_id.as_deref(),
        outbox,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Booking, BookingItem};

    fn config() -> AppConfig {
        AppConfig {
            port: 0,
            database_url: ":memory:".to_string(),
            session_ttl_days: 30,
            cookie_secure: false,
            otp_secret: "secret".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            address_api_url: String::new(),
            address_api_key: String::new(),
            payment_checkout_url: "https://pay.example.com/checkout".to_string(),
            payment_webhook_secret: "whsec".to_string(),
            bank_name: "국민은행".to_string(),
            bank_account_number: "123-456-789".to_string(),
            bank_account_holder: "칼가는곳".to_string(),
            admin_username: String::new(),
            admin_password: String::new(),
        }
    }

    fn seed_booking(conn: &Connection, final_amount: i64) -> Booking {
        seed_booking_for_knives(conn, final_amount, 1)
    }

    fn seed_booking_for_knives(conn: &Connection, final_amount: i64, quantity: i64) -> Booking {
        let (user, _) = queries::find_or_create_user(conn, "01012345678").unwrap();
        let now = chrono::Utc::now().naive_utc();
        let booking = Booking {
            id: new_id(),
            user_id: user.id,
            booking_date: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            booking_time: "10:00".to_string(),
            items: vec![BookingItem {
                product_id: "p1".to_string(),
                name: "일반 칼 연마".to_string(),
                unit_price: final_amount / quantity,
                quantity,
            }],
            total_quantity: quantity,
            total_amount: final_amount,
            discount_amount: 0,
            insurance_premium: 0,
            final_amount,
            status: BookingStatus::Pending,
            address_id: None,
            request_note: None,
            user_coupon_id: None,
            created_at: now,
            updated_at: now,
        };
        queries::insert_booking(conn, &booking).unwrap();
        booking
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    #[test]
    fn card_payment_redirects_to_checkout() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking(&conn, 9900);
        let mut outbox = vec![];
        let req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::Card,
            depositor_name: None,
        };
        let payment = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, 9900);

        match next_step(&config(), &payment).unwrap() {
            OrderNext::Checkout { redirect_url } => {
                assert!(redirect_url.starts_with("https://pay.example.com/checkout?payment_id="));
                assert!(redirect_url.contains("amount=9900"));
                assert!(redirect_url.contains("method=card"));
            }
            other => panic!("expected checkout, got {other:?}"),
        }

        let second = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox);
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[test]
    fn bank_transfer_needs_depositor_and_shows_account() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking(&conn, 15000);
        let mut outbox = vec![];
        let mut req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::BankTransfer,
            depositor_name: Some("  ".to_string()),
        };
        let missing = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox);
        assert!(matches!(missing, Err(AppError::Validation(_))));

        req.depositor_name = Some("홍길동".to_string());
        let payment = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox).unwrap();
        assert_eq!(payment.account_number.as_deref(), Some("123-456-789"));

        let next = next_step(&config(), &payment).unwrap();
        let OrderNext::Complete { bank_account: Some(account) } = next else {
            panic!("expected bank account");
        };
        assert_eq!(account.amount, 15000);
        assert_eq!(account.account_holder, "칼가는곳");
    }

    #[test]
    fn zero_amount_is_paid_immediately() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking(&conn, 0);
        let mut outbox = vec![];
        let req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::Card,
            depositor_name: None,
        };
        let payment = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert!(payment.paid_at.is_some());
        assert_eq!(next_step(&config(), &payment).unwrap(), OrderNext::Complete { bank_account: None });

        let booking = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn subscription_without_plan_is_refused() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking(&conn, 9900);
        let req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::Subscription,
            depositor_name: None,
        };
        let result = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut vec![]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    fn subscribe_user(conn: &Connection, user_id: &str, usage_limit: i64) {
        let plan = subscription::create_plan(
            conn,
            subscription::PlanInput {
                name: "월간 연마 구독".to_string(),
                description: None,
                price: 19900,
                billing_cycle: crate::models::BillingCycle::Monthly,
                usage_limit,
                is_active: true,
            },
        )
        .unwrap();
        subscription::subscribe(conn, user_id, &plan.id, today()).unwrap();
    }

    fn usage_count(conn: &Connection, user_id: &str) -> i64 {
        subscription::current(conn, user_id, today()).unwrap().unwrap().usage_count
    }

    #[test]
    fn refunding_subscription_payment_returns_usage_once() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking_for_knives(&conn, 0, 3);
        subscribe_user(&conn, &booking.user_id, 4);

        let mut outbox = vec![];
        let req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::Subscription,
            depositor_name: None,
        };
        let payment = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(usage_count(&conn, &booking.user_id), 3);

        outbox.clear();
        transition(&conn, &payment.id, PaymentStatus::Refunded, None, &mut outbox).unwrap();
        assert_eq!(usage_count(&conn, &booking.user_id), 0);
        assert!(outbox.is_empty(), "nothing to refund for a subscription payment");

        crate::services::booking::cancel_booking(&conn, &booking.id, Some(&booking.user_id), &mut outbox).unwrap();
        assert_eq!(usage_count(&conn, &booking.user_id), 0);
    }

    #[test]
    fn cancelling_subscription_booking_returns_usage() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking_for_knives(&conn, 0, 2);
        subscribe_user(&conn, &booking.user_id, 4);

        let mut outbox = vec![];
        let req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::Subscription,
            depositor_name: None,
        };
        create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox).unwrap();
        assert_eq!(usage_count(&conn, &booking.user_id), 2);

        outbox.clear();
        crate::services::booking::cancel_booking(&conn, &booking.id, Some(&booking.user_id), &mut outbox).unwrap();
        assert_eq!(usage_count(&conn, &booking.user_id), 0);
        let titles: Vec<&str> = outbox.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["예약 취소"]);
    }

    #[test]
    fn payment_view_carries_labels() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking(&conn, 15000);
        let req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::BankTransfer,
            depositor_name: Some("홍길동".to_string()),
        };
        let payment = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut vec![]).unwrap();

        let json = serde_json::to_value(PaymentView::from(payment)).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["status_label"], "결제대기");
        assert_eq!(json["method_label"], "무통장입금");
        assert_eq!(json["amount"], 15000);
    }

    #[test]
    fn transitions_follow_state_machine() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = seed_booking(&conn, 9900);
        let mut outbox = vec![];
        let req = NewPayment {
            booking_id: booking.id.clone(),
            method: PaymentMethod::Card,
            depositor_name: None,
        };
        let payment = create_payment(&conn, &config(), &booking.user_id, &req, today(), &mut outbox).unwrap();

        let refund_early = transition(&conn, &payment.id, PaymentStatus::Refunded, None, &mut outbox);
        assert!(matches!(refund_early, Err(AppError::Conflict(_))));

        let paid = transition(&conn, &payment.id, PaymentStatus::Paid, Some("tx_1"), &mut outbox).unwrap();
        assert_eq!(paid.provider_tx_id.as_deref(), Some("tx_1"));

        // replay
        transition(&conn, &payment.id, PaymentStatus::Paid, Some("tx_1"), &mut outbox).unwrap();
        assert_eq!(outbox.len(), 1);

        let failed_after_paid = transition(&conn, &payment.id, PaymentStatus::Failed, None, &mut outbox);
        assert!(matches!(failed_after_paid, Err(AppError::Conflict(_))));

        let refunded = transition(&conn, &payment.id, PaymentStatus::Refunded, None, &mut outbox).unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert_eq!(outbox.last().unwrap().title, "환불 완료");
    }

    #[test]
    fn webhook_signature_checks() {
        let body = br#"{"payment_id":"p1","status":"paid"}"#;
        let signature = sign_webhook("whsec", body);
        assert!(verify_webhook_signature("whsec", body, Some(&signature)));
        assert!(!verify_webhook_signature("whsec", b"tampered", Some(&signature)));
        assert!(!verify_webhook_signature("whsec", body, None));
        assert!(!verify_webhook_signature("whsec", body, Some("not base64!")));
        assert!(verify_webhook_signature("", body, None));
    }
}
