//! Display helpers shared by API responses and outgoing messages.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::models::{BookingStatus, PaymentMethod, PaymentStatus};

/// `12000` → `"12,000"`.
pub fn format_number(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

/// `12000` → `"12,000원"`.
pub fn format_currency(amount: i64) -> String {
    format!("{}원", format_number(amount))
}

pub fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "월",
        Weekday::Tue => "화",
        Weekday::Wed => "수",
        Weekday::Thu => "목",
        Weekday::Fri => "금",
        Weekday::Sat => "토",
        Weekday::Sun => "일",
    }
}

/// `2025-06-15` → `"2025년 6월 15일"`.
pub fn format_date(date: &NaiveDate) -> String {
    format!("{}년 {}월 {}일", date.year(), date.month(), date.day())
}

/// `2025-06-15` → `"2025년 6월 15일 (일)"`.
pub fn format_date_with_weekday(date: &NaiveDate) -> String {
    format!("{} ({})", format_date(date), weekday_label(date.weekday()))
}

/// `"14:00"` → `"오후 2:00"`. Unparseable input is returned unchanged.
pub fn format_time_label(time: &str) -> String {
    let Ok(t) = NaiveTime::parse_from_str(time, "%H:%M") else {
        return time.to_string();
    };
    let (is_pm, hour) = t.hour12();
    let meridiem = if is_pm { "오후" } else { "오전" };
    format!("{meridiem} {hour}:{:02}", t.minute())
}

/// Strips separators and accepts Korean mobile numbers only (`01X`, 10–11 digits).
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw
        .trim()
        .trim_start_matches("+82")
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let digits = if raw.trim().starts_with("+82") && !digits.starts_with('0') {
        format!("0{digits}")
    } else {
        digits
    };

    if digits.starts_with("01") && (10..=11).contains(&digits.len()) {
        Some(digits)
    } else {
        None
    }
}

/// `"01012345678"` → `"010-1234-5678"`.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
        10 if digits.starts_with("02") => {
            format!("{}-{}-{}", &digits[..2], &digits[2..6], &digits[6..])
        }
        10 => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        9 if digits.starts_with("02") => {
            format!("{}-{}-{}", &digits[..2], &digits[2..5], &digits[5..])
        }
        _ => phone.to_string(),
    }
}

/// `"01012345678"` → `"010-****-5678"`, for admin lists.
pub fn mask_phone(phone: &str) -> String {
    let formatted = format_phone(phone);
    let parts: Vec<&str> = formatted.split('-').collect();
    if parts.len() == 3 {
        format!("{}-{}-{}", parts[0], "*".repeat(parts[1].len()), parts[2])
    } else {
        formatted
    }
}

pub fn booking_status_label(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "예약대기",
        BookingStatus::Confirmed => "예약확정",
        BookingStatus::PickedUp => "수거완료",
        BookingStatus::Sharpening => "연마중",
        BookingStatus::Shipping => "배송중",
        BookingStatus::Completed => "완료",
        BookingStatus::Cancelled => "취소",
    }
}

pub fn payment_status_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "결제대기",
        PaymentStatus::Paid => "결제완료",
        PaymentStatus::Failed => "결제실패",
        PaymentStatus::Cancelled => "결제취소",
        PaymentStatus::Refunded => "환불완료",
    }
}

pub fn payment_method_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Card => "신용카드",
        PaymentMethod::BankTransfer => "무통장입금",
        PaymentMethod::KakaoPay => "카카오페이",
        PaymentMethod::NaverPay => "네이버페이",
        PaymentMethod::TossPay => "토스페이",
        PaymentMethod::Subscription => "구독권",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0), "0원");
        assert_eq!(format_currency(900), "900원");
        assert_eq!(format_currency(12000), "12,000원");
        assert_eq!(format_currency(1234567), "1,234,567원");
        assert_eq!(format_currency(-5000), "-5,000원");
    }

    #[test]
    fn dates_use_korean_units() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(format_date(&date), "2025년 6월 15일");
        assert_eq!(format_date_with_weekday(&date), "2025년 6월 15일 (일)");
    }

    #[test]
    fn time_label_uses_meridiem() {
        assert_eq!(format_time_label("09:30"), "오전 9:30");
        assert_eq!(format_time_label("14:00"), "오후 2:00");
        assert_eq!(format_time_label("12:00"), "오후 12:00");
        assert_eq!(format_time_label("later"), "later");
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("010-1234-5678").as_deref(), Some("01012345678"));
        assert_eq!(normalize_phone(" 010 1234 5678 ").as_deref(), Some("01012345678"));
        assert_eq!(normalize_phone("+82 10-1234-5678").as_deref(), Some("01012345678"));
        assert_eq!(normalize_phone("011-123-4567").as_deref(), Some("0111234567"));
        assert_eq!(normalize_phone("02-123-4567"), None);
        assert_eq!(normalize_phone("12345"), None);
    }

    #[test]
    fn phone_formatting() {
        assert_eq!(format_phone("01012345678"), "010-1234-5678");
        assert_eq!(format_phone("0212345678"), "02-1234-5678");
        assert_eq!(format_phone("0311234567"), "031-123-4567");
        assert_eq!(mask_phone("01012345678"), "010-****-5678");
    }

    #[test]
    fn every_status_has_a_label() {
        for status in BookingStatus::ALL {
            assert!(!booking_status_label(status).is_empty());
        }
        assert_eq!(payment_status_label(PaymentStatus::Refunded), "환불완료");
        assert_eq!(payment_method_label(PaymentMethod::BankTransfer), "무통장입금");
    }
}
