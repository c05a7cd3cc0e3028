use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::format::format_currency;

pub const MIN_COVERAGE: i64 = 10_000;
pub const MAX_COVERAGE: i64 = 500_000;
const RATE_PERCENT: i64 = 2;
const ROUNDING_UNIT: i64 = 100;
const MIN_PREMIUM_PER_KNIFE: i64 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct InsuranceRequest {
    pub coverage_amount: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PremiumQuote {
    pub coverage_amount: i64,
    pub knife_count: i64,
    pub premium_per_knife: i64,
    pub premium: i64,
}

/// Damage coverage priced per knife: 2% of coverage, rounded up to 100 won, at least 500 won.
pub fn calculate_premium(coverage_amount: i64, knife_count: i64) -> Result<PremiumQuote, AppError> {
    if !(MIN_COVERAGE..=MAX_COVERAGE).contains(&coverage_amount) {
        return Err(AppError::validation(format!(
            "보장 금액은 {} ~ {} 사이여야 합니다",
            format_currency(MIN_COVERAGE),
            format_currency(MAX_COVERAGE)
        )));
    }
    if knife_count < 1 {
        return Err(AppError::validation("칼 개수는 1개 이상이어야 합니다"));
    }

    let scaled = coverage_amount * RATE_PERCENT;
    let divisor = 100 * ROUNDING_UNIT;
    let rounded_up = (scaled + divisor - 1) / divisor * ROUNDING_UNIT;
    let premium_per_knife = rounded_up.max(MIN_PREMIUM_PER_KNIFE);

    Ok(PremiumQuote {
        coverage_amount,
        knife_count,
        premium_per_knife,
        premium: premium_per_knife * knife_count,
    })
}
