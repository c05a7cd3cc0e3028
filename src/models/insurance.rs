use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePolicy {
    pub id: String,
    pub user_id: String,
    pub booking_id: String,
    pub knife_count: i64,
    pub coverage_amount: i64,
    pub premium: i64,
}
