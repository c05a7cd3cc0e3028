use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub market_price: i64,
    pub discount_price: i64,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i64,
}

impl Product {
    /// Whole-percent saving shown next to the struck-through market price.
    pub fn discount_rate(&self) -> i64 {
        if self.market_price <= 0 {
            return 0;
        }
        (self.market_price - self.discount_price) * 100 / self.market_price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub starts_at: Option<NaiveDate>,
    pub ends_at: Option<NaiveDate>,
}

impl Banner {
    pub fn is_visible_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.starts_at.map_or(true, |s| s <= date)
            && self.ends_at.map_or(true, |e| date <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_rate_rounds_down() {
        let product = Product {
            id: "p1".to_string(),
            name: "일반 칼 연마".to_string(),
            description: None,
            market_price: 15000,
            discount_price: 9900,
            image_url: None,
            is_active: true,
            sort_order: 0,
        };
        assert_eq!(product.discount_rate(), 34);
    }

    #[test]
    fn banner_window_is_inclusive() {
        let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let banner = Banner {
            id: "b1".to_string(),
            title: "여름 이벤트".to_string(),
            image_url: "/banner.png".to_string(),
            link_url: None,
            sort_order: 0,
            is_active: true,
            starts_at: Some(day("2025-07-01")),
            ends_at: Some(day("2025-07-31")),
        };
        assert!(banner.is_visible_on(day("2025-07-01")));
        assert!(banner.is_visible_on(day("2025-07-31")));
        assert!(!banner.is_visible_on(day("2025-08-01")));
    }
}
