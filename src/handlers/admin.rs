//! Back-office API under `/api/admin`, authenticated by the `admin_session` cookie.

pub mod catalog;
pub mod orders;
pub mod promotions;
pub mod session;
