pub mod admin;
pub mod booking;
pub mod catalog;
pub mod coupon;
pub mod insurance;
pub mod notification;
pub mod payment;
pub mod subscription;
pub mod terms;
pub mod user;

pub use admin::{Admin, AdminRole};
pub use booking::{Booking, BookingItem, BookingStatus};
pub use catalog::{Banner, Product};
pub use coupon::{Coupon, DiscountType, UserCoupon};
pub use insurance::InsurancePolicy;
pub use notification::{Notification, NotificationKind};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use subscription::{BillingCycle, SubscriptionPlan, SubscriptionStatus, UserSubscription};
pub use terms::Term;
pub use user::{Address, SessionKind, User};
