use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, admin};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/payments", post(handlers::webhook::payment_webhook))
        .merge(public_routes())
        .merge(user_routes())
        .merge(admin_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", get(handlers::catalog::list_products))
        .route("/api/products/:id", get(handlers::catalog::get_product))
        .route("/api/banners", get(handlers::catalog::list_banners))
        .route("/api/subscription-plans", get(handlers::catalog::list_plans))
        .route("/api/insurance/quote", post(handlers::catalog::insurance_quote))
        .route("/api/terms", get(handlers::terms::list_terms))
        .route("/api/address/search", get(handlers::addresses::search_address))
        .route("/api/auth/otp/send", post(handlers::account::send_otp))
        .route("/api/auth/otp/verify", post(handlers::account::verify_otp))
        .route("/api/auth/logout", post(handlers::account::logout))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/auth/me",
            get(handlers::account::me).patch(handlers::account::update_me),
        )
        .route(
            "/api/addresses",
            get(handlers::addresses::list_addresses).post(handlers::addresses::create_address),
        )
        .route("/api/addresses/:id", delete(handlers::addresses::delete_address))
        .route(
            "/api/addresses/:id/default",
            post(handlers::addresses::set_default_address),
        )
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route("/api/bookings/:id/cancel", post(handlers::bookings::cancel_booking))
        .route("/api/payments", post(handlers::payments::create_payment))
        .route("/api/payments/:id", get(handlers::payments::get_payment))
        .route("/api/orders", post(handlers::payments::place_order))
        .route("/api/coupons", get(handlers::coupons::list_coupons))
        .route("/api/coupons/register", post(handlers::coupons::register_coupon))
        .route("/api/coupons/preview", post(handlers::coupons::preview_coupon))
        .route("/api/subscriptions", post(handlers::subscriptions::subscribe))
        .route("/api/subscriptions/me", get(handlers::subscriptions::my_subscription))
        .route(
            "/api/subscriptions/me/cancel",
            post(handlers::subscriptions::cancel_subscription),
        )
        .route("/api/notifications", get(handlers::notifications::list_notifications))
        .route(
            "/api/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route("/api/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route("/api/notifications/events", get(handlers::notifications::events_stream))
        .route("/api/notifications/:id/read", post(handlers::notifications::mark_read))
        .route("/api/terms/agree", post(handlers::terms::agree))
        .route("/api/terms/missing", get(handlers::terms::missing_terms))
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/login", post(admin::session::login))
        .route("/api/admin/logout", post(admin::session::logout))
        .route("/api/admin/me", get(admin::session::me))
        .route("/api/admin/dashboard", get(admin::session::dashboard))
        .route(
            "/api/admin/admins",
            get(admin::session::list_admins).post(admin::session::create_admin),
        )
        .route("/api/admin/admins/:id", delete(admin::session::deactivate_admin))
        .route(
            "/api/admin/products",
            get(admin::catalog::list_products).post(admin::catalog::create_product),
        )
        .route(
            "/api/admin/products/:id",
            put(admin::catalog::update_product).delete(admin::catalog::delete_product),
        )
        .route("/api/admin/orders", get(admin::orders::list_orders))
        .route("/api/admin/orders/:id", get(admin::orders::get_order))
        .route("/api/admin/orders/:id/status", post(admin::orders::update_order_status))
        .route("/api/admin/payments/:id/confirm", post(admin::orders::confirm_payment))
        .route("/api/admin/payments/:id/refund", post(admin::orders::refund_payment))
        .route(
            "/api/admin/coupons",
            get(admin::promotions::list_coupons).post(admin::promotions::create_coupon),
        )
        .route("/api/admin/coupons/:id", put(admin::promotions::update_coupon))
        .route("/api/admin/coupons/:id/issue", post(admin::promotions::issue_coupon))
        .route(
            "/api/admin/banners",
            get(admin::catalog::list_banners).post(admin::catalog::create_banner),
        )
        .route(
            "/api/admin/banners/:id",
            put(admin::catalog::update_banner).delete(admin::catalog::delete_banner),
        )
        .route(
            "/api/admin/subscription-plans",
            get(admin::catalog::list_plans).post(admin::catalog::create_plan),
        )
        .route(
            "/api/admin/subscription-plans/:id",
            put(admin::catalog::update_plan),
        )
        .route(
            "/api/admin/terms",
            get(admin::catalog::list_terms).post(admin::catalog::create_term),
        )
}
