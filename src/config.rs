use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub session_ttl_days: i64,
    pub cookie_secure: bool,
    pub otp_secret: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub address_api_url: String,
    pub address_api_key: String,
    pub payment_checkout_url: String,
    pub payment_webhook_secret: String,
    pub bank_name: String,
    pub bank_account_number: String,
    pub bank_account_holder: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "kalgot.db".to_string()),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            otp_secret: env::var("OTP_SECRET").unwrap_or_else(|_| "dev-otp-secret".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            address_api_url: env::var("ADDRESS_API_URL")
                .unwrap_or_else(|_| "https://business.juso.go.kr/addrlink/addrLinkApi.do".to_string()),
            address_api_key: env::var("ADDRESS_API_KEY").unwrap_or_default(),
            payment_checkout_url: env::var("PAYMENT_CHECKOUT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/checkout".to_string()),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET").unwrap_or_default(),
            bank_name: env::var("BANK_NAME").unwrap_or_else(|_| "국민은행".to_string()),
            bank_account_number: env::var("BANK_ACCOUNT_NUMBER").unwrap_or_default(),
            bank_account_holder: env::var("BANK_ACCOUNT_HOLDER")
                .unwrap_or_else(|_| "칼가는곳".to_string()),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_default(),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_default(),
        }
    }
}
