use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use kalgot::config::AppConfig;
use kalgot::db;
use kalgot::services::address::JusoAddressLookup;
use kalgot::services::admin::bootstrap_super_admin;
use kalgot::services::sms::twilio::TwilioSmsProvider;
use kalgot::services::sms::{LogSmsProvider, SmsProvider};
use kalgot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    bootstrap_super_admin(&conn, &config).map_err(|e| anyhow::anyhow!("admin bootstrap failed: {e}"))?;
    let expired = db::queries::expire_old_sessions(&conn)?;
    if expired > 0 {
        tracing::info!(expired, "removed expired sessions");
    }

    let sms: Box<dyn SmsProvider> = if config.twilio_account_sid.is_empty() {
        tracing::warn!("TWILIO_ACCOUNT_SID not set, OTP codes will only be logged");
        Box::new(LogSmsProvider)
    } else {
        tracing::info!("using Twilio SMS provider (from: {})", config.twilio_phone_number);
        Box::new(TwilioSmsProvider::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_phone_number.clone(),
        ))
    };
    if config.address_api_key.is_empty() {
        tracing::warn!("ADDRESS_API_KEY not set, address search will fail");
    }
    let address = JusoAddressLookup::new(config.address_api_url.clone(), config.address_api_key.clone());

    let (notifications_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        sms,
        address: Box::new(address),
        notifications_tx,
    });

    let app = kalgot::app::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
