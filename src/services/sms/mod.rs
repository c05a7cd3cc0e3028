pub mod twilio;

use async_trait::async_trait;

#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Development sender: writes the message to the log instead of delivering it.
pub struct LogSmsProvider;

#[async_trait]
impl SmsProvider for LogSmsProvider {
    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, body = %body, "sms delivery disabled, logging message");
        Ok(())
    }
}
