use anyhow::Context;
use async_trait::async_trait;

use super::SmsProvider;

pub struct TwilioSmsProvider {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

impl TwilioSmsProvider {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            client: reqwest::Client::new(),
        }
    }
}

/// Twilio expects E.164; local numbers are stored as `010...`.
fn to_e164(phone: &str) -> String {
    match phone.strip_prefix('0') {
        Some(rest) if !phone.starts_with('+') => format!("+82{rest}"),
        _ => phone.to_string(),
    }
}

#[async_trait]
impl SmsProvider for TwilioSmsProvider {
    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let to = to_e164(to);

        self.client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .context("failed to send Twilio SMS")?
            .error_for_status()
            .context("Twilio API returned error")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_numbers_become_e164() {
        assert_eq!(to_e164("01012345678"), "+821012345678");
        assert_eq!(to_e164("+821012345678"), "+821012345678");
    }
}
