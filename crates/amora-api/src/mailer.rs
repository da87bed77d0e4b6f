use anyhow::{Result, bail};
use serde_json::json;
use tracing::info;

/// OTP dispatch over an HTTP mail API.
///
/// Delivery failure is never fatal to signup or resend — the caller reports
/// `email_sent: false` and hands the code back through the debug channel.
pub struct Mailer {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: std::env::var("AMORA_MAIL_API_URL").ok(),
            api_key: std::env::var("AMORA_MAIL_API_KEY").unwrap_or_default(),
            from: std::env::var("AMORA_MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@amora.app".into()),
        }
    }

    pub async fn send_verification_code(&self, to: &str, code: &str) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            bail!("mail dispatch not configured (AMORA_MAIL_API_URL unset)");
        };

        let resp = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": "Your Amora verification code",
                "text": format!(
                    "Your verification code is {}. Requesting a new code invalidates this one.",
                    code
                ),
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("mail API returned {}", resp.status());
        }

        info!("Verification code dispatched to {}", to);
        Ok(())
    }
}
