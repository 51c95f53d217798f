use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SmsConfig {
    /// Read Twilio credentials from the environment.
    /// Returns None when any credential is missing; SMS sending then reports
    /// failure without making a network call.
    pub fn from_env() -> Option<Self> {
        let account_sid = non_empty("TWILIO_ACCOUNT_SID")?;
        let auth_token = non_empty("TWILIO_AUTH_TOKEN")?;
        let from_number = non_empty("TWILIO_PHONE_NUMBER")?;
        let api_base = env::var("TWILIO_API_BASE")
            .unwrap_or_else(|_| "https://api.twilio.com".to_string());
        let timeout_secs: u64 = env::var("SMS_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Some(Self {
            account_sid,
            auth_token,
            from_number,
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}
