//! Outbound SMS for claim decisions. Delivery is best effort: failures are
//! reported as `success = false` and never as an error of the decision.

use crate::config::SmsConfig;
use crate::models::Decision;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsRequest {
    pub phone: String,
    pub item_title: String,
    pub status: Decision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_sid: Option<String>,
}

impl SmsResponse {
    pub fn failed() -> Self {
        Self {
            success: false,
            message_sid: None,
        }
    }

    pub fn sent(message_sid: Option<String>) -> Self {
        Self {
            success: true,
            message_sid,
        }
    }
}

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS service not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait SmsDispatcher: Send + Sync {
    /// Never fails: errors are logged and surface as `success = false`.
    async fn send(&self, request: SmsRequest) -> SmsResponse;
}

pub type SharedSms = std::sync::Arc<dyn SmsDispatcher>;

pub fn compose_message(item_title: &str, status: Decision) -> String {
    match status {
        Decision::Approved => format!(
            "Great news! Your claim for \"{}\" has been APPROVED. The finder will contact you soon for handover. - Lost and Found",
            item_title
        ),
        Decision::Rejected => format!(
            "Unfortunately, your claim for \"{}\" was not approved. Please contact support if you have questions. - Lost and Found",
            item_title
        ),
    }
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: Option<String>,
}

/// Sends through the Twilio Messages REST endpoint.
#[derive(Clone)]
pub struct TwilioDispatcher {
    client: Client,
    config: Option<SmsConfig>,
}

impl TwilioDispatcher {
    pub fn new(config: Option<SmsConfig>) -> Self {
        let timeout = config
            .as_ref()
            .map(|c| c.timeout)
            .unwrap_or(std::time::Duration::from_secs(10));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build SMS HTTP client, using defaults: {}", e);
                Client::new()
            });
        Self { client, config }
    }

    pub fn from_env() -> Self {
        let config = SmsConfig::from_env();
        if config.is_none() {
            tracing::warn!("Twilio credentials not configured, SMS notifications disabled");
        }
        Self::new(config)
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn try_send(&self, request: &SmsRequest) -> Result<Option<String>, SmsError> {
        let cfg = self.config.as_ref().ok_or(SmsError::NotConfigured)?;
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            cfg.api_base, cfg.account_sid
        );
        let body = compose_message(&request.item_title, request.status);
        let params = [
            ("To", request.phone.as_str()),
            ("From", cfg.from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&cfg.account_sid, Some(&cfg.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message: TwilioMessage = response.json().await?;
        Ok(message.sid)
    }
}

#[async_trait]
impl SmsDispatcher for TwilioDispatcher {
    async fn send(&self, request: SmsRequest) -> SmsResponse {
        match self.try_send(&request).await {
            Ok(sid) => {
                tracing::info!(sid = ?sid, "SMS sent for claim on \"{}\"", request.item_title);
                SmsResponse::sent(sid)
            }
            Err(SmsError::NotConfigured) => {
                tracing::debug!("SMS service not configured, skipping");
                SmsResponse::failed()
            }
            Err(e) => {
                tracing::warn!("Failed to send SMS: {}", e);
                SmsResponse::failed()
            }
        }
    }
}
