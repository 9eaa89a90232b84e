use crate::error::{Error, Result};
use crate::traits::SmsSender;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

const PROVIDER: &str = "twilio";
const AUTHENTICATION_FAILED: i64 = 20003;

/// Provider-assigned id of a created message (`SM...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Classify the answer to a message-create call.
pub fn interpret_response(http_status: u16, body: &str) -> Result<MessageId> {
    if (200..300).contains(&http_status) {
        let created: CreatedMessage =
            serde_json::from_str(body).map_err(|e| Error::parse(PROVIDER, e))?;
        return Ok(MessageId(created.sid));
    }

    let parsed: Option<TwilioErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code);
    let detail = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    if http_status == 401 || code == Some(AUTHENTICATION_FAILED) {
        return Err(Error::InvalidKey {
            provider: PROVIDER,
            detail,
        });
    }

    let detail = match code {
        Some(code) => format!("{detail} (code {code})"),
        None => detail,
    };
    Err(Error::Rejected {
        provider: PROVIDER,
        status: http_status,
        detail,
    })
}

/// Client for Twilio's Messages resource, built once at startup.
#[derive(Clone, Debug)]
pub struct TwilioClient {
    http: reqwest::Client,
    api_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(api_url: impl Into<String>, account_sid: Option<&str>, auth_token: Option<&str>) -> Result<Self> {
        let account_sid = account_sid
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config("TWILIO_ACCOUNT_SID is not set"))?;
        let auth_token = auth_token
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config("TWILIO_AUTH_TOKEN is not set"))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to build twilio client: {e}")))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_url, self.account_sid)
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    #[tracing::instrument(name = "twilio_create_message", skip(self, body))]
    async fn create_message(&self, to: &str, from: &str, body: &str) -> Result<MessageId> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| Error::transport(PROVIDER, e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(PROVIDER, e))?;

        interpret_response(status, &text)
    }
}

/// SMS channel: fixed sender and recipient, one create call per send.
#[derive(Clone)]
pub struct SmsDispatcher {
    client: Option<Arc<dyn SmsSender>>,
    to: Option<String>,
    from: Option<String>,
}

impl SmsDispatcher {
    pub fn new(client: Option<Arc<dyn SmsSender>>, to: Option<String>, from: Option<String>) -> Self {
        Self { client, to, from }
    }

    /// Send `body` to the configured recipient.
    ///
    /// A missing client or phone number is a `Config` error and no call is made.
    pub async fn send_sms(&self, body: &str) -> Result<MessageId> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::config("twilio client is not initialized"))?;
        let to = self
            .to
            .as_deref()
            .ok_or_else(|| Error::config("MY_PHONE_NUMBER is not set"))?;
        let from = self
            .from
            .as_deref()
            .ok_or_else(|| Error::config("TWILIO_PHONE_NUMBER is not set"))?;

        match client.create_message(to, from, body).await {
            Ok(id) => {
                info!(sid = %id, "Message sent");
                Ok(id)
            }
            Err(e) => {
                error!(kind = e.kind(), "Failed to send message: {}", e);
                Err(e)
            }
        }
    }
}
