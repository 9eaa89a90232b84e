use crate::error::{Error, Result};
use crate::traits::PushSender;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

const PROVIDER: &str = "pushover";

pub const SOUND: &str = "magic";
pub const PRIORITY: i32 = 0;

/// A single push notification, built fresh for every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRequest {
    pub message: String,
    pub title: String,
    pub sound: String,
    pub priority: i32,
}

impl NotificationRequest {
    pub fn new(message: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: title.into(),
            sound: SOUND.to_string(),
            priority: PRIORITY,
        }
    }
}

/// What Pushover tells us about an accepted message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderResponse {
    pub status: i64,
    pub request: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushoverBody {
    status: i64,
    request: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
    token: Option<String>,
    user: Option<String>,
}

#[derive(Serialize)]
struct PushoverForm<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
    sound: &'a str,
    priority: i32,
}

/// Classify a Pushover answer. Accepted only on HTTP 200 with `status == 1`.
pub fn interpret_response(http_status: u16, body: &str) -> Result<ProviderResponse> {
    let parsed: PushoverBody = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) if http_status == 200 => return Err(Error::parse(PROVIDER, e)),
        Err(_) => {
            return Err(Error::Rejected {
                provider: PROVIDER,
                status: http_status,
                detail: body.chars().take(200).collect(),
            });
        }
    };

    let detail = if parsed.errors.is_empty() {
        format!("status {}", parsed.status)
    } else {
        parsed.errors.join("; ")
    };

    if parsed.token.as_deref() == Some("invalid") || parsed.user.as_deref() == Some("invalid") {
        return Err(Error::InvalidKey {
            provider: PROVIDER,
            detail,
        });
    }

    if http_status == 200 && parsed.status == 1 {
        return Ok(ProviderResponse {
            status: parsed.status,
            request: parsed.request,
        });
    }

    Err(Error::Rejected {
        provider: PROVIDER,
        status: http_status,
        detail,
    })
}

async fn post_form(
    client: &reqwest::Client,
    endpoint: &str,
    user: &str,
    token: &str,
    request: &NotificationRequest,
) -> Result<ProviderResponse> {
    let form = PushoverForm {
        token,
        user,
        title: &request.title,
        message: &request.message,
        sound: &request.sound,
        priority: request.priority,
    };

    let response = client
        .post(endpoint)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::transport(PROVIDER, e))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| Error::transport(PROVIDER, e))?;

    interpret_response(status, &body)
}

fn required(value: Option<&str>, name: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| Error::config(format!("{name} is not set")))
}

/// One-shot raw form POST to the Pushover endpoint.
#[derive(Clone, Debug)]
pub struct DirectPushSender {
    endpoint: String,
    user_key: Option<String>,
    app_token: Option<String>,
}

impl DirectPushSender {
    pub fn new(endpoint: impl Into<String>, user_key: Option<String>, app_token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_key,
            app_token,
        }
    }
}

#[async_trait]
impl PushSender for DirectPushSender {
    fn strategy(&self) -> &'static str {
        "direct"
    }

    #[tracing::instrument(name = "pushover_direct_send", skip(self, request))]
    async fn send(&self, request: &NotificationRequest) -> Result<ProviderResponse> {
        // Checked before any connection is made
        let user = required(self.user_key.as_deref(), "PUSHOVER_USER_KEY")?;
        let token = required(self.app_token.as_deref(), "PUSHOVER_APP_TOKEN")?;

        let client = reqwest::Client::new();
        post_form(&client, &self.endpoint, &user, &token, request).await
    }
}

/// Long-lived Pushover client, built once at startup and shared by reference.
#[derive(Clone, Debug)]
pub struct PushoverClient {
    http: reqwest::Client,
    endpoint: String,
    user_key: String,
    app_token: String,
}

impl PushoverClient {
    pub fn new(endpoint: impl Into<String>, user_key: Option<&str>, app_token: Option<&str>) -> Result<Self> {
        let user_key = required(user_key, "PUSHOVER_USER_KEY")?;
        let app_token = required(app_token, "PUSHOVER_APP_TOKEN")?;

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to build pushover client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            user_key,
            app_token,
        })
    }
}

#[async_trait]
impl PushSender for PushoverClient {
    fn strategy(&self) -> &'static str {
        "client"
    }

    #[tracing::instrument(name = "pushover_client_send", skip(self, request))]
    async fn send(&self, request: &NotificationRequest) -> Result<ProviderResponse> {
        post_form(&self.http, &self.endpoint, &self.user_key, &self.app_token, request).await
    }
}

/// Push channel: the primary strategy with at most one fallback attempt.
#[derive(Clone)]
pub struct PushDispatcher {
    primary: Arc<dyn PushSender>,
    fallback: Option<Arc<dyn PushSender>>,
}

impl PushDispatcher {
    pub fn new(primary: Arc<dyn PushSender>, fallback: Option<Arc<dyn PushSender>>) -> Self {
        Self { primary, fallback }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Deliver through the primary strategy, falling back once if it fails.
    ///
    /// The error returned is the last one seen; the primary's error is logged.
    pub async fn send_push(&self, message: &str, title: &str) -> Result<ProviderResponse> {
        let request = NotificationRequest::new(message, title);

        let primary_err = match self.primary.send(&request).await {
            Ok(response) => {
                info!(
                    strategy = self.primary.strategy(),
                    request = response.request.as_deref().unwrap_or_default(),
                    "Pushover notification sent"
                );
                return Ok(response);
            }
            Err(e) => e,
        };

        log_failure(self.primary.strategy(), &primary_err);

        let Some(fallback) = &self.fallback else {
            return Err(primary_err);
        };

        warn!(
            from = self.primary.strategy(),
            to = fallback.strategy(),
            "Falling back to secondary push strategy"
        );
        match fallback.send(&request).await {
            Ok(response) => {
                info!(
                    strategy = fallback.strategy(),
                    request = response.request.as_deref().unwrap_or_default(),
                    "Pushover notification sent"
                );
                Ok(response)
            }
            Err(e) => {
                log_failure(fallback.strategy(), &e);
                Err(e)
            }
        }
    }
}

fn log_failure(strategy: &str, err: &Error) {
    if err.is_operator_attention() {
        error!(strategy, kind = err.kind(), "Pushover send needs operator attention: {}", err);
    } else {
        warn!(strategy, kind = err.kind(), "Pushover send failed: {}", err);
    }
}
