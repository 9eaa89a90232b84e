use crate::error::{Error, Result};
use crate::scheduler::CronSchedule;
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TIMEZONE: &str = "Europe/London";
pub const DEFAULT_TITLE: &str = "Daily Development Question";
pub const DEFAULT_PUSH_SCHEDULE: &str = "25 12 * * *";
pub const DEFAULT_SMS_SCHEDULE: &str = "00 11 * * *";
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";
pub const TWILIO_API_URL: &str = "https://api.twilio.com";

/// Delivery channel a job feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Push,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => "push",
            Channel::Sms => "sms",
        }
    }

    /// Plain-text body returned by the manual trigger route.
    pub fn acknowledgement(&self) -> &'static str {
        match self {
            Channel::Push => "Triggered Pushover notification!",
            Channel::Sms => "Triggered SMS message!",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" | "pushover" => Ok(Channel::Push),
            "sms" | "twilio" => Ok(Channel::Sms),
            other => Err(Error::config(format!("unknown channel: {other}"))),
        }
    }
}

/// One scheduled pipeline plus the routes that fire it by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub channel: Channel,
    pub schedule: CronSchedule,
    pub trigger_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushSettings {
    pub user_key: Option<String>,
    pub app_token: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsSettings {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub api_url: String,
}

/// Process-wide configuration, loaded once at startup and read-only after.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mongo_uri: Option<String>,
    pub push: PushSettings,
    pub sms: SmsSettings,
    pub port: u16,
    pub timezone: Tz,
    pub title: String,
    pub log_level: String,
    pub jobs: Vec<JobConfig>,
}

impl Settings {
    /// Read settings from the process environment, seeding it from `.env` when present.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &BTreeMap<String, String>) -> Result<Self> {
        let port = match present(vars, "PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| Error::config(format!("PORT is not a valid port: {p}")))?,
            None => DEFAULT_PORT,
        };

        let tz_name = present(vars, "SCHEDULE_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = tz_name
            .parse()
            .map_err(|e| Error::config(format!("unknown timezone {tz_name}: {e}")))?;

        let channels = present(vars, "ENABLED_CHANNELS").unwrap_or_else(|| "push,sms".to_string());
        let mut jobs = Vec::new();
        for name in channels.split(',').filter(|c| !c.trim().is_empty()) {
            let channel: Channel = name.parse()?;
            if jobs.iter().any(|j: &JobConfig| j.channel == channel) {
                continue;
            }
            jobs.push(job_for(vars, channel)?);
        }

        Ok(Settings {
            mongo_uri: present(vars, "MONGO_URI"),
            push: PushSettings {
                user_key: present(vars, "PUSHOVER_USER_KEY"),
                app_token: present(vars, "PUSHOVER_APP_TOKEN"),
                api_url: present(vars, "PUSHOVER_API_URL").unwrap_or_else(|| PUSHOVER_API_URL.to_string()),
            },
            sms: SmsSettings {
                account_sid: present(vars, "TWILIO_ACCOUNT_SID"),
                auth_token: present(vars, "TWILIO_AUTH_TOKEN"),
                from_number: present(vars, "TWILIO_PHONE_NUMBER"),
                to_number: present(vars, "MY_PHONE_NUMBER"),
                api_url: present(vars, "TWILIO_API_URL").unwrap_or_else(|| TWILIO_API_URL.to_string()),
            },
            port,
            timezone,
            title: present(vars, "NOTIFICATION_TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            log_level: present(vars, "LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            jobs,
        })
    }

    pub fn job(&self, channel: Channel) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.channel == channel)
    }

    /// Log which settings are present, never their values.
    pub fn log_summary(&self) {
        info!(
            mongo_uri = self.mongo_uri.is_some(),
            pushover_user_key = self.push.user_key.is_some(),
            pushover_app_token = self.push.app_token.is_some(),
            twilio_account_sid = self.sms.account_sid.is_some(),
            twilio_auth_token = self.sms.auth_token.is_some(),
            twilio_phone_number = self.sms.from_number.is_some(),
            my_phone_number = self.sms.to_number.is_some(),
            "Configuration loaded"
        );
        for job in &self.jobs {
            info!(
                channel = %job.channel,
                schedule = %job.schedule,
                timezone = %self.timezone,
                "Job configured, manual trigger at {}",
                job.trigger_paths.join(", ")
            );
        }
    }
}

fn job_for(vars: &BTreeMap<String, String>, channel: Channel) -> Result<JobConfig> {
    let (key, default, paths) = match channel {
        Channel::Push => ("PUSHOVER_SCHEDULE", DEFAULT_PUSH_SCHEDULE, vec!["/send-test-pushover"]),
        Channel::Sms => (
            "TWILIO_SCHEDULE",
            DEFAULT_SMS_SCHEDULE,
            vec!["/send-test-message", "/send-test-twilio"],
        ),
    };
    let expression = present(vars, key).unwrap_or_else(|| default.to_string());

    Ok(JobConfig {
        channel,
        schedule: expression.parse()?,
        trigger_paths: paths.into_iter().map(String::from).collect(),
    })
}

/// Trimmed value, with blank treated as unset.
fn present(vars: &BTreeMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}
