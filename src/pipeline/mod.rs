use crate::configuration::{Channel, Settings};
use crate::error::{Error, Result};
use crate::notifications::{
    DirectPushSender, MessageId, ProviderResponse, PushDispatcher, PushoverClient, SmsDispatcher, TwilioClient,
};
use crate::questions::{MongoQuestionSource, fetch_random_question};
use crate::traits::{PushSender, QuestionSource, SmsSender};
use opentelemetry::{KeyValue, global};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Result of one pipeline run. Logged and counted, never persisted.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Pushed(ProviderResponse),
    Texted(MessageId),
    Failed { channel: Channel, error: Error },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        !matches!(self, DeliveryOutcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            DeliveryOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Failed { error, .. } => error.kind(),
            _ => "delivered",
        }
    }
}

/// Everything one fetch-then-dispatch run needs, injected once at startup.
///
/// Shared across runs behind an `Arc`; nothing in it is mutated after construction.
pub struct Pipeline {
    source: Arc<dyn QuestionSource>,
    push: Option<PushDispatcher>,
    sms: Option<SmsDispatcher>,
    title: String,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn QuestionSource>,
        push: Option<PushDispatcher>,
        sms: Option<SmsDispatcher>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source,
            push,
            sms,
            title: title.into(),
        }
    }

    /// Wire the production collaborators from settings.
    ///
    /// Provider clients that cannot be built are logged and left out; sends
    /// through them later fail with a `Config` error.
    pub fn from_settings(settings: &Settings) -> Self {
        let source: Arc<dyn QuestionSource> = Arc::new(MongoQuestionSource::new(settings.mongo_uri.clone()));

        let direct: Arc<dyn PushSender> = Arc::new(DirectPushSender::new(
            settings.push.api_url.clone(),
            settings.push.user_key.clone(),
            settings.push.app_token.clone(),
        ));
        let fallback = match PushoverClient::new(
            settings.push.api_url.clone(),
            settings.push.user_key.as_deref(),
            settings.push.app_token.as_deref(),
        ) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn PushSender>),
            Err(e) => {
                error!("Pushover client not initialized: {}", e);
                None
            }
        };

        let twilio = match TwilioClient::new(
            settings.sms.api_url.clone(),
            settings.sms.account_sid.as_deref(),
            settings.sms.auth_token.as_deref(),
        ) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn SmsSender>),
            Err(e) => {
                error!("Twilio client not initialized: {}", e);
                None
            }
        };

        Self::new(
            source,
            Some(PushDispatcher::new(direct, fallback)),
            Some(SmsDispatcher::new(
                twilio,
                settings.sms.to_number.clone(),
                settings.sms.from_number.clone(),
            )),
            settings.title.clone(),
        )
    }

    /// One complete run. Every failure is caught here and reported in the outcome.
    pub async fn run(&self, channel: Channel) -> DeliveryOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id, %channel);

        async move {
            info!("Pipeline run started");
            let outcome = match self.deliver(channel).await {
                Ok(outcome) => outcome,
                Err(error) => DeliveryOutcome::Failed { channel, error },
            };

            match &outcome {
                DeliveryOutcome::Failed { error, .. } if error.is_operator_attention() => {
                    error!(kind = error.kind(), "Pipeline run failed, check configuration: {}", error)
                }
                DeliveryOutcome::Failed { error, .. } => {
                    warn!(kind = error.kind(), "Pipeline run failed: {}", error)
                }
                _ => info!("Pipeline run delivered"),
            }
            record(channel, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    /// Fire-and-forget: start a detached run and return immediately.
    ///
    /// At-most-once with no confirmation to the caller; the outcome is only
    /// visible in logs and metrics.
    pub fn spawn(self: &Arc<Self>, channel: Channel) -> JoinHandle<DeliveryOutcome> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(channel).await })
    }

    async fn deliver(&self, channel: Channel) -> Result<DeliveryOutcome> {
        // Checked before touching the database so a misconfigured channel costs nothing
        match channel {
            Channel::Push if self.push.is_none() => return Err(Error::config("push channel is not configured")),
            Channel::Sms if self.sms.is_none() => return Err(Error::config("sms channel is not configured")),
            _ => {}
        }

        let question = fetch_random_question(self.source.as_ref()).await?;

        match (channel, &self.push, &self.sms) {
            (Channel::Push, Some(push), _) => push
                .send_push(&question, &self.title)
                .await
                .map(DeliveryOutcome::Pushed),
            (Channel::Sms, _, Some(sms)) => sms.send_sms(&question).await.map(DeliveryOutcome::Texted),
            _ => Err(Error::config(format!("{channel} channel is not configured"))),
        }
    }
}

fn record(channel: Channel, outcome: &DeliveryOutcome) {
    let meter = global::meter(env!("CARGO_PKG_NAME"));
    let counter = meter
        .u64_counter("notifier.pipeline.runs")
        .with_description("Completed pipeline runs by channel and outcome")
        .build();
    counter.add(
        1,
        &[
            KeyValue::new("channel", channel.as_str()),
            KeyValue::new("outcome", outcome.label()),
        ],
    );
}
