use crate::error::Result;
use crate::notifications::{MessageId, NotificationRequest, ProviderResponse};
use crate::questions::QuestionRecord;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Trait for pulling one pseudo-random question out of storage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Sample a single record, `None` when the collection is empty
    async fn sample(&self) -> Result<Option<QuestionRecord>>;
}

/// Trait for delivering a push notification through one strategy
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Short name used in logs to tell strategies apart
    fn strategy(&self) -> &'static str;

    /// Deliver the notification, succeeding only on a confirmed provider acceptance
    async fn send(&self, request: &NotificationRequest) -> Result<ProviderResponse>;
}

/// Trait for the telephony provider's message-create call
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Create an outbound message, returning the provider-assigned id
    async fn create_message(&self, to: &str, from: &str, body: &str) -> Result<MessageId>;
}
