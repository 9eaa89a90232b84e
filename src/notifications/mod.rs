pub mod pushover;
pub mod twilio;

pub use pushover::{DirectPushSender, NotificationRequest, ProviderResponse, PushDispatcher, PushoverClient};
pub use twilio::{MessageId, SmsDispatcher, TwilioClient};
