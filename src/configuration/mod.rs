pub mod settings;

pub use settings::{Channel, JobConfig, PushSettings, Settings, SmsSettings};
