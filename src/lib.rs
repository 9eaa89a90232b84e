pub mod configuration;
pub mod error;
pub mod notifications;
pub mod pipeline;
pub mod questions;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub mod traits;

pub use error::{Error, Result};
