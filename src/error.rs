use std::fmt::Display;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures a single pipeline run can hit.
///
/// None of these are fatal to the process. They abort the run that produced
/// them and are logged at the run boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (credentials, connection string, numbers).
    #[error("configuration error: {0}")]
    Config(String),

    /// The sampled collection had no documents.
    #[error("no documents found in {database}.{collection}")]
    EmptyCollection {
        database: String,
        collection: String,
    },

    /// Network or connection failure talking to the database or a provider.
    #[error("transport error talking to {target}: {detail}")]
    Transport { target: &'static str, detail: String },

    /// The provider answered but refused the request.
    #[error("{provider} rejected the request (HTTP {status}): {detail}")]
    Rejected {
        provider: &'static str,
        status: u16,
        detail: String,
    },

    /// The provider refused our credentials. Needs an operator, not a retry.
    #[error("{provider} rejected the configured credentials: {detail}")]
    InvalidKey {
        provider: &'static str,
        detail: String,
    },

    /// A response or record could not be understood.
    #[error("malformed data from {origin}: {detail}")]
    Parse { origin: &'static str, detail: String },
}

impl Error {
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }

    pub fn transport(target: &'static str, err: impl Display) -> Self {
        Self::Transport {
            target,
            detail: err.to_string(),
        }
    }

    pub fn parse(origin: &'static str, err: impl Display) -> Self {
        Self::Parse {
            origin,
            detail: err.to_string(),
        }
    }

    /// Stable label used in log fields and metric attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::EmptyCollection { .. } => "empty_collection",
            Self::Transport { .. } => "transport",
            Self::Rejected { .. } => "provider_rejection",
            Self::InvalidKey { .. } => "invalid_key",
            Self::Parse { .. } => "parse",
        }
    }

    /// True when the failure points at configuration rather than a transient fault.
    pub fn is_operator_attention(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidKey { .. })
    }
}
