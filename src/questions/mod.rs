pub mod mongo;

pub use mongo::MongoQuestionSource;

use crate::error::{Error, Result};
use crate::traits::QuestionSource;
use serde::Deserialize;
use tracing::{debug, info};

pub const DATABASE: &str = "test";
pub const COLLECTION: &str = "questions";

/// One stored question. Only the text is read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionRecord {
    #[serde(rename = "questionText")]
    pub question_text: Option<String>,
}

impl QuestionRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            question_text: Some(text.into()),
        }
    }
}

/// Pull one random question's text.
///
/// An empty collection is `EmptyCollection`; a sampled record without usable
/// text is `Parse`. Never returns an empty string.
#[tracing::instrument(name = "fetch_random_question", skip(source))]
pub async fn fetch_random_question(source: &dyn QuestionSource) -> Result<String> {
    let result = match source.sample().await {
        Ok(Some(record)) => match record.question_text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(Error::parse(
                "mongodb",
                format!("sampled document in {DATABASE}.{COLLECTION} has no questionText"),
            )),
        },
        Ok(None) => Err(Error::EmptyCollection {
            database: DATABASE.to_string(),
            collection: COLLECTION.to_string(),
        }),
        Err(e) => Err(e),
    };

    match &result {
        Ok(_) => info!("Fetched a random question"),
        // Reported once, at the pipeline run boundary
        Err(e) => debug!(kind = e.kind(), "No question fetched: {}", e),
    }
    result
}
