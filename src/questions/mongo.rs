use super::{COLLECTION, DATABASE, QuestionRecord};
use crate::error::{Error, Result};
use crate::traits::QuestionSource;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Client;
use mongodb::bson::{Document, doc, from_document};
use tracing::{debug, warn};

/// MongoDB-backed question source.
///
/// Every sample opens its own client and shuts it down before returning, so
/// concurrent runs never share connection state.
#[derive(Clone, Debug)]
pub struct MongoQuestionSource {
    uri: Option<String>,
}

impl MongoQuestionSource {
    pub fn new(uri: Option<String>) -> Self {
        Self { uri }
    }
}

#[async_trait]
impl QuestionSource for MongoQuestionSource {
    #[tracing::instrument(name = "mongo_sample", skip(self))]
    async fn sample(&self) -> Result<Option<QuestionRecord>> {
        let Some(uri) = self.uri.as_deref() else {
            warn!("No MONGO_URI configured");
            return Err(Error::config("MONGO_URI is not set"));
        };

        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| Error::transport("mongodb", e))?;
        debug!("Connected to mongodb");

        let result = sample_one(&client).await;

        // Cursors from `sample_one` are dropped by now, so shutdown will not wait on them.
        client.shutdown().await;
        debug!("Closed mongodb connection");

        result
    }
}

async fn sample_one(client: &Client) -> Result<Option<QuestionRecord>> {
    let collection = client.database(DATABASE).collection::<Document>(COLLECTION);

    let mut cursor = collection
        .aggregate([doc! { "$sample": { "size": 1 } }])
        .await
        .map_err(|e| Error::transport("mongodb", e))?;

    let Some(document) = cursor
        .try_next()
        .await
        .map_err(|e| Error::transport("mongodb", e))?
    else {
        return Ok(None);
    };

    from_document::<QuestionRecord>(document)
        .map(Some)
        .map_err(|e| Error::parse("mongodb", e))
}
