use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    Client, Collection, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::schemas::{ChatMessageModel, Message};

use super::{ChatMessageHistory, MemoryError};

pub const DEFAULT_DATABASE: &str = "chat_history";
pub const DEFAULT_COLLECTION: &str = "message_store";

const SESSION_ID_KEY: &str = "SessionId";

/// One stored message; `History` holds a serialized [`ChatMessageModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessageDocument {
    #[serde(rename = "SessionId")]
    session_id: String,
    #[serde(rename = "History")]
    history: String,
}

pub struct MongoHistoryBuilder {
    url: Option<String>,
    client: Option<Client>,
    session_id: Option<String>,
    database_name: String,
    collection_name: String,
}

impl Default for MongoHistoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MongoHistoryBuilder {
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
            session_id: None,
            database_name: DEFAULT_DATABASE.into(),
            collection_name: DEFAULT_COLLECTION.into(),
        }
    }

    pub fn url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn database_name<S: Into<String>>(mut self, name: S) -> Self {
        self.database_name = name.into();
        self
    }

    pub fn collection_name<S: Into<String>>(mut self, name: S) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Connects and makes sure the collection is indexed by session id.
    pub async fn build(self) -> Result<MongoChatMessageHistory, MemoryError> {
        let session_id = self
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MemoryError::InvalidConfiguration("session id is required".into()))?;
        let client = match (self.client, self.url) {
            (Some(client), _) => client,
            (None, Some(url)) => Client::with_uri_str(&url).await?,
            (None, None) => {
                return Err(MemoryError::InvalidConfiguration(
                    "either a url or a client is required".into(),
                ))
            }
        };

        let collection = client
            .database(&self.database_name)
            .collection::<ChatMessageDocument>(&self.collection_name);
        let index = IndexModel::builder()
            .keys(doc! { SESSION_ID_KEY: 1 })
            .build();
        collection.create_index(index, None).await?;

        Ok(MongoChatMessageHistory {
            collection,
            session_id,
        })
    }
}

/// Chat history stored in a MongoDB collection, one document per message.
pub struct MongoChatMessageHistory {
    collection: Collection<ChatMessageDocument>,
    session_id: String,
}

impl MongoChatMessageHistory {
    pub fn builder() -> MongoHistoryBuilder {
        MongoHistoryBuilder::new()
    }

    fn session_filter(&self) -> Document {
        doc! { SESSION_ID_KEY: &self.session_id }
    }

    fn to_document(&self, message: &Message) -> Result<ChatMessageDocument, MemoryError> {
        Ok(ChatMessageDocument {
            session_id: self.session_id.clone(),
            history: serde_json::to_string(&ChatMessageModel::from(message))?,
        })
    }
}

#[async_trait]
impl ChatMessageHistory for MongoChatMessageHistory {
    async fn messages(&self) -> Result<Vec<Message>, MemoryError> {
        let documents: Vec<ChatMessageDocument> = self
            .collection
            .find(self.session_filter(), None)
            .await?
            .try_collect()
            .await?;
        documents
            .into_iter()
            .map(|d| {
                let model: ChatMessageModel = serde_json::from_str(&d.history)?;
                model
                    .to_message()
                    .ok_or(MemoryError::InvalidMessageType(model.message_type))
            })
            .collect()
    }

    async fn add_message(&self, message: Message) -> Result<(), MemoryError> {
        let document = self.to_document(&message)?;
        self.collection.insert_one(document, None).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.collection
            .delete_many(self.session_filter(), None)
            .await?;
        Ok(())
    }

    async fn set_messages(&self, messages: Vec<Message>) -> Result<(), MemoryError> {
        let documents = messages
            .iter()
            .map(|m| self.to_document(m))
            .collect::<Result<Vec<_>, _>>()?;
        self.clear().await?;
        if !documents.is_empty() {
            self.collection.insert_many(documents, None).await?;
        }
        Ok(())
    }
}
