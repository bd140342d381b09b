use std::sync::Arc;

use chromadb::client::{ChromaClient, ChromaClientOptions};

use crate::{embedding::embedder_trait::Embedder, vectorstore::VectorStoreError};

use super::Store;

pub const DEFAULT_COLLECTION_NAME: &str = "langchain";
pub const DEFAULT_NAME_SPACE_KEY: &str = "nameSpace";

pub struct StoreBuilder {
    client: Option<ChromaClient>,
    url: Option<String>,
    embedder: Option<Arc<dyn Embedder>>,
    collection_name: String,
    name_space: Option<String>,
    name_space_key: Option<String>,
}

impl StoreBuilder {
    /// Starts from `CHROMA_URL` when it is set.
    pub fn new() -> Self {
        StoreBuilder {
            client: None,
            url: std::env::var("CHROMA_URL").ok(),
            embedder: None,
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            name_space: None,
            name_space_key: None,
        }
    }

    pub fn client(mut self, client: ChromaClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    pub fn collection_name<S: Into<String>>(mut self, name: S) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Scopes every document of this store to `name_space`.
    pub fn name_space<S: Into<String>>(mut self, name_space: S) -> Self {
        self.name_space = Some(name_space.into());
        self
    }

    pub fn name_space_key<S: Into<String>>(mut self, key: S) -> Self {
        self.name_space_key = Some(key.into());
        self
    }

    pub async fn build(self) -> Result<Store, VectorStoreError> {
        let embedder = self
            .embedder
            .ok_or_else(|| VectorStoreError::InvalidParameter("embedder is required".into()))?;
        if self.name_space.is_some() && self.name_space_key.is_none() {
            return Err(VectorStoreError::MissingNamespaceKey);
        }

        let client = match self.client {
            Some(c) => c,
            None => ChromaClient::new(ChromaClientOptions {
                url: self.url,
                ..Default::default()
            })
            .await
            .map_err(|e| VectorStoreError::ApiError {
                task: "connect".into(),
                message: e.to_string(),
            })?,
        };
        let collection = client
            .get_or_create_collection(&self.collection_name, None)
            .await
            .map_err(|e| VectorStoreError::ApiError {
                task: "get_or_create_collection".into(),
                message: e.to_string(),
            })?;

        Ok(Store {
            client,
            collection,
            embedder,
            name_space: self.name_space,
            name_space_key: self.name_space_key,
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
