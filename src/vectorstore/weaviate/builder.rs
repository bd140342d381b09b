use std::sync::Arc;

use weaviate_community::WeaviateClient;

use crate::{embedding::embedder_trait::Embedder, vectorstore::VectorStoreError};

use super::Store;

pub const DEFAULT_TEXT_KEY: &str = "text";
pub const DEFAULT_NAME_SPACE_KEY: &str = "nameSpace";
pub const DEFAULT_NAME_SPACE: &str = "default";

/// Builder for a Weaviate store.
///
/// The class must exist with `vectorizer` set to `"none"`; objects are
/// stored with the document metadata as properties plus the text and
/// name space properties.
pub struct StoreBuilder {
    client: Option<WeaviateClient>,
    url: Option<String>,
    api_key: Option<String>,
    class_name: Option<String>,
    text_key: String,
    name_space_key: String,
    name_space: String,
    query_attrs: Vec<String>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl StoreBuilder {
    /// Starts from `WEAVIATE_URL` and `WEAVIATE_API_KEY` when they are set.
    pub fn new() -> Self {
        StoreBuilder {
            client: None,
            url: std::env::var("WEAVIATE_URL").ok(),
            api_key: std::env::var("WEAVIATE_API_KEY").ok(),
            class_name: None,
            text_key: DEFAULT_TEXT_KEY.to_string(),
            name_space_key: DEFAULT_NAME_SPACE_KEY.to_string(),
            name_space: DEFAULT_NAME_SPACE.to_string(),
            query_attrs: Vec::new(),
            embedder: None,
        }
    }

    pub fn client(mut self, client: WeaviateClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn class_name<S: Into<String>>(mut self, name: S) -> Self {
        self.class_name = Some(name.into());
        self
    }

    pub fn text_key<S: Into<String>>(mut self, text_key: S) -> Self {
        self.text_key = text_key.into();
        self
    }

    pub fn name_space_key<S: Into<String>>(mut self, key: S) -> Self {
        self.name_space_key = key.into();
        self
    }

    pub fn name_space<S: Into<String>>(mut self, name_space: S) -> Self {
        self.name_space = name_space.into();
        self
    }

    /// Extra properties to return as metadata from searches.
    pub fn query_attrs(mut self, attrs: Vec<String>) -> Self {
        self.query_attrs = attrs;
        self
    }

    pub fn embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    pub fn build(self) -> Result<Store, VectorStoreError> {
        let class_name = self
            .class_name
            .filter(|c| !c.is_empty())
            .ok_or_else(|| VectorStoreError::InvalidParameter("class_name is required".into()))?;
        let embedder = self
            .embedder
            .ok_or_else(|| VectorStoreError::InvalidParameter("embedder is required".into()))?;
        let client = match self.client {
            Some(c) => c,
            None => {
                let url = self.url.ok_or_else(|| {
                    VectorStoreError::InvalidParameter("url or client is required".into())
                })?;
                let mut builder = WeaviateClient::builder(&url);
                if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
                    builder = builder.with_auth_secret(key);
                }
                builder
                    .build()
                    .map_err(|e| VectorStoreError::InvalidParameter(e.to_string()))?
            }
        };

        let mut query_attrs = vec![self.text_key.clone(), self.name_space_key.clone()];
        for attr in self.query_attrs {
            if !query_attrs.contains(&attr) {
                query_attrs.push(attr);
            }
        }

        Ok(Store {
            client,
            class_name,
            text_key: self.text_key,
            name_space_key: self.name_space_key,
            name_space: self.name_space,
            query_attrs,
            embedder,
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
