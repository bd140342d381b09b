use std::sync::Arc;

use reqwest::Client;
use secrecy::SecretString;

use crate::{embedding::embedder_trait::Embedder, vectorstore::VectorStoreError};

use super::Store;

pub const DEFAULT_TEXT_KEY: &str = "text";
pub const DEFAULT_API_VERSION: &str = "2024-07";

pub struct StoreBuilder {
    client: Option<Client>,
    api_key: Option<String>,
    host: Option<String>,
    name_space: String,
    text_key: String,
    api_version: String,
    embedder: Option<Arc<dyn Embedder>>,
}

impl StoreBuilder {
    /// Starts from `PINECONE_API_KEY` and `PINECONE_HOST` when they are set.
    pub fn new() -> Self {
        StoreBuilder {
            client: None,
            api_key: std::env::var("PINECONE_API_KEY").ok(),
            host: std::env::var("PINECONE_HOST").ok(),
            name_space: String::new(),
            text_key: DEFAULT_TEXT_KEY.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            embedder: None,
        }
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Index host, e.g. `my-index-abc123.svc.us-east1-gcp.pinecone.io`.
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn name_space<S: Into<String>>(mut self, name_space: S) -> Self {
        self.name_space = name_space.into();
        self
    }

    pub fn text_key<S: Into<String>>(mut self, text_key: S) -> Self {
        self.text_key = text_key.into();
        self
    }

    pub fn api_version<S: Into<String>>(mut self, api_version: S) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    pub fn build(self) -> Result<Store, VectorStoreError> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VectorStoreError::InvalidParameter("api_key is required".into()))?;
        let host = self
            .host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| VectorStoreError::InvalidParameter("host is required".into()))?;
        let embedder = self
            .embedder
            .ok_or_else(|| VectorStoreError::InvalidParameter("embedder is required".into()))?;

        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };
        let host = url::Url::parse(&host)
            .map_err(|e| VectorStoreError::InvalidParameter(format!("invalid host: {}", e)))?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        Ok(Store {
            client: self.client.unwrap_or_default(),
            api_key: SecretString::from(api_key),
            host,
            api_version: self.api_version,
            name_space: self.name_space,
            text_key: self.text_key,
            embedder,
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
