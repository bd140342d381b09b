use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    embedding::embedder_trait::Embedder,
    schemas::Document,
    vectorstore::{VecStoreOptions, VectorStore, VectorStoreError, VectorStoreHelpers},
};

/// Pinecone index accessed through its data-plane REST API.
pub struct Store {
    pub(super) client: Client,
    pub(super) api_key: SecretString,
    pub(super) host: String,
    pub(super) api_version: String,
    pub(super) name_space: String,
    pub(super) text_key: String,
    pub(super) embedder: Arc<dyn Embedder>,
}

pub type PineconeOptions = VecStoreOptions<Value>;

#[derive(Serialize, Debug)]
struct UpsertVector {
    id: String,
    values: Vec<f32>,
    metadata: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
struct QueryMatch {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize, Debug)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

impl Store {
    pub fn name_space(&self) -> &str {
        &self.name_space
    }

    pub fn text_key(&self) -> &str {
        &self.text_key
    }

    fn resolve_name_space(&self, opt: &PineconeOptions) -> String {
        opt.name_space
            .clone()
            .unwrap_or_else(|| self.name_space.clone())
    }

    async fn post(&self, task: &str, path: &str, body: Value) -> Result<String, VectorStoreError> {
        let res = self
            .client
            .post(format!("{}/{}", self.host, path))
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", &self.api_version)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            log::debug!("pinecone {} returned {}: {}", task, status, text);
            return Err(VectorStoreError::ApiError {
                task: task.to_string(),
                message: format!("status {}: {}", status.as_u16(), text),
            });
        }
        Ok(text)
    }

    fn match_to_document(&self, m: QueryMatch) -> Result<Document, VectorStoreError> {
        let mut metadata: HashMap<String, Value> = m.metadata.unwrap_or_default().into_iter().collect();
        let page_content = match metadata.remove(&self.text_key) {
            Some(Value::String(text)) => text,
            _ => return Err(VectorStoreError::MissingTextKey),
        };
        Ok(Document {
            page_content,
            metadata,
            score: m.score,
        })
    }
}

#[async_trait]
impl VectorStore for Store {
    type Options = PineconeOptions;

    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &PineconeOptions,
    ) -> Result<Vec<String>, VectorStoreError> {
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let texts = VectorStoreHelpers::extract_texts(docs);
        let vectors = embedder.embed_documents(&texts).await?;
        VectorStoreHelpers::validate_documents_vectors(docs, &vectors)?;

        let ids: Vec<String> = docs
            .iter()
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        let upserts: Vec<UpsertVector> = ids
            .iter()
            .zip(docs)
            .zip(vectors)
            .map(|((id, doc), values)| {
                let mut metadata: Map<String, Value> = doc
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                metadata.insert(self.text_key.clone(), Value::String(doc.page_content.clone()));
                UpsertVector {
                    id: id.clone(),
                    values: values.into_iter().map(|x| x as f32).collect(),
                    metadata,
                }
            })
            .collect();

        self.post(
            "upsert",
            "vectors/upsert",
            json!({
                "vectors": upserts,
                "namespace": self.resolve_name_space(opt),
            }),
        )
        .await?;
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &PineconeOptions,
    ) -> Result<Vec<Document>, VectorStoreError> {
        VectorStoreHelpers::validate_score_threshold(opt.score_threshold)?;
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let vector: Vec<f32> = embedder
            .embed_query(query)
            .await?
            .into_iter()
            .map(|x| x as f32)
            .collect();

        let mut body = json!({
            "includeValues": true,
            "includeMetadata": true,
            "vector": vector,
            "topK": limit,
            "namespace": self.resolve_name_space(opt),
        });
        if let Some(filter) = &opt.filters {
            body["filter"] = filter.clone();
        }

        let text = self.post("query", "query", body).await?;
        let response: QueryResponse = serde_json::from_str(&text)?;
        if response.matches.is_empty() {
            return Err(VectorStoreError::EmptyResponse);
        }

        let docs = response
            .matches
            .into_iter()
            .map(|m| self.match_to_document(m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VectorStoreHelpers::apply_score_threshold(
            docs,
            opt.score_threshold,
        ))
    }

    async fn delete(&self, ids: &[String], opt: &PineconeOptions) -> Result<(), VectorStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.post(
            "delete",
            "vectors/delete",
            json!({
                "ids": ids,
                "namespace": self.resolve_name_space(opt),
            }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::{embedding::EmbedderError, vectorstore::pinecone::StoreBuilder};

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
            Ok(documents.iter().map(|_| vec![0.5, 0.5]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f64>, EmbedderError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn store(url: &str) -> Store {
        StoreBuilder::new()
            .api_key("pc-key")
            .host(url)
            .name_space("default-ns")
            .embedder(FixedEmbedder)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_fields() {
        assert!(StoreBuilder::new()
            .api_key("")
            .host("h")
            .embedder(FixedEmbedder)
            .build()
            .is_err());
        let store = StoreBuilder::new()
            .api_key("k")
            .host("my-index.svc.pinecone.io")
            .embedder(FixedEmbedder)
            .build()
            .unwrap();
        assert_eq!(store.host, "https://my-index.svc.pinecone.io");
        assert_eq!(store.text_key(), "text");
    }

    #[tokio::test]
    async fn test_add_documents_upserts_with_text_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vectors/upsert")
            .match_header("api-key", "pc-key")
            .match_body(Matcher::PartialJson(json!({
                "namespace": "custom",
                "vectors": [{"values": [0.5, 0.5], "metadata": {"text": "hello", "lang": "en"}}]
            })))
            .with_status(200)
            .with_body(r#"{"upsertedCount":1}"#)
            .create_async()
            .await;

        let doc = Document::new("hello")
            .with_metadata(HashMap::from([("lang".to_string(), json!("en"))]));
        let ids = store(&server.url())
            .add_documents(&[doc], &PineconeOptions::new().with_name_space("custom"))
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_similarity_search_threshold() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query")
            .match_body(Matcher::PartialJson(json!({
                "topK": 2,
                "namespace": "default-ns",
                "includeMetadata": true,
                "filter": {"lang": {"$eq": "en"}}
            })))
            .with_status(200)
            .with_body(
                json!({"matches": [
                    {"id": "a", "score": 0.9, "metadata": {"text": "close", "lang": "en"}},
                    {"id": "b", "score": 0.2, "metadata": {"text": "far", "lang": "en"}}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let docs = store(&server.url())
            .similarity_search(
                "query",
                2,
                &PineconeOptions::new()
                    .with_score_threshold(0.5)
                    .with_filters(json!({"lang": {"$eq": "en"}})),
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page_content, "close");
        assert_eq!(docs[0].metadata.get("lang"), Some(&json!("en")));
        assert!(docs[0].metadata.get("text").is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_similarity_search_errors() {
        let mut server = mockito::Server::new_async().await;
        let empty = server
            .mock("POST", "/query")
            .with_status(200)
            .with_body(r#"{"matches":[]}"#)
            .expect(1)
            .create_async()
            .await;
        let err = store(&server.url())
            .similarity_search("q", 1, &PineconeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::EmptyResponse));
        empty.remove_async().await;

        let _missing = server
            .mock("POST", "/query")
            .with_status(200)
            .with_body(r#"{"matches":[{"id":"a","score":0.9,"metadata":{"other":"x"}}]}"#)
            .create_async()
            .await;
        let err = store(&server.url())
            .similarity_search("q", 1, &PineconeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::MissingTextKey));
    }

    #[tokio::test]
    async fn test_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/vectors/delete")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let err = store(&server.url())
            .delete(&["a".to_string()], &PineconeOptions::default())
            .await
            .unwrap_err();
        match err {
            VectorStoreError::ApiError { task, message } => {
                assert_eq!(task, "delete");
                assert!(message.contains("403"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
