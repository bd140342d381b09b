use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use uuid::Uuid;
use weaviate_community::collections::objects::{Object, ObjectBuilder};
use weaviate_community::collections::query::GetBuilder;
use weaviate_community::WeaviateClient;

use crate::{
    embedding::embedder_trait::Embedder,
    schemas::Document,
    vectorstore::{VecStoreOptions, VectorStore, VectorStoreError, VectorStoreHelpers},
};

use super::graphql::to_graphql;

pub struct Store {
    pub(super) client: WeaviateClient,
    pub(super) class_name: String,
    pub(super) text_key: String,
    pub(super) name_space_key: String,
    pub(super) name_space: String,
    pub(super) query_attrs: Vec<String>,
    pub(super) embedder: Arc<dyn Embedder>,
}

/// Filters are a Weaviate `where` clause, either as JSON or as a raw GraphQL string.
pub type WeaviateOptions = VecStoreOptions<Value>;

fn api_error(task: &str, e: impl std::fmt::Display) -> VectorStoreError {
    VectorStoreError::ApiError {
        task: task.to_string(),
        message: e.to_string(),
    }
}

impl Store {
    fn resolve_name_space(&self, opt: &WeaviateOptions) -> String {
        opt.name_space
            .clone()
            .unwrap_or_else(|| self.name_space.clone())
    }

    fn properties(&self, doc: &Document, name_space: &str) -> Value {
        let mut properties: Map<String, Value> = doc
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        properties.insert(self.text_key.clone(), Value::String(doc.page_content.clone()));
        properties.insert(
            self.name_space_key.clone(),
            Value::String(name_space.to_string()),
        );
        Value::Object(properties)
    }

    fn where_clause(&self, name_space: &str, user_filter: Option<&Value>) -> String {
        let ns_filter = json!({
            "path": [self.name_space_key],
            "operator": "Equal",
            "valueString": name_space,
        });
        match user_filter {
            None => to_graphql(&ns_filter),
            Some(Value::String(raw)) => format!(
                "{{operator: And, operands: [{}, {}]}}",
                to_graphql(&ns_filter),
                raw
            ),
            Some(filter) => to_graphql(&json!({
                "operator": "And",
                "operands": [ns_filter, filter],
            })),
        }
    }

    fn parse_get_response(&self, raw: &Value) -> Result<Vec<Document>, VectorStoreError> {
        if let Some(errors) = raw.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<String> = errors
                    .iter()
                    .map(|e| {
                        e.get("message")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| e.to_string())
                    })
                    .collect();
                return Err(VectorStoreError::InvalidResponse(messages.join("; ")));
            }
        }

        let data = match raw.get("data") {
            Some(Value::Object(data)) if !data.is_empty() => data,
            _ => return Err(VectorStoreError::EmptyResponse),
        };
        let items = data
            .get("Get")
            .and_then(|g| g.get(&self.class_name))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                VectorStoreError::InvalidResponse(format!(
                    "expected data.Get.{} in response",
                    self.class_name
                ))
            })?;

        items
            .iter()
            .map(|item| {
                let item = item.as_object().ok_or_else(|| {
                    VectorStoreError::InvalidResponse("object expected".to_string())
                })?;
                let page_content = item
                    .get(&self.text_key)
                    .and_then(Value::as_str)
                    .ok_or(VectorStoreError::MissingTextKey)?
                    .to_string();
                let score = item
                    .get("_additional")
                    .and_then(|a| a.get("certainty"))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                let metadata: HashMap<String, Value> = item
                    .iter()
                    .filter(|(k, _)| *k != &self.text_key && k.as_str() != "_additional")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(Document {
                    page_content,
                    metadata,
                    score,
                })
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for Store {
    type Options = WeaviateOptions;

    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &WeaviateOptions,
    ) -> Result<Vec<String>, VectorStoreError> {
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let texts = VectorStoreHelpers::extract_texts(docs);
        let vectors = embedder.embed_documents(&texts).await?;
        VectorStoreHelpers::validate_documents_vectors(docs, &vectors)?;

        let name_space = self.resolve_name_space(opt);
        let mut ids = Vec::with_capacity(docs.len());
        for (doc, vector) in docs.iter().zip(vectors) {
            let id = Uuid::new_v4();
            let obj: Object = ObjectBuilder::new(&self.class_name, self.properties(doc, &name_space))
                .with_id(id)
                .with_vector(vector)
                .build();
            self.client
                .objects
                .create(&obj, None)
                .await
                .map_err(|e| api_error("create object", e))?;
            ids.push(id.to_string());
        }
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &WeaviateOptions,
    ) -> Result<Vec<Document>, VectorStoreError> {
        VectorStoreHelpers::validate_score_threshold(opt.score_threshold)?;
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let vector = embedder.embed_query(query).await?;

        let mut near_vector = json!({ "vector": vector });
        if let Some(threshold) = opt.score_threshold {
            near_vector["certainty"] = json!(threshold);
        }
        let where_clause = self.where_clause(&self.resolve_name_space(opt), opt.filters.as_ref());
        let fields: Vec<&str> = self.query_attrs.iter().map(String::as_str).collect();

        let get = GetBuilder::new(&self.class_name, fields)
            .with_limit(limit as u32)
            .with_near_vector(&to_graphql(&near_vector))
            .with_where(&where_clause)
            .with_additional(vec!["certainty"])
            .build();
        let raw = self
            .client
            .query
            .get(get)
            .await
            .map_err(|e| api_error("query", e))?;
        self.parse_get_response(&raw)
    }

    async fn delete(&self, ids: &[String], _opt: &WeaviateOptions) -> Result<(), VectorStoreError> {
        for id in ids {
            let uuid = Uuid::parse_str(id).map_err(|e| {
                VectorStoreError::InvalidParameter(format!("invalid uuid {}: {}", id, e))
            })?;
            self.client
                .objects
                .delete(&self.class_name, &uuid, None, None)
                .await
                .map_err(|e| api_error("delete object", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{embedding::EmbedderError, vectorstore::weaviate::StoreBuilder};

    struct NoopEmbedder;

    #[async_trait]
    impl Embedder for NoopEmbedder {
        async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
            Ok(documents.iter().map(|_| vec![0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f64>, EmbedderError> {
            Ok(vec![0.0])
        }
    }

    fn store() -> Store {
        StoreBuilder::new()
            .url("http://localhost:8080")
            .class_name("Document")
            .embedder(NoopEmbedder)
            .build()
            .unwrap()
    }

    #[test]
    fn test_properties_include_text_and_name_space() {
        let doc = Document::new("hello")
            .with_metadata(HashMap::from([("lang".to_string(), json!("en"))]));
        let props = store().properties(&doc, "tenant");
        assert_eq!(props, json!({"lang": "en", "text": "hello", "nameSpace": "tenant"}));
    }

    #[test]
    fn test_where_clause() {
        let store = store();
        let clause = store.where_clause("default", None);
        assert!(clause.contains(r#"path: ["nameSpace"]"#));
        assert!(clause.contains("operator: Equal"));
        assert!(clause.contains(r#"valueString: "default""#));

        let clause = store.where_clause(
            "default",
            Some(&Value::String(r#"{path: ["lang"], operator: Equal, valueString: "en"}"#.into())),
        );
        assert!(clause.starts_with("{operator: And, operands: ["));
        assert!(clause.contains(r#"path: ["lang"]"#));
    }

    #[test]
    fn test_parse_get_response() {
        let store = store();
        let raw = json!({"data": {"Get": {"Document": [
            {"text": "hello", "nameSpace": "default", "_additional": {"certainty": 0.92}}
        ]}}});
        let docs = store.parse_get_response(&raw).unwrap();
        assert_eq!(docs[0].page_content, "hello");
        assert_eq!(docs[0].score, 0.92);
        assert_eq!(docs[0].metadata.get("nameSpace"), Some(&json!("default")));
        assert!(!docs[0].metadata.contains_key("_additional"));

        let err = store
            .parse_get_response(&json!({"errors": [{"message": "bad field"}, {"message": "bad where"}]}))
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::InvalidResponse(m) if m == "bad field; bad where"));

        assert!(matches!(
            store.parse_get_response(&json!({"data": {}})),
            Err(VectorStoreError::EmptyResponse)
        ));
        assert!(matches!(
            store.parse_get_response(&json!({"data": {"Get": {"Document": [{"other": 1}]}}})),
            Err(VectorStoreError::MissingTextKey)
        ));
    }
}
