use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chromadb::{
    client::ChromaClient,
    collection::{ChromaCollection, CollectionEntries, QueryOptions, QueryResult},
};
use serde_json::{json, Map, Value};

use crate::{
    embedding::embedder_trait::Embedder,
    schemas::Document,
    vectorstore::{VecStoreOptions, VectorStore, VectorStoreError, VectorStoreHelpers},
};

pub struct Store {
    pub(super) client: ChromaClient,
    pub(super) collection: ChromaCollection,
    pub(super) embedder: Arc<dyn Embedder>,
    pub(super) name_space: Option<String>,
    pub(super) name_space_key: Option<String>,
}

pub type ChromaOptions = VecStoreOptions<Value>;

fn api_error(task: &str, e: impl std::fmt::Display) -> VectorStoreError {
    VectorStoreError::ApiError {
        task: task.to_string(),
        message: e.to_string(),
    }
}

/// Chroma embeds with the store's embedder only and filters at query time.
fn check_add_options(opt: &ChromaOptions) -> Result<(), VectorStoreError> {
    if opt.embedder.is_some() {
        return Err(VectorStoreError::UnsupportedOption(
            "embedder is not supported when adding documents".into(),
        ));
    }
    if opt.score_threshold.is_some() {
        return Err(VectorStoreError::UnsupportedOption(
            "score threshold is not supported when adding documents".into(),
        ));
    }
    if opt.filters.is_some() {
        return Err(VectorStoreError::UnsupportedOption(
            "filters are not supported when adding documents".into(),
        ));
    }
    Ok(())
}

/// The `(key, name space)` pair documents are tagged with, if any.
fn name_space_entry<'a>(
    name_space: Option<&'a str>,
    name_space_key: Option<&'a str>,
) -> Result<Option<(&'a str, &'a str)>, VectorStoreError> {
    match (name_space.filter(|ns| !ns.is_empty()), name_space_key) {
        (None, _) => Ok(None),
        (Some(_), None) => Err(VectorStoreError::MissingNamespaceKey),
        (Some(ns), Some(key)) => Ok(Some((key, ns))),
    }
}

fn where_filter(
    name_space: Option<(&str, &str)>,
    user_filter: Option<&Value>,
) -> Option<Value> {
    let ns_filter = name_space.map(|(key, ns)| json!({ key: ns }));
    match (ns_filter, user_filter) {
        (Some(ns), Some(filter)) => Some(json!({ "$and": [ns, filter] })),
        (Some(ns), None) => Some(ns),
        (None, Some(filter)) => Some(filter.clone()),
        (None, None) => None,
    }
}

fn query_result_to_documents(result: QueryResult, threshold: Option<f32>) -> Vec<Document> {
    let documents = result.documents.and_then(|d| d.into_iter().next());
    let metadatas = result.metadatas.and_then(|m| m.into_iter().next());
    let distances = result.distances.and_then(|d| d.into_iter().next());

    let Some(documents) = documents else {
        return Vec::new();
    };
    let metadatas = metadatas.unwrap_or_else(|| (0..documents.len()).map(|_| None).collect());
    let distances = distances.unwrap_or_else(|| vec![0.0_f32; documents.len()]);

    let docs = documents
        .into_iter()
        .zip(metadatas.into_iter().zip(distances))
        .map(|(page_content, (metadata, distance))| Document {
            page_content,
            metadata: metadata
                .map(|m| m.into_iter().collect::<HashMap<_, _>>())
                .unwrap_or_default(),
            score: 1.0 - distance as f64,
        })
        .collect();
    VectorStoreHelpers::apply_score_threshold(docs, threshold)
}

impl Store {
    /// Deletes the underlying collection and everything in it.
    pub async fn remove_collection(&self) -> Result<(), VectorStoreError> {
        self.client
            .delete_collection(self.collection.name())
            .await
            .map_err(|e| api_error("delete_collection", e))
    }

    fn name_space_entry(&self) -> Result<Option<(&str, &str)>, VectorStoreError> {
        name_space_entry(self.name_space.as_deref(), self.name_space_key.as_deref())
    }
}

#[async_trait]
impl VectorStore for Store {
    type Options = ChromaOptions;

    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &ChromaOptions,
    ) -> Result<Vec<String>, VectorStoreError> {
        check_add_options(opt)?;
        let name_space = self.name_space_entry()?;

        let texts = VectorStoreHelpers::extract_texts(docs);
        let vectors = self.embedder.embed_documents(&texts).await?;
        VectorStoreHelpers::validate_documents_vectors(docs, &vectors)?;

        let ids: Vec<String> = docs
            .iter()
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        let embeddings: Vec<Vec<f32>> = vectors
            .into_iter()
            .map(|v| v.into_iter().map(|x| x as f32).collect())
            .collect();
        let metadatas: Vec<Map<String, Value>> = docs
            .iter()
            .map(|d| {
                let mut metadata: Map<String, Value> = d
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if let Some((key, ns)) = name_space {
                    metadata.insert(key.to_string(), Value::String(ns.to_string()));
                }
                metadata
            })
            .collect();

        let entries = CollectionEntries {
            ids: ids.iter().map(String::as_str).collect(),
            embeddings: Some(embeddings),
            metadatas: Some(metadatas),
            documents: Some(texts.iter().map(String::as_str).collect()),
        };
        self.collection
            .upsert(entries, None)
            .await
            .map_err(|e| api_error("upsert", e))?;
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &ChromaOptions,
    ) -> Result<Vec<Document>, VectorStoreError> {
        VectorStoreHelpers::validate_score_threshold(opt.score_threshold)?;
        let name_space = match opt.name_space.as_deref() {
            Some(ns) => name_space_entry(Some(ns), self.name_space_key.as_deref())?,
            None => self.name_space_entry()?,
        };

        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let vector: Vec<f32> = embedder
            .embed_query(query)
            .await?
            .into_iter()
            .map(|x| x as f32)
            .collect();

        let query_options = QueryOptions {
            query_embeddings: Some(vec![vector]),
            query_texts: None,
            n_results: Some(limit),
            where_metadata: where_filter(name_space, opt.filters.as_ref()),
            where_document: None,
            include: Some(vec!["documents", "metadatas", "distances"]),
        };
        let result = self
            .collection
            .query(query_options, None)
            .await
            .map_err(|e| api_error("query", e))?;
        Ok(query_result_to_documents(result, opt.score_threshold))
    }

    async fn delete(&self, ids: &[String], _opt: &ChromaOptions) -> Result<(), VectorStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.collection
            .delete(Some(ids.iter().map(String::as_str).collect()), None, None)
            .await
            .map_err(|e| api_error("delete", e))
    }
}
