use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    embedding::embedder_trait::Embedder,
    schemas::Document,
    utils::cosine_similarity,
    vectorstore::{VecStoreOptions, VectorStore, VectorStoreError, VectorStoreHelpers},
};

/// One stored document with its vector and optional namespace.
struct Entry {
    id: String,
    document: Document,
    vector: Vec<f64>,
    name_space: Option<String>,
}

pub struct Store {
    data: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
    embedder: Arc<dyn Embedder>,
}

pub struct StoreBuilder {
    embedder: Option<Arc<dyn Embedder>>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        StoreBuilder { embedder: None }
    }

    pub fn embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    pub fn build(self) -> Result<Store, VectorStoreError> {
        let embedder = self
            .embedder
            .ok_or_else(|| VectorStoreError::InvalidParameter("embedder is required".into()))?;
        Ok(Store {
            data: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            embedder,
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn metadata_matches(doc_metadata: &HashMap<String, Value>, filter: &serde_json::Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(k, v)| doc_metadata.get(k).is_some_and(|dv| dv == v))
}

pub type InMemoryOptions = VecStoreOptions<Value>;

#[async_trait]
impl VectorStore for Store {
    type Options = InMemoryOptions;

    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &InMemoryOptions,
    ) -> Result<Vec<String>, VectorStoreError> {
        let texts = VectorStoreHelpers::extract_texts(docs);
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let vectors = embedder.embed_documents(&texts).await?;
        VectorStoreHelpers::validate_documents_vectors(docs, &vectors)?;

        let mut data = self.data.write().map_err(|e| e.to_string())?;
        let mut ids = Vec::with_capacity(docs.len());
        for (doc, vector) in docs.iter().zip(vectors) {
            let id = format!("inmem-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let mut document = doc.clone();
            document.score = 0.0;
            data.push(Entry {
                id: id.clone(),
                document,
                vector,
                name_space: opt.name_space.clone(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &InMemoryOptions,
    ) -> Result<Vec<Document>, VectorStoreError> {
        VectorStoreHelpers::validate_score_threshold(opt.score_threshold)?;
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let query_vector = embedder.embed_query(query).await?;
        let filter = opt.filters.as_ref().and_then(Value::as_object);

        let data = self.data.read().map_err(|e| e.to_string())?;
        let docs: Vec<Document> = data
            .iter()
            .filter(|e| match opt.name_space.as_deref() {
                None => true,
                Some(ns) => e.name_space.as_deref() == Some(ns),
            })
            .filter(|e| filter.map_or(true, |f| metadata_matches(&e.document.metadata, f)))
            .map(|e| {
                e.document
                    .clone()
                    .with_score(cosine_similarity(&query_vector, &e.vector))
            })
            .collect();

        let docs = VectorStoreHelpers::apply_score_threshold(docs, opt.score_threshold);
        let mut docs = VectorStoreHelpers::sort_by_score(docs);
        docs.truncate(limit);
        Ok(docs)
    }

    async fn delete(&self, ids: &[String], _opt: &InMemoryOptions) -> Result<(), VectorStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: HashSet<&String> = ids.iter().collect();
        let mut data = self.data.write().map_err(|e| e.to_string())?;
        data.retain(|e| !ids.contains(&e.id));
        Ok(())
    }
}
