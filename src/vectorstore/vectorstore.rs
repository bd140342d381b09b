use async_trait::async_trait;

use crate::schemas::Document;

use super::VectorStoreError;

#[async_trait]
pub trait VectorStore: Send + Sync {
    type Options: Send + Sync;

    /// Embeds and stores `docs`, returning the ids assigned to them.
    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &Self::Options,
    ) -> Result<Vec<String>, VectorStoreError>;

    /// Returns at most `limit` documents ordered by decreasing similarity to `query`.
    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &Self::Options,
    ) -> Result<Vec<Document>, VectorStoreError>;

    async fn delete(&self, _ids: &[String], _opt: &Self::Options) -> Result<(), VectorStoreError> {
        Err(VectorStoreError::DeleteNotSupported)
    }
}
