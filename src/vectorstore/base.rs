//! VectorStore 通用辅助方法
//!
//! Shared helpers used by every store implementation.

use std::sync::Arc;

use crate::embedding::embedder_trait::Embedder;
use crate::schemas::Document;
use crate::vectorstore::{VecStoreOptions, VectorStore, VectorStoreError};

pub struct VectorStoreHelpers;

impl VectorStoreHelpers {
    pub fn extract_texts(docs: &[Document]) -> Vec<String> {
        docs.iter().map(|d| d.page_content.clone()).collect()
    }

    /// 验证文档和向量的数量匹配
    pub fn validate_documents_vectors(
        docs: &[Document],
        vectors: &[Vec<f64>],
    ) -> Result<(), VectorStoreError> {
        if docs.len() != vectors.len() {
            return Err(VectorStoreError::WrongNumberOfVectors {
                vectors: vectors.len(),
                documents: docs.len(),
            });
        }
        Ok(())
    }

    /// The per-call embedder if set, else the store's default.
    pub fn get_embedder<F>(
        opt: &VecStoreOptions<F>,
        default: &Arc<dyn Embedder>,
    ) -> Arc<dyn Embedder> {
        opt.embedder.as_ref().unwrap_or(default).clone()
    }

    pub fn validate_score_threshold(threshold: Option<f32>) -> Result<(), VectorStoreError> {
        match threshold {
            Some(t) if !(0.0..=1.0).contains(&t) => Err(VectorStoreError::InvalidScoreThreshold),
            _ => Ok(()),
        }
    }

    /// 应用分数阈值过滤
    pub fn apply_score_threshold(mut docs: Vec<Document>, threshold: Option<f32>) -> Vec<Document> {
        if let Some(threshold) = threshold {
            docs.retain(|doc| doc.score >= threshold as f64);
        }
        docs
    }

    /// 按分数排序文档（降序）
    pub fn sort_by_score(mut docs: Vec<Document>) -> Vec<Document> {
        docs.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        docs
    }
}

/// 批量操作
#[async_trait::async_trait]
pub trait VectorStoreBatch: VectorStore {
    async fn add_documents_batch(
        &self,
        docs: &[Document],
        batch_size: usize,
        opt: &Self::Options,
    ) -> Result<Vec<String>, VectorStoreError> {
        let mut all_ids = Vec::with_capacity(docs.len());
        for chunk in docs.chunks(batch_size.max(1)) {
            let ids = self.add_documents(chunk, opt).await?;
            all_ids.extend(ids);
        }
        Ok(all_ids)
    }

    async fn delete_batch(
        &self,
        ids: &[String],
        batch_size: usize,
        opt: &Self::Options,
    ) -> Result<(), VectorStoreError> {
        for chunk in ids.chunks(batch_size.max(1)) {
            self.delete(chunk, opt).await?;
        }
        Ok(())
    }
}

impl<T: VectorStore + ?Sized> VectorStoreBatch for T {}
