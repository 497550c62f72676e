//! Retrieval-augmented context for chat
//!
//! Embeds the query, searches the vector collection, and joins the matched
//! document texts into a single context block for the agents.

use std::sync::Arc;

use crate::error::Result;
use crate::providers::EmbeddingProvider;
use crate::vector::VectorStore;

/// Separator placed between retrieved documents in the context block
const DOC_SEPARATOR: &str = "\n---\n";

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: VectorStore,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: VectorStore, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Retrieve relevant documents for a query and join them into one
    /// context string. Empty string when nothing is indexed or matched.
    pub async fn fetch_context(&self, query: &str) -> Result<String> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.search(&embedding, self.top_k, None)?;
        if hits.is_empty() {
            return Ok(String::new());
        }
        Ok(hits
            .iter()
            .map(|doc| doc.text.as_str())
            .collect::<Vec<_>>()
            .join(DOC_SEPARATOR))
    }

    /// Embed and index a document into the collection
    pub async fn index(&self, text: &str, subject: &str) -> Result<i64> {
        let embedding = self.embedder.embed(text).await?;
        self.store.insert(text, subject, &embedding)
    }

    /// Embed and index a batch of documents, returning the inserted ids
    pub async fn index_batch(&self, docs: &[(String, String)]) -> Result<Vec<i64>> {
        let texts: Vec<String> = docs.iter().map(|(text, _)| text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let mut ids = Vec::with_capacity(docs.len());
        for ((text, subject), embedding) in docs.iter().zip(embeddings.iter()) {
            ids.push(self.store.insert(text, subject, embedding)?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use async_trait::async_trait;

    /// Deterministic embedder: maps known words onto axis-aligned vectors
    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>> {
            let mut v = vec![0.0f32; 3];
            if text.contains("rust") {
                v[0] = 1.0;
            }
            if text.contains("spanish") {
                v[1] = 1.0;
            }
            if text.contains("math") {
                v[2] = 1.0;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn health_check(&self) -> crate::error::Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn retriever() -> Retriever {
        let db = Database::in_memory().unwrap();
        let store = VectorStore::new(&db, 3);
        Retriever::new(Arc::new(StubEmbedder), store, 2)
    }

    #[tokio::test]
    async fn test_fetch_context_empty_store() {
        let r = retriever();
        let context = r.fetch_context("rust ownership").await.unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_index_and_fetch() {
        let r = retriever();
        r.index("rust has ownership", "programming").await.unwrap();
        r.index("spanish has verbs", "language").await.unwrap();

        let context = r.fetch_context("tell me about rust").await.unwrap();
        assert!(context.contains("rust has ownership"));
    }

    #[tokio::test]
    async fn test_context_joins_with_separator() {
        let r = retriever();
        r.index("rust doc one", "programming").await.unwrap();
        r.index("rust doc two", "programming").await.unwrap();

        let context = r.fetch_context("rust").await.unwrap();
        assert!(context.contains("\n---\n"));
    }

    #[tokio::test]
    async fn test_index_batch() {
        let r = retriever();
        let ids = r
            .index_batch(&[
                ("rust doc".to_string(), "programming".to_string()),
                ("math doc".to_string(), "math".to_string()),
            ])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(r.store().count().unwrap(), 2);
    }
}
