//! Embedded vector collection for RAG retrieval
//!
//! Documents live in the `rag_documents` table of the application database,
//! with embeddings stored as little-endian f32 blobs. Search is brute-force
//! cosine similarity, which is more than fast enough at the collection sizes
//! a single study server sees.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::Database;

/// A retrieval hit with its similarity score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub id: i64,
    pub text: String,
    pub subject: String,
    pub score: f32,
}

/// Vector collection layered on the application database
#[derive(Clone)]
pub struct VectorStore {
    conn: Arc<Mutex<Connection>>,
    dimensions: usize,
}

impl VectorStore {
    pub fn new(db: &Database, dimensions: usize) -> Self {
        Self {
            conn: db.connection(),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Insert a document with its embedding. Returns the row id.
    pub fn insert(&self, text: &str, subject: &str, embedding: &[f32]) -> Result<i64> {
        if embedding.len() != self.dimensions {
            return Err(Error::Embedding(format!(
                "expected {}-dimensional embedding, got {}",
                self.dimensions,
                embedding.len()
            )));
        }
        let blob = encode_embedding(embedding);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO rag_documents (text, subject, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![text, subject, blob, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Top-k most similar documents to the query embedding, optionally
    /// restricted to one subject
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        subject: Option<&str>,
    ) -> Result<Vec<ScoredDocument>> {
        if query.len() != self.dimensions {
            return Err(Error::Embedding(format!(
                "expected {}-dimensional query, got {}",
                self.dimensions,
                query.len()
            )));
        }

        let conn = self.conn.lock();
        let sql = match subject {
            Some(_) => {
                "SELECT id, text, subject, embedding FROM rag_documents WHERE subject = ?1"
            }
            None => "SELECT id, text, subject, embedding FROM rag_documents",
        };
        let mut stmt = conn.prepare(sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = match subject.as_ref() {
            Some(s) => vec![s],
            None => vec![],
        };
        let mut scored: Vec<ScoredDocument> = stmt
            .query_map(&params[..], |row| {
                let id: i64 = row.get(0)?;
                let text: String = row.get(1)?;
                let subject: String = row.get(2)?;
                let blob: Vec<u8> = row.get(3)?;
                Ok((id, text, subject, blob))
            })?
            .filter_map(|row| row.ok())
            .map(|(id, text, subject, blob)| {
                let embedding = decode_embedding(&blob);
                let score = cosine_similarity(query, &embedding);
                ScoredDocument {
                    id,
                    text,
                    subject,
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM rag_documents", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM rag_documents", [])?;
        Ok(deleted)
    }

    /// Delete all documents with the given subject. A filter is required;
    /// wiping the whole collection goes through [`clear`](Self::clear).
    pub fn delete_by_subject(&self, subject: &str) -> Result<usize> {
        if subject.is_empty() {
            return Err(Error::Validation(
                "subject filter is required for deletion".to_string(),
            ));
        }
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM rag_documents WHERE subject = ?1",
            params![subject],
        )?;
        Ok(deleted)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors (0.0 when either is zero-length)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VectorStore {
        let db = Database::in_memory().unwrap();
        VectorStore::new(&db, 3)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![0.1f32, -2.5, 3.75];
        let decoded = decode_embedding(&encode_embedding(&original));
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_insert_and_search() {
        let store = store();
        store.insert("rust ownership", "programming", &[1.0, 0.0, 0.0]).unwrap();
        store.insert("spanish verbs", "language", &[0.0, 1.0, 0.0]).unwrap();
        store.insert("rust borrowing", "programming", &[0.9, 0.1, 0.0]).unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "rust ownership");
        assert_eq!(hits[1].text, "rust borrowing");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_subject_filter() {
        let store = store();
        store.insert("rust ownership", "programming", &[1.0, 0.0, 0.0]).unwrap();
        store.insert("spanish verbs", "language", &[0.9, 0.1, 0.0]).unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 5, Some("language")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subject, "language");
    }

    #[test]
    fn test_delete_by_subject() {
        let store = store();
        store.insert("a", "programming", &[1.0, 0.0, 0.0]).unwrap();
        store.insert("b", "language", &[0.0, 1.0, 0.0]).unwrap();

        assert!(store.delete_by_subject("").is_err());
        assert_eq!(store.delete_by_subject("language").unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let store = store();
        assert!(store.insert("x", "general", &[1.0]).is_err());
        assert!(store.search(&[1.0, 2.0], 5, None).is_err());
    }

    #[test]
    fn test_clear() {
        let store = store();
        store.insert("a", "general", &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
