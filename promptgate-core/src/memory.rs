// promptgate-core/src/memory.rs
//! Volatile semantic memory.
//!
//! An in-process, non-persistent store that delegates embedding to the
//! external [`EmbeddingGenerator`] and ranks matches by cosine similarity.
//! Concurrency discipline is a `tokio::sync::RwLock` around the collection
//! map; nothing here survives process restart.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::CoreError;
use crate::services::EmbeddingGenerator;

/// A stored memory item with its embedding.
#[derive(Debug, Clone)]
struct MemoryRecord {
    id: String,
    text: String,
    embedding: Vec<f32>,
}

/// A ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub id: String,
    pub text: String,
    pub relevance: f32,
}

/// The semantic memory boundary: store text by collection/id, retrieve
/// ranked matches for a query.
#[async_trait]
pub trait SemanticMemory: Send + Sync {
    async fn save_information(
        &self,
        collection: &str,
        id: &str,
        text: &str,
    ) -> Result<(), CoreError>;

    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryMatch>, CoreError>;

    async fn collections(&self) -> Vec<String>;
}

/// In-memory implementation of [`SemanticMemory`].
pub struct VolatileMemoryStore {
    embeddings: Arc<dyn EmbeddingGenerator>,
    collections: RwLock<HashMap<String, Vec<MemoryRecord>>>,
}

impl VolatileMemoryStore {
    pub fn new(embeddings: Arc<dyn EmbeddingGenerator>) -> Self {
        Self {
            embeddings,
            collections: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SemanticMemory for VolatileMemoryStore {
    /// Stores `text` under `collection`/`id`, replacing any existing record
    /// with the same id.
    async fn save_information(
        &self,
        collection: &str,
        id: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let embedding = self.embeddings.embed(text).await?;
        let record = MemoryRecord {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
        };

        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        debug!("Stored memory item '{id}' in collection '{collection}'.");
        Ok(())
    }

    /// Returns up to `limit` records from `collection` ranked by descending
    /// cosine similarity to `query`. Unknown collections are empty, not an
    /// error.
    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryMatch>, CoreError> {
        let query_embedding = self.embeddings.embed(query).await?;

        let collections = self.collections.read().await;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<MemoryMatch> = records
            .iter()
            .map(|r| MemoryMatch {
                id: r.id.clone(),
                text: r.text.clone(),
                relevance: cosine_similarity(&query_embedding, &r.embedding),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic stub embedder: fixed axis vectors per known keyword.
    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingGenerator for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, CoreError> {
            let lowered = text.to_lowercase();
            let mut v = vec![0.0f32; 3];
            if lowered.contains("budget") {
                v[0] = 1.0;
            }
            if lowered.contains("savings") {
                v[1] = 1.0;
            }
            if lowered.contains("weather") {
                v[2] = 1.0;
            }
            Ok(v)
        }
    }

    fn store() -> VolatileMemoryStore {
        VolatileMemoryStore::new(Arc::new(StubEmbedder))
    }

    #[tokio::test]
    async fn search_ranks_by_relevance() {
        let store = store();
        store
            .save_information("finance", "budget", "Your budget for 2024 is $100,000")
            .await
            .unwrap();
        store
            .save_information("finance", "savings", "Your savings from 2023 are $50,000")
            .await
            .unwrap();

        let matches = store.search("finance", "what is my budget", 5).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "budget");
        assert!(matches[0].relevance > matches[1].relevance);
    }

    #[tokio::test]
    async fn save_overwrites_by_id() {
        let store = store();
        store.save_information("finance", "budget", "old budget").await.unwrap();
        store.save_information("finance", "budget", "new budget").await.unwrap();

        let matches = store.search("finance", "budget", 5).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "new budget");
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let store = store();
        let matches = store.search("nope", "anything", 5).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let store = store();
        for i in 0..4 {
            store
                .save_information("weather", &format!("fact{i}"), &format!("weather fact {i}"))
                .await
                .unwrap();
        }
        let matches = store.search("weather", "weather", 2).await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn collections_are_listed_sorted() {
        let store = store();
        store.save_information("personal", "a", "x").await.unwrap();
        store.save_information("finance", "b", "y").await.unwrap();
        assert_eq!(store.collections().await, vec!["finance", "personal"]);
    }

    #[test]
    fn cosine_similarity_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < f32::EPSILON);
    }
}
