use crate::traits::VectorIndex;
use crate::{Chunk, RetrievedHit, SearchError};
use async_trait::async_trait;
use parking_lot::Mutex;

/// In-process chunk index with brute-force cosine search. Backs tests
/// and throwaway runs; production uses the Qdrant client.
#[derive(Default)]
pub struct MemoryIndex {
    entries: Mutex<Vec<StoredChunk>>,
}

struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add_chunks(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError> {
        if chunks.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut entries = self.entries.lock();
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            entries.push(StoredChunk {
                chunk: chunk.clone(),
                embedding: embedding.clone(),
            });
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedHit>, SearchError> {
        let entries = self.entries.lock();

        let mut scored: Vec<RetrievedHit> = entries
            .iter()
            .map(|entry| RetrievedHit {
                text: entry.chunk.text.clone(),
                source: entry.chunk.source.clone(),
                distance: 1.0 - f64::from(cosine_similarity(query_vector, &entry.embedding)),
            })
            .collect();

        scored.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_source(&self, source: &str) -> Result<(), SearchError> {
        self.entries
            .lock()
            .retain(|entry| entry.chunk.source != source);
        Ok(())
    }

    async fn reset(&self) -> Result<(), SearchError> {
        self.entries.lock().clear();
        Ok(())
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() {
        return 0.0;
    }

    let dot: f32 = left.iter().zip(right.iter()).map(|(a, b)| a * b).sum();
    let norm_left: f32 = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_right: f32 = right.iter().map(|v| v * v).sum::<f32>().sqrt();

    if norm_left == 0.0 || norm_right == 0.0 {
        0.0
    } else {
        dot / (norm_left * norm_right)
    }
}
