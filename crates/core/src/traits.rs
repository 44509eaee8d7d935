use crate::{Chunk, RetrievedHit, SearchError};
use async_trait::async_trait;

/// Chunk storage with nearest-neighbor search. Hits come back ordered
/// by ascending distance; deletion is by source key, never per chunk.
#[async_trait]
pub trait VectorIndex {
    async fn add_chunks(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError>;

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedHit>, SearchError>;

    async fn delete_source(&self, source: &str) -> Result<(), SearchError>;

    async fn reset(&self) -> Result<(), SearchError>;
}

/// Single non-streaming text completion. Used for both query expansion
/// and final answer generation; failures are opaque to the core.
#[async_trait]
pub trait TextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, SearchError>;
}
