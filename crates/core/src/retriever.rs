use crate::embeddings::Embedder;
use crate::expand::QueryExpander;
use crate::models::{source_basename, RetrievedContext, RetrievedHit};
use crate::traits::{TextGenerator, VectorIndex};
use crate::SearchError;
use std::sync::Arc;
use tracing::debug;

pub const PER_QUERY_TOP_K: usize = 3;

const BLOCK_DIVIDER: &str = "--------------------------------------------------";

/// Runs query expansion, searches the vector index once per expanded
/// query, and renders the deduplicated hits into a citation-annotated
/// context block. Read-only with respect to every store.
pub struct Retriever<V, E, G> {
    index: Arc<V>,
    embedder: Arc<E>,
    expander: QueryExpander<G>,
    per_query_top_k: usize,
}

impl<V, E, G> Retriever<V, E, G>
where
    V: VectorIndex + Send + Sync,
    E: Embedder + Send + Sync,
    G: TextGenerator + Send + Sync,
{
    pub fn new(index: Arc<V>, embedder: Arc<E>, generator: Arc<G>) -> Self {
        Self {
            index,
            embedder,
            expander: QueryExpander::new(generator),
            per_query_top_k: PER_QUERY_TOP_K,
        }
    }

    /// Hit order depends only on query order and each query's search
    /// result order; there is no re-ranking across queries. Two hits
    /// with identical text are the same hit, first occurrence wins.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievedContext, SearchError> {
        if question.trim().is_empty() {
            return Err(SearchError::Request("question is empty".to_string()));
        }

        let queries = self.expander.expand(question).await?;

        let mut hits: Vec<RetrievedHit> = Vec::new();
        for query in &queries {
            let query_vector = self.embedder.embed(query);
            let found = self.index.search(&query_vector, self.per_query_top_k).await?;

            for hit in found {
                if !hits.iter().any(|seen| seen.text == hit.text) {
                    hits.push(hit);
                }
            }
        }

        debug!(
            queries = queries.len(),
            hits = hits.len(),
            "retrieval complete"
        );

        Ok(render_context(&hits))
    }
}

/// Deterministic rendering: one labeled block per hit with a 1-based
/// sequence number and the source basename, plus the distinct
/// basenames in first-appearance order.
fn render_context(hits: &[RetrievedHit]) -> RetrievedContext {
    let mut context = String::new();
    let mut citations: Vec<String> = Vec::new();

    for (position, hit) in hits.iter().enumerate() {
        let source = source_basename(&hit.source);
        context.push_str(&format!(
            "Context {} (Source: {}):\n{}\n{}\n",
            position + 1,
            source,
            hit.text,
            BLOCK_DIVIDER
        ));

        if !citations.contains(&source) {
            citations.push(source);
        }
    }

    RetrievedContext { context, citations }
}
