use crate::convert::DocumentConverter;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::models::{Chunk, DocumentStatus};
use crate::registry::DocumentRegistry;
use crate::traits::VectorIndex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use walkdir::WalkDir;

/// Canonical source key for a document file: the stored path rendered
/// with forward slashes. This exact string is used at every index
/// write, index delete, registry row, and filesystem site — deletion
/// under any other form of the path would silently match nothing.
pub fn source_key(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Recursively finds ingestable files under a folder, sorted for
/// deterministic batch uploads.
pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Converts an uploaded file into chunks, embeds them, writes them to
/// the vector index in one batch, and flips the registry status. The
/// only writer that creates chunks and the only trigger for the
/// `uploaded -> ingested` transition.
pub struct IngestionPipeline<C, E, V> {
    converter: C,
    embedder: Arc<E>,
    index: Arc<V>,
    registry: Arc<DocumentRegistry>,
}

impl<C, E, V> IngestionPipeline<C, E, V>
where
    C: DocumentConverter + Send + Sync,
    E: Embedder + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(
        converter: C,
        embedder: Arc<E>,
        index: Arc<V>,
        registry: Arc<DocumentRegistry>,
    ) -> Self {
        Self {
            converter,
            embedder,
            index,
            registry,
        }
    }

    /// Any failure before the final status update leaves the record in
    /// `uploaded`; no retry happens here. Does not deduplicate a prior
    /// run's chunks — use `reingest` when the source may already be
    /// indexed.
    pub async fn ingest(&self, source: &str) -> Result<usize> {
        let texts = self.converter.convert(Path::new(source))?;

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .enumerate()
            .map(|(position, text)| Chunk {
                chunk_id: chunk_id(source, position as u64, &text),
                source: source.to_string(),
                text,
            })
            .collect();

        let embeddings: Vec<Vec<f32>> = chunks
            .iter()
            .map(|chunk| self.embedder.embed(&chunk.text))
            .collect();

        self.index.add_chunks(&chunks, &embeddings).await?;
        self.registry
            .update_status(source, DocumentStatus::Ingested)?;

        info!(source, chunks = chunks.len(), "document ingested");
        Ok(chunks.len())
    }

    /// Clears the source's prior chunks, then ingests. Safe on a
    /// never-ingested source (deleting an absent key is a no-op), so
    /// the background worker and the reconcile sweep always take this
    /// path.
    pub async fn reingest(&self, source: &str) -> Result<usize> {
        self.index.delete_source(source).await?;
        self.ingest(source).await
    }
}

fn chunk_id(source: &str, position: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(position.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
