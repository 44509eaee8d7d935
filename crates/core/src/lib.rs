//! Local-first document question answering.
//!
//! Documents are uploaded, converted to text chunks, embedded, and
//! written to a vector index by a background worker; questions are
//! expanded into multiple phrasings, matched against the index, and
//! answered by a language model grounded in the retrieved chunks.
//!
//! [`ChatService`] ties the pieces together; every collaborator sits
//! behind a trait so storage, embedding, and generation backends can
//! be swapped without touching the pipeline.

pub mod chunking;
pub mod compose;
pub mod convert;
pub mod embeddings;
pub mod error;
pub mod expand;
pub mod generate;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod retriever;
pub mod service;
pub mod stores;
pub mod traits;
pub mod worker;

pub use chunking::{split_into_chunks, ChunkingConfig};
pub use compose::AnswerComposer;
pub use convert::{DocumentConverter, PdfConverter};
pub use embeddings::{Embedder, HashedTrigramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, RegistryError, Result, SearchError};
pub use expand::QueryExpander;
pub use generate::OllamaGenerator;
pub use models::{
    source_basename, Answer, Chunk, DocumentRecord, DocumentStatus, RetrievedContext,
    RetrievedHit,
};
pub use pipeline::{discover_documents, source_key, IngestionPipeline};
pub use registry::DocumentRegistry;
pub use retriever::Retriever;
pub use service::ChatService;
pub use stores::{MemoryIndex, QdrantIndex};
pub use traits::{TextGenerator, VectorIndex};
pub use worker::{spawn_ingest_worker, IngestJob, IngestQueue};
