use crate::compose::AnswerComposer;
use crate::convert::DocumentConverter;
use crate::embeddings::Embedder;
use crate::error::{IngestError, RegistryError, Result, SearchError};
use crate::models::{Answer, DocumentRecord, DocumentStatus};
use crate::pipeline::{source_key, IngestionPipeline};
use crate::registry::DocumentRegistry;
use crate::retriever::Retriever;
use crate::traits::{TextGenerator, VectorIndex};
use crate::worker::{spawn_ingest_worker, IngestQueue};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Process-wide facade over the document lifecycle and the retrieval
/// pipeline. Collaborators are injected once at startup and shared;
/// tests substitute fakes at every seam.
pub struct ChatService<C, E, V, G>
where
    C: DocumentConverter + Send + Sync + 'static,
    E: Embedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
    G: TextGenerator + Send + Sync + 'static,
{
    registry: Arc<DocumentRegistry>,
    index: Arc<V>,
    retriever: Retriever<V, E, G>,
    composer: AnswerComposer<G>,
    queue: IngestQueue,
    worker: JoinHandle<()>,
    uploads_dir: PathBuf,
    _pipeline: std::marker::PhantomData<C>,
}

impl<C, E, V, G> ChatService<C, E, V, G>
where
    C: DocumentConverter + Send + Sync + 'static,
    E: Embedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
    G: TextGenerator + Send + Sync + 'static,
{
    pub fn new(
        registry: Arc<DocumentRegistry>,
        converter: C,
        embedder: Arc<E>,
        index: Arc<V>,
        generator: Arc<G>,
        uploads_dir: impl Into<PathBuf>,
    ) -> Self {
        let pipeline = Arc::new(IngestionPipeline::new(
            converter,
            Arc::clone(&embedder),
            Arc::clone(&index),
            Arc::clone(&registry),
        ));
        let (queue, worker) = spawn_ingest_worker(pipeline);

        Self {
            registry,
            index: Arc::clone(&index),
            retriever: Retriever::new(index, embedder, Arc::clone(&generator)),
            composer: AnswerComposer::new(generator),
            queue,
            worker,
            uploads_dir: uploads_dir.into(),
            _pipeline: std::marker::PhantomData,
        }
    }

    /// Persists the file under a collision-free stored path, registers
    /// it as `uploaded`, and queues background ingestion. Returns as
    /// soon as the row exists; ingestion outcome is visible only
    /// through `documents()` and the worker log.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<DocumentRecord> {
        let original = sanitize_filename(filename)?;

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let stored = self.uploads_dir.join(unique_stored_name(&original));
        let source = source_key(&stored);

        tokio::fs::write(&stored, bytes).await?;

        let id = match self.registry.add(&original, &source) {
            Ok(id) => id,
            Err(error) => {
                let _ = tokio::fs::remove_file(&stored).await;
                return Err(error.into());
            }
        };

        self.queue.enqueue(&source);
        info!(filename = %original, source = %source, "document uploaded");

        Ok(DocumentRecord {
            id,
            filename: original,
            stored_path: source,
            status: DocumentStatus::Uploaded,
            created_at: Utc::now(),
        })
    }

    pub fn documents(&self) -> Result<Vec<DocumentRecord>, RegistryError> {
        self.registry.list()
    }

    /// Removes the stored file, every chunk under the source key, and
    /// the registry row. Each step tolerates the target already being
    /// gone, so deleting twice (or racing an ingestion) is harmless.
    pub async fn delete(&self, source: &str) -> Result<()> {
        match tokio::fs::remove_file(source).await {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }

        self.index.delete_source(source).await?;
        self.registry.delete(source)?;

        info!(source, "document deleted");
        Ok(())
    }

    /// Retrieval failures propagate to the caller; nothing is mutated.
    pub async fn ask(&self, question: &str, history: &str) -> Result<Answer, SearchError> {
        let retrieved = self.retriever.retrieve(question).await?;
        let text = self
            .composer
            .compose(question, &retrieved.context, history)
            .await?;

        Ok(Answer {
            text,
            citations: retrieved.citations,
        })
    }

    /// Startup reconciliation sweep: queues ingestion for every record
    /// still in `uploaded`, so work lost to a crash is retried without
    /// a persistent task queue. Returns the number of queued jobs.
    pub fn reconcile(&self) -> Result<usize, RegistryError> {
        let pending: Vec<DocumentRecord> = self
            .registry
            .list()?
            .into_iter()
            .filter(|record| record.status == DocumentStatus::Uploaded)
            .collect();

        for record in &pending {
            self.queue.enqueue(&record.stored_path);
        }

        info!(count = pending.len(), "reconciliation sweep queued pending documents");
        Ok(pending.len())
    }

    /// Explicit teardown: stops accepting work and waits for queued
    /// ingestions to drain.
    pub async fn shutdown(self) {
        let Self { queue, worker, .. } = self;
        drop(queue);
        let _ = worker.await;
    }
}

/// Keeps only the final path component of the untrusted upload name.
fn sanitize_filename(filename: &str) -> Result<String> {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| IngestError::MissingFileName(filename.to_string()))
}

/// Collision-free stored name: original stem plus a nanosecond
/// timestamp, preserving the extension.
fn unique_stored_name(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("document");
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => format!("{stem}-{timestamp}.{extension}"),
        None => format!("{stem}-{timestamp}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_filename, unique_stored_name, ChatService};
    use crate::convert::DocumentConverter;
    use crate::embeddings::{Embedder, HashedTrigramEmbedder};
    use crate::error::{IngestError, SearchError};
    use crate::models::DocumentStatus;
    use crate::registry::DocumentRegistry;
    use crate::stores::MemoryIndex;
    use crate::traits::{TextGenerator, VectorIndex};
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Reads the stored file as UTF-8 and chunks on blank lines, so
    /// end-to-end tests exercise real file contents.
    struct PlainTextConverter;

    impl DocumentConverter for PlainTextConverter {
        fn convert(&self, path: &Path) -> Result<Vec<String>, IngestError> {
            let text = fs::read_to_string(path)
                .map_err(|error| IngestError::Conversion(error.to_string()))?;
            let chunks: Vec<String> = text
                .split("\n\n")
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .map(|chunk| chunk.to_string())
                .collect();

            if chunks.is_empty() {
                return Err(IngestError::Conversion("no readable text".to_string()));
            }
            Ok(chunks)
        }
    }

    /// Answers the expansion prompt with two phrasings and every other
    /// prompt with a fixed completion.
    struct RoutingGenerator;

    #[async_trait]
    impl TextGenerator for RoutingGenerator {
        async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
            if prompt.contains("generate three different versions") {
                Ok("what is the grand total?\nhow much is owed overall?".to_string())
            } else {
                Ok("The grand total is $42.".to_string())
            }
        }
    }

    type TestService =
        ChatService<PlainTextConverter, HashedTrigramEmbedder, MemoryIndex, RoutingGenerator>;

    fn service(
        uploads_dir: &Path,
    ) -> (TestService, Arc<DocumentRegistry>, Arc<MemoryIndex>) {
        let registry = Arc::new(DocumentRegistry::in_memory().expect("registry should open"));
        let index = Arc::new(MemoryIndex::new());
        let subject = ChatService::new(
            Arc::clone(&registry),
            PlainTextConverter,
            Arc::new(HashedTrigramEmbedder::new(64)),
            Arc::clone(&index),
            Arc::new(RoutingGenerator),
            uploads_dir,
        );
        (subject, registry, index)
    }

    async fn wait_for_status(
        registry: &DocumentRegistry,
        source: &str,
        status: DocumentStatus,
    ) {
        for _ in 0..300 {
            let matched = registry
                .list()
                .expect("list should succeed")
                .into_iter()
                .any(|record| record.stored_path == source && record.status == status);
            if matched {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {source} to reach {status}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_ingests_in_the_background_and_answers_with_citations() {
        let dir = tempdir().expect("tempdir should be created");
        let (subject, registry, _index) = service(&dir.path().join("uploads"));

        let record = subject
            .upload(
                "invoice.pdf",
                b"The grand total of this invoice is $42.\n\nPayment is due on June 1.",
            )
            .await
            .expect("upload should succeed");

        assert_eq!(record.status, DocumentStatus::Uploaded);
        assert_eq!(record.filename, "invoice.pdf");

        wait_for_status(&registry, &record.stored_path, DocumentStatus::Ingested).await;

        let answer = subject
            .ask("What is the grand total?", "")
            .await
            .expect("ask should succeed");

        assert_eq!(answer.text, "The grand total is $42.");
        assert!(!answer.citations.is_empty());
        assert!(answer.citations[0].starts_with("invoice-"));
        assert!(answer.citations[0].ends_with(".pdf"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_removes_file_chunks_and_row() {
        let dir = tempdir().expect("tempdir should be created");
        let (subject, registry, index) = service(&dir.path().join("uploads"));

        let record = subject
            .upload("note.pdf", b"A singular fact lives here.")
            .await
            .expect("upload should succeed");
        wait_for_status(&registry, &record.stored_path, DocumentStatus::Ingested).await;

        subject
            .delete(&record.stored_path)
            .await
            .expect("delete should succeed");

        assert!(!Path::new(&record.stored_path).exists());
        assert!(registry.list().expect("list should succeed").is_empty());

        let query = Embedder::embed(&HashedTrigramEmbedder::new(64), "a singular fact");
        let hits = index.search(&query, 5).await.expect("search should succeed");
        assert!(hits.iter().all(|hit| hit.source != record.stored_path));

        // Deleting again is a no-op, not an error.
        subject
            .delete(&record.stored_path)
            .await
            .expect("repeated delete should succeed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_racing_ingestion_does_not_crash() {
        let dir = tempdir().expect("tempdir should be created");
        let (subject, registry, _index) = service(&dir.path().join("uploads"));

        let record = subject
            .upload("fleeting.pdf", b"Gone before it lands.")
            .await
            .expect("upload should succeed");
        subject
            .delete(&record.stored_path)
            .await
            .expect("delete should succeed");

        subject.shutdown().await;
        assert!(registry.list().expect("list should succeed").is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reconcile_requeues_only_uploaded_records() {
        let dir = tempdir().expect("tempdir should be created");
        let uploads = dir.path().join("uploads");
        fs::create_dir_all(&uploads).expect("uploads dir should be created");

        let stray = uploads.join("stray.pdf");
        fs::write(&stray, b"Recovered after a crash.").expect("write should succeed");

        let (subject, registry, _index) = service(&uploads);
        let source = crate::pipeline::source_key(&stray);
        registry
            .add("stray.pdf", &source)
            .expect("insert should succeed");

        let queued = subject.reconcile().expect("reconcile should succeed");
        assert_eq!(queued, 1);

        wait_for_status(&registry, &source, DocumentStatus::Ingested).await;
        assert_eq!(subject.reconcile().expect("reconcile should succeed"), 0);
    }

    #[test]
    fn filenames_are_stripped_to_their_final_component() {
        assert_eq!(
            sanitize_filename("../../etc/passwd").expect("sanitize should succeed"),
            "passwd"
        );
        assert_eq!(
            sanitize_filename("report.pdf").expect("sanitize should succeed"),
            "report.pdf"
        );
        assert!(sanitize_filename("..").is_err());
    }

    #[test]
    fn stored_names_keep_the_stem_and_extension() {
        let first = unique_stored_name("invoice.pdf");
        assert!(first.starts_with("invoice-"));
        assert!(first.ends_with(".pdf"));
    }
}
