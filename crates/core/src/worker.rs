use crate::convert::DocumentConverter;
use crate::embeddings::Embedder;
use crate::pipeline::IngestionPipeline;
use crate::traits::VectorIndex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct IngestJob {
    pub source: String,
}

/// Handle for submitting background ingestion work. Upload returns as
/// soon as a job is queued; failures surface in the worker's log, not
/// to the uploader.
#[derive(Clone)]
pub struct IngestQueue {
    sender: mpsc::UnboundedSender<IngestJob>,
}

impl IngestQueue {
    pub fn enqueue(&self, source: &str) {
        let job = IngestJob {
            source: source.to_string(),
        };
        if self.sender.send(job).is_err() {
            warn!(source, "ingest worker has shut down; dropping job");
        }
    }
}

/// Spawns the single ingestion worker. One worker drains the queue in
/// submission order, which also serializes any two jobs that share a
/// source key. The task ends when every queue handle is dropped.
pub fn spawn_ingest_worker<C, E, V>(
    pipeline: Arc<IngestionPipeline<C, E, V>>,
) -> (IngestQueue, JoinHandle<()>)
where
    C: DocumentConverter + Send + Sync + 'static,
    E: Embedder + Send + Sync + 'static,
    V: VectorIndex + Send + Sync + 'static,
{
    let (sender, mut receiver) = mpsc::unbounded_channel::<IngestJob>();

    let handle = tokio::spawn(async move {
        while let Some(job) = receiver.recv().await {
            match pipeline.reingest(&job.source).await {
                Ok(count) => {
                    info!(source = %job.source, chunks = count, "background ingestion finished");
                }
                Err(cause) => {
                    error!(
                        source = %job.source,
                        %cause,
                        "background ingestion failed; document stays uploaded"
                    );
                }
            }
        }
    });

    (IngestQueue { sender }, handle)
}

#[cfg(test)]
mod tests {
    use super::spawn_ingest_worker;
    use crate::convert::DocumentConverter;
    use crate::embeddings::HashedTrigramEmbedder;
    use crate::error::IngestError;
    use crate::models::DocumentStatus;
    use crate::pipeline::IngestionPipeline;
    use crate::registry::DocumentRegistry;
    use crate::stores::MemoryIndex;
    use std::path::Path;
    use std::sync::Arc;

    struct CannedConverter {
        chunks: Result<Vec<String>, String>,
    }

    impl DocumentConverter for CannedConverter {
        fn convert(&self, _path: &Path) -> Result<Vec<String>, IngestError> {
            match &self.chunks {
                Ok(chunks) => Ok(chunks.clone()),
                Err(message) => Err(IngestError::Conversion(message.clone())),
            }
        }
    }

    #[tokio::test]
    async fn queued_jobs_are_processed_and_status_advances() {
        let registry = Arc::new(DocumentRegistry::in_memory().expect("registry should open"));
        registry
            .add("a.pdf", "data/uploads/a.pdf")
            .expect("insert should succeed");

        let pipeline = Arc::new(IngestionPipeline::new(
            CannedConverter {
                chunks: Ok(vec!["chunk text".to_string()]),
            },
            Arc::new(HashedTrigramEmbedder::new(16)),
            Arc::new(MemoryIndex::new()),
            Arc::clone(&registry),
        ));

        let (queue, handle) = spawn_ingest_worker(pipeline);
        queue.enqueue("data/uploads/a.pdf");

        drop(queue);
        handle.await.expect("worker should finish cleanly");

        assert_eq!(
            registry.list().expect("list should succeed")[0].status,
            DocumentStatus::Ingested
        );
    }

    #[tokio::test]
    async fn a_failing_job_does_not_kill_the_worker() {
        let registry = Arc::new(DocumentRegistry::in_memory().expect("registry should open"));
        registry
            .add("bad.pdf", "data/uploads/bad.pdf")
            .expect("insert should succeed");

        let pipeline = Arc::new(IngestionPipeline::new(
            CannedConverter {
                chunks: Err("corrupt".to_string()),
            },
            Arc::new(HashedTrigramEmbedder::new(16)),
            Arc::new(MemoryIndex::new()),
            Arc::clone(&registry),
        ));

        let (queue, handle) = spawn_ingest_worker(pipeline);
        queue.enqueue("data/uploads/bad.pdf");
        queue.enqueue("data/uploads/bad.pdf");

        drop(queue);
        handle.await.expect("worker should survive failed jobs");

        assert_eq!(
            registry.list().expect("list should succeed")[0].status,
            DocumentStatus::Uploaded
        );
    }
}
