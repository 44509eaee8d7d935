use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_chat_core::{
    discover_documents, ChatService, ChunkingConfig, DocumentRegistry, HashedTrigramEmbedder,
    OllamaGenerator, PdfConverter, QdrantIndex, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "doc_chunks")]
    qdrant_collection: String,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Ollama model used for query expansion and answers
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3")]
    ollama_model: String,

    /// SQLite database holding the document registry
    #[arg(long, default_value = "data/documents.db")]
    db_path: String,

    /// Directory uploaded files are stored under
    #[arg(long, default_value = "data/uploads")]
    uploads_dir: String,
}

#[derive(Subcommand)]
enum Command {
    /// Upload one document and wait for its ingestion to finish.
    Upload {
        /// Path of the file to upload.
        #[arg(long)]
        file: String,
    },
    /// Upload every PDF found under a folder, recursively.
    IngestDir {
        /// Folder to scan for PDFs.
        #[arg(long)]
        folder: String,
    },
    /// List registered documents and their ingestion status.
    List,
    /// Delete a document by its stored path: file, chunks, and record.
    Delete {
        /// Stored path as printed by `list`.
        #[arg(long)]
        path: String,
    },
    /// Ask a question against the ingested documents.
    Ask {
        /// The question to answer.
        #[arg(long)]
        question: String,
        /// Prior conversation turns, passed verbatim to the model.
        #[arg(long, default_value = "")]
        history: String,
    },
    /// Re-queue ingestion for every document still marked uploaded.
    Reconcile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Some(parent) = Path::new(&cli.db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let registry = Arc::new(DocumentRegistry::open(&cli.db_path)?);
    let embedder = Arc::new(HashedTrigramEmbedder::new(DEFAULT_EMBEDDING_DIMENSIONS));
    let index = Arc::new(
        QdrantIndex::new(
            &cli.qdrant_url,
            &cli.qdrant_collection,
            DEFAULT_EMBEDDING_DIMENSIONS,
        )
        .map_err(|error| anyhow::anyhow!(error.to_string()))?,
    );
    let generator = Arc::new(
        OllamaGenerator::new(&cli.ollama_url, &cli.ollama_model)
            .map_err(|error| anyhow::anyhow!(error.to_string()))?,
    );

    index
        .ensure_collection()
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    let service = ChatService::new(
        registry,
        PdfConverter {
            chunking: ChunkingConfig::default(),
        },
        embedder,
        index,
        generator,
        &cli.uploads_dir,
    );

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-chat boot"
    );

    match cli.command {
        Command::Upload { file } => {
            let record = upload_file(&service, &file).await?;
            println!(
                "uploaded {} as {} (id={})",
                record.filename, record.stored_path, record.id
            );
        }
        Command::IngestDir { folder } => {
            let files = discover_documents(Path::new(&folder));
            if files.is_empty() {
                warn!(folder, "no PDF files found");
            }
            for file in &files {
                let record = upload_file(&service, &file.to_string_lossy()).await?;
                println!("queued {} as {}", record.filename, record.stored_path);
            }
            println!("{} file(s) queued at {}", files.len(), Utc::now().to_rfc3339());
        }
        Command::List => {
            for record in service.documents()? {
                println!(
                    "[{}] {} status={} path={} created_at={}",
                    record.id,
                    record.filename,
                    record.status,
                    record.stored_path,
                    record.created_at.to_rfc3339()
                );
            }
        }
        Command::Delete { path } => {
            service
                .delete(&path)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("deleted {path}");
        }
        Command::Ask { question, history } => {
            let answer = service
                .ask(&question, &history)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{}", answer.text);
            if !answer.citations.is_empty() {
                println!("sources: {}", answer.citations.join(", "));
            }
        }
        Command::Reconcile => {
            let queued = service
                .reconcile()
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{queued} document(s) re-queued for ingestion");
        }
    }

    // One-shot process: wait for queued ingestions before exiting.
    service.shutdown().await;
    Ok(())
}

async fn upload_file(
    service: &ChatService<PdfConverter, HashedTrigramEmbedder, QdrantIndex, OllamaGenerator>,
    file: &str,
) -> anyhow::Result<doc_chat_core::DocumentRecord> {
    let bytes = tokio::fs::read(file).await?;
    let filename = Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("path has no file name: {file}"))?;

    service
        .upload(filename, &bytes)
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))
}
