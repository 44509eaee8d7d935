use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("document path already registered: {0}")]
    DuplicatePath(String),

    #[error("registry storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("index write failed: {0}")]
    Index(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("generation request failed: {0}")]
    Generation(String),

    #[error("search request failed: {0}")]
    Request(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
