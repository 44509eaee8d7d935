use crate::chunking::{split_into_chunks, ChunkingConfig};
use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;

/// Conversion-and-chunking seam: a file on disk becomes an ordered
/// sequence of text chunks. Failure is fatal for the ingestion run.
pub trait DocumentConverter {
    fn convert(&self, path: &Path) -> Result<Vec<String>, IngestError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfConverter {
    pub chunking: ChunkingConfig,
}

impl DocumentConverter for PdfConverter {
    fn convert(&self, path: &Path) -> Result<Vec<String>, IngestError> {
        let document = Document::load(path)
            .map_err(|error| IngestError::Conversion(error.to_string()))?;

        let mut text = String::new();
        for (page_no, _page_id) in document.get_pages() {
            let page_text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::Conversion(error.to_string()))?;
            text.push_str(&page_text);
            text.push_str("\n\n");
        }

        let chunks = split_into_chunks(&text, self.chunking);
        if chunks.is_empty() {
            return Err(IngestError::Conversion(format!(
                "document had no readable text: {}",
                path.display()
            )));
        }

        Ok(chunks)
    }
}
