// PDF loading for recruitment notices.
// Byte-level parsing stays in `pdf-extract`; this module only adds page markers
// and maps failures to input rejections.

use std::path::Path;
use thiserror::Error;
use tracing::info;

const PAGE_RULE_WIDTH: usize = 60;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a PDF file")]
    NotPdf(String),

    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("no files were provided")]
    EmptyBatch,
}

/// Page texts of one notice, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pages: Vec<String>,
}

impl RawDocument {
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Trimmed characters of page text, page banners excluded.
    pub fn content_chars(&self) -> usize {
        self.pages().iter().map(|p| p.trim().chars().count()).sum()
    }

    /// All pages joined, each preceded by a `PAGE n` banner.
    pub fn text(&self) -> String {
        let rule = "=".repeat(PAGE_RULE_WIDTH);
        self.pages
            .iter()
            .enumerate()
            .map(|(i, page)| format!("\n{rule}\nPAGE {}\n{rule}\n{page}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Returns true if the head bytes carry the PDF magic.
pub fn is_pdf(head: &[u8]) -> bool {
    head.starts_with(b"%PDF-")
}

/// Extracts per-page text from a PDF stored fully in memory.
pub fn extract_document_from_mem(bytes: &[u8]) -> Result<RawDocument, DocumentError> {
    if !is_pdf(bytes) {
        return Err(DocumentError::NotPdf("document".to_string()));
    }
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| DocumentError::Extraction(e.to_string()))?;
    Ok(RawDocument::from_pages(pages))
}

/// Reads and extracts a PDF from disk.
pub async fn read_pdf_document(path: &Path) -> Result<RawDocument, DocumentError> {
    let shown = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| DocumentError::Unreadable {
            path: shown.clone(),
            source,
        })?;

    if !is_pdf(&bytes) {
        return Err(DocumentError::NotPdf(shown));
    }

    // pdf-extract is CPU bound and synchronous.
    let document = tokio::task::spawn_blocking(move || extract_document_from_mem(&bytes))
        .await
        .map_err(|e| DocumentError::Extraction(e.to_string()))??;

    info!(
        target: "pdf",
        path = %shown,
        pages = document.page_count(),
        chars = document.content_chars(),
        "PDF text extracted"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn page_markers_are_numbered() {
        let doc = RawDocument::from_pages(vec!["first".into(), "second".into()]);
        let text = doc.text();
        assert_eq!(doc.page_count(), 2);
        assert!(text.contains("PAGE 1\n"));
        assert!(text.contains("PAGE 2\n"));
        assert!(text.find("first").unwrap() < text.find("PAGE 2").unwrap());
        assert!(text.contains(&"=".repeat(PAGE_RULE_WIDTH)));
    }

    #[test]
    fn banners_do_not_count_as_content() {
        let doc = RawDocument::from_pages(vec![String::new(), "  \n ".into()]);
        assert_eq!(doc.content_chars(), 0);
        assert!(doc.text().trim().chars().count() > 100);

        let doc = RawDocument::from_pages(vec![" abc ".into(), "de".into()]);
        assert_eq!(doc.content_chars(), 5);
    }

    #[test]
    fn magic_check() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(!is_pdf(b"PK\x03\x04"));
        assert!(!is_pdf(b""));
    }

    #[test]
    fn non_pdf_bytes_are_rejected_in_memory() {
        let err = extract_document_from_mem(b"plain text").unwrap_err();
        assert!(matches!(err, DocumentError::NotPdf(_)));
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let err = read_pdf_document(Path::new("/nonexistent/notice.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn non_pdf_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notice.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"this is not a pdf").unwrap();

        let err = read_pdf_document(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::NotPdf(_)));
    }

    #[tokio::test]
    async fn corrupt_pdf_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\ngarbage without xref").unwrap();

        let err = read_pdf_document(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::Extraction(_)));
    }
}
