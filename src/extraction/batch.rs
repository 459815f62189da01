//! Sequential processing of an uploaded batch of notices.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::analyzer::JobNoticeAnalyzer;
use super::organization::{Organization, OrganizationId};
use super::record::OrganizationResult;
use super::report::{ReportAssembler, ReportSet};
use crate::utils::pdf::DocumentError;

/// Caller hint for the document at `index`, else one derived from its filename.
pub fn hint_for(index: usize, path: &Path, hints: &[String]) -> String {
    if let Some(hint) = hints.get(index).filter(|h| !h.trim().is_empty()) {
        return hint.clone();
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(OrganizationId::from_filename)
        .map(|id| id.as_str().to_string())
        .unwrap_or_default()
}

/// Label for a document whose organization could not be named.
fn unnamed(index: usize) -> Organization {
    Organization::Named(format!("Organization_{}", index + 1))
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

pub struct BatchProcessor {
    analyzer: Arc<JobNoticeAnalyzer>,
    assembler: ReportAssembler,
}

impl BatchProcessor {
    pub fn new(analyzer: Arc<JobNoticeAnalyzer>, assembler: ReportAssembler) -> Self {
        Self {
            analyzer,
            assembler,
        }
    }

    /// Processes every PDF in order and returns the five-organization report.
    ///
    /// Only an empty file list fails the batch; every per-document failure
    /// turns into a placeholder entry.
    pub async fn run(&self, files: &[PathBuf], hints: &[String]) -> Result<ReportSet, DocumentError> {
        if files.is_empty() {
            return Err(DocumentError::EmptyBatch);
        }

        let mut results = Vec::with_capacity(files.len());
        for (index, path) in files.iter().enumerate() {
            if !has_pdf_extension(path) {
                warn!(path = %path.display(), "Skipping non-PDF file");
                continue;
            }
            info!("[{}/{}] {}", index + 1, files.len(), path.display());
            let hint = hint_for(index, path, hints);
            results.push(self.process_document(index, path, &hint).await);
        }

        Ok(self.assembler.assemble(results))
    }

    async fn process_document(&self, index: usize, path: &Path, hint: &str) -> OrganizationResult {
        match self.analyzer.analyze_file(path, hint, unnamed(index)).await {
            Ok(result) => result,
            Err(e) => {
                error!(path = %path.display(), "Extraction failed: {}", e);
                let organization = self
                    .analyzer
                    .resolver()
                    .resolve_hint(hint)
                    .unwrap_or_else(|| unnamed(index));
                OrganizationResult::extraction_failed(organization, &e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::analyzer::tests::{analyzer, ScriptedClient};
    use crate::extraction::organization::OrganizationDirectory;

    fn processor(client: Arc<ScriptedClient>) -> BatchProcessor {
        BatchProcessor::new(
            Arc::new(analyzer(client)),
            ReportAssembler::new(Arc::new(OrganizationDirectory::default())),
        )
    }

    #[test]
    fn hint_prefers_caller_then_filename() {
        let path = Path::new("/uploads/tanuvas_notice.pdf");
        assert_eq!(hint_for(0, path, &["NHM".to_string()]), "NHM");
        assert_eq!(hint_for(0, path, &["  ".to_string()]), "TANUVAS");
        assert_eq!(hint_for(3, path, &["NHM".to_string()]), "TANUVAS");
        assert_eq!(hint_for(0, Path::new("scan.pdf"), &[]), "");
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("a/NOTICE.PDF")));
        assert!(!has_pdf_extension(Path::new("a/notice.docx")));
        assert!(!has_pdf_extension(Path::new("a/notice")));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let err = processor(ScriptedClient::replying("[]"))
            .run(&[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::EmptyBatch));
    }

    #[tokio::test]
    async fn failing_documents_still_give_five_entries() {
        let client = ScriptedClient::replying("[]");
        let files: Vec<PathBuf> = (0..10)
            .map(|i| PathBuf::from(format!("/nonexistent/notice_{i}.pdf")))
            .collect();

        let report = processor(client.clone()).run(&files, &[]).await.unwrap();

        let order: Vec<String> = report.entries().iter().map(|r| r.organization.to_string()).collect();
        assert_eq!(order, ["AAU", "CSIR", "NHM", "NTPC", "TANUVAS"]);
        assert_eq!(report.additional().len(), 10);
        assert_eq!(
            report.additional()[0].positions[0].advertisement_number,
            "EXTRACTION FAILED"
        );
        assert_eq!(report.additional()[9].organization.to_string(), "Organization_10");
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn unnamed_documents_are_numbered_from_one() {
        assert_eq!(unnamed(0).to_string(), "Organization_1");
        assert_eq!(unnamed(9), Organization::Named("Organization_10".into()));
    }

    #[tokio::test]
    async fn failed_document_keeps_hinted_organization() {
        let client = ScriptedClient::replying("[]");
        let files = vec![
            PathBuf::from("/nonexistent/NTPC_advt.pdf"),
            PathBuf::from("/nonexistent/readme.txt"),
        ];

        let report = processor(client).run(&files, &[]).await.unwrap();

        let ntpc = &report.entries()[3];
        assert_eq!(ntpc.positions[0].advertisement_number, "EXTRACTION FAILED");
        assert!(ntpc.positions[0].remarks.starts_with("Error during extraction: cannot read"));
        assert_eq!(ntpc.extraction_quality.date_source, "error");
        assert!(report.additional().is_empty());
        assert_eq!(report.entries()[0].extraction_quality.date_source, "not uploaded");
    }
}
