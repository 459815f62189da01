//! AI extraction pass for a single notice.
//!
//! Heuristic pre-pass (organization, deadline), prompt, completion call, then
//! repair of whatever the model returned.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::dates::{DeadlineWindow, NormalizedDate};
use super::last_date::{DeadlineOutcome, LastDateExtractor};
use super::organization::{Organization, OrganizationDirectory, OrganizationResolver};
use super::prompt::{build_extraction_prompt, SYSTEM_INSTRUCTION};
use super::record::{needs_review, ExtractionRecord, OrganizationResult};
use super::response::{parse_records, ResponseParseError};
use crate::utils::content_guard::safe_truncate_utf8;
use crate::utils::mistral::{CompletionClient, CompletionError, CompletionRequest};
use crate::utils::pdf::{read_pdf_document, DocumentError, RawDocument};

/// Notices with less trimmed text than this are never sent to the model.
pub const MIN_CONTENT_CHARS: usize = 100;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("completion service unavailable: {0}")]
    ServiceUnavailable(#[from] CompletionError),

    #[error("AI response parsing failed: {0}")]
    ResponseParse(#[from] ResponseParseError),

    #[error(transparent)]
    Input(#[from] DocumentError),
}

/// True when the model punted on the deadline.
fn needs_deadline_repair(value: &str) -> bool {
    let lower = value.to_lowercase();
    value.trim().is_empty() || lower.contains("check") || lower.contains("manual")
}

/// Fills punted deadlines from the detected date, then from the organization's
/// known date. Values are left as they are when neither exists.
pub fn repair_last_dates(
    records: &mut [ExtractionRecord],
    detected: Option<NormalizedDate>,
    known: Option<NormalizedDate>,
) {
    for record in records.iter_mut() {
        if !needs_deadline_repair(&record.last_date) {
            continue;
        }
        if let Some(date) = detected {
            record.last_date = date.to_string();
            debug!(post = %record.post_name, %date, "Filled last date from detected deadline");
        } else if let Some(date) = known {
            record.last_date = date.to_string();
            debug!(post = %record.post_name, %date, "Filled last date from known deadline");
        }
    }
}

pub struct JobNoticeAnalyzer {
    client: Arc<dyn CompletionClient>,
    directory: Arc<OrganizationDirectory>,
    resolver: OrganizationResolver,
    deadlines: LastDateExtractor,
}

impl JobNoticeAnalyzer {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        directory: Arc<OrganizationDirectory>,
        window: DeadlineWindow,
    ) -> Self {
        Self {
            client,
            resolver: OrganizationResolver::new(directory.clone()),
            deadlines: LastDateExtractor::new(directory.clone(), window),
            directory,
        }
    }

    pub fn resolver(&self) -> &OrganizationResolver {
        &self.resolver
    }

    pub fn directory(&self) -> &Arc<OrganizationDirectory> {
        &self.directory
    }

    /// Organization and deadline detection without any model call.
    pub fn prepass(&self, text: &str, hint: &str) -> (Organization, DeadlineOutcome) {
        let organization = self.resolver.resolve(text, hint);
        let deadline = self.deadlines.extract(text, &organization);
        (organization, deadline)
    }

    fn manual_review(&self, hint: &str, unnamed: Organization) -> OrganizationResult {
        let organization = self.resolver.resolve_hint(hint).unwrap_or(unnamed);
        warn!(%organization, "Document appears empty, creating manual review placeholder");
        OrganizationResult::manual_review(organization)
    }

    /// Extracts every posting from one notice.
    ///
    /// Short notices come back as a manual-review placeholder without a model
    /// call. Completion failures and unparseable replies are errors for this
    /// notice only.
    pub async fn analyze(&self, text: &str, hint: &str) -> Result<OrganizationResult, AnalysisError> {
        if text.trim().chars().count() < MIN_CONTENT_CHARS {
            return Ok(self.manual_review(hint, Organization::Unknown));
        }
        self.extract(text, hint).await
    }

    /// Like [`analyze`](Self::analyze) for an extracted PDF.
    ///
    /// Only page text counts towards the minimum length. `unnamed` labels a
    /// manual-review placeholder when the hint names no organization.
    pub async fn analyze_document(
        &self,
        document: &RawDocument,
        hint: &str,
        unnamed: Organization,
    ) -> Result<OrganizationResult, AnalysisError> {
        if document.content_chars() < MIN_CONTENT_CHARS {
            return Ok(self.manual_review(hint, unnamed));
        }
        self.extract(&document.text(), hint).await
    }

    async fn extract(&self, text: &str, hint: &str) -> Result<OrganizationResult, AnalysisError> {
        let (organization, deadline) = self.prepass(text, hint);
        info!(%organization, "Organization resolved");
        match deadline.date {
            Some(date) => info!(%date, source = %deadline.source, "Last date detected"),
            None => warn!("Last date not found in text, relying on fallbacks"),
        }

        let prompt = build_extraction_prompt(text, &organization, deadline.date.as_ref());
        let request = CompletionRequest::extraction(SYSTEM_INSTRUCTION, prompt);

        info!("Sending extraction prompt to completion service");
        let reply = self.client.complete(&request).await?;
        info!(chars = reply.len(), "Received completion");
        debug!(preview = %safe_truncate_utf8(&reply, 500, "..."), "Completion preview");

        let mut positions = parse_records(&reply)?;
        repair_last_dates(
            &mut positions,
            deadline.date,
            self.directory.known_deadline(&organization),
        );

        for record in positions.iter().filter(|r| needs_review(&r.salary)) {
            warn!(post = %record.post_name, "Salary missing");
        }

        let result = OrganizationResult::new(
            organization,
            positions,
            &deadline.date_string(),
            deadline.source.label(),
        );
        info!(
            positions = result.total_positions,
            last_date_coverage = %result.extraction_quality.last_date_coverage,
            salary_coverage = %result.extraction_quality.salary_coverage,
            "Extraction complete"
        );
        Ok(result)
    }

    /// Reads the PDF at `path` and analyzes it.
    pub async fn analyze_file(
        &self,
        path: &Path,
        hint: &str,
        unnamed: Organization,
    ) -> Result<OrganizationResult, AnalysisError> {
        let document = read_pdf_document(path).await?;
        self.analyze_document(&document, hint, unnamed).await
    }
}
