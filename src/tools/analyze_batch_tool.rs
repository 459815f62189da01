use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::extraction::analyzer::JobNoticeAnalyzer;
use crate::extraction::batch::BatchProcessor;
use crate::extraction::record::OrganizationResult;
use crate::extraction::report::{ReportAssembler, ReportSet};
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::content_guard::{
    build_error_payload, ERR_INPUT, ERR_REPORT_WRITE, ERR_SERVICE_UNAVAILABLE,
};
use crate::utils::spreadsheet::write_report;

pub static ANALYZE_BATCH_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "analyze-job-notices".to_string(),
    description: "Extract every advertised post from a batch of recruitment notice PDFs and write one Excel sheet per organization (AAU, CSIR, NHM, NTPC, TANUVAS always present).".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "files": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Paths of the notice PDFs to analyze"
            },
            "organizations": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Optional organization hint per file, matched by position"
            }
        },
        "required": ["files"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Analyze Job Notices".to_string()),
        read_only_hint: Some(false),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct AnalyzeBatchParams {
    files: Vec<String>,
    #[serde(default)]
    organizations: Vec<String>,
}

fn summary_line(summary: &mut String, result: &OrganizationResult) {
    let _ = writeln!(
        summary,
        "- {}: {} position(s), last date {} / salary {} ({})",
        result.organization,
        result.total_positions,
        result.extraction_quality.last_date_coverage,
        result.extraction_quality.salary_coverage,
        result.extraction_quality.date_source,
    );
}

/// One line per sheet, other organizations listed apart, then the grand total.
pub fn summarize(report: &ReportSet) -> String {
    let mut summary = String::new();
    for result in report.entries() {
        summary_line(&mut summary, result);
    }
    if !report.additional().is_empty() {
        summary.push_str("Other organizations:\n");
        for result in report.additional() {
            summary_line(&mut summary, result);
        }
    }
    let _ = write!(summary, "Total: {} position(s)", report.total_positions());
    summary
}

pub struct AnalyzeBatchTool {
    processor: Option<BatchProcessor>,
    output_dir: PathBuf,
}

impl AnalyzeBatchTool {
    pub fn new(analyzer: Option<Arc<JobNoticeAnalyzer>>, output_dir: PathBuf) -> Self {
        let processor = analyzer.map(|analyzer| {
            let assembler = ReportAssembler::new(analyzer.directory().clone());
            BatchProcessor::new(analyzer, assembler)
        });
        Self {
            processor,
            output_dir,
        }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let processor = match &self.processor {
            Some(processor) => processor,
            None => {
                return CallToolResult::error(build_error_payload(
                    ERR_SERVICE_UNAVAILABLE,
                    "Mistral API key not configured. Set MISTRAL_API_KEY environment variable.",
                    json!({ "tool": "analyze-job-notices" }),
                ));
            }
        };

        let params = match arguments {
            Some(args) => match serde_json::from_value::<AnalyzeBatchParams>(args) {
                Ok(params) => params,
                Err(e) => {
                    error!("Invalid batch parameters: {}", e);
                    return CallToolResult::error(build_error_payload(
                        ERR_INPUT,
                        &format!("Invalid parameters: {}", e),
                        json!({}),
                    ));
                }
            },
            None => {
                return CallToolResult::error(build_error_payload(
                    ERR_INPUT,
                    "Missing required parameters",
                    json!({ "required": ["files"] }),
                ));
            }
        };

        info!("Analyzing batch of {} file(s)", params.files.len());
        let files: Vec<PathBuf> = params.files.iter().map(PathBuf::from).collect();

        let report = match processor.run(&files, &params.organizations).await {
            Ok(report) => report,
            Err(e) => {
                return CallToolResult::error(build_error_payload(
                    ERR_INPUT,
                    &format!("Batch rejected: {}", e),
                    json!({ "files": params.files.len() }),
                ));
            }
        };

        let output_dir = self.output_dir.clone();
        let to_write = report.clone();
        let written =
            tokio::task::spawn_blocking(move || write_report(&to_write, &output_dir)).await;

        match written {
            Ok(Ok(path)) => CallToolResult::success(format!(
                "Report written to {}\n{}",
                path.display(),
                summarize(&report)
            )),
            Ok(Err(e)) => {
                error!("Failed to write report: {}", e);
                CallToolResult::error(build_error_payload(
                    ERR_REPORT_WRITE,
                    &format!("Failed to write report: {}", e),
                    json!({ "output_dir": self.output_dir.display().to_string() }),
                ))
            }
            Err(e) => {
                error!("Report writer task failed: {}", e);
                CallToolResult::error(build_error_payload(
                    ERR_REPORT_WRITE,
                    "Report writer task failed",
                    json!({ "output_dir": self.output_dir.display().to_string() }),
                ))
            }
        }
    }
}
