use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::extraction::analyzer::{AnalysisError, JobNoticeAnalyzer};
use crate::extraction::organization::Organization;
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::content_guard::{
    build_error_payload, ERR_INPUT, ERR_RESPONSE_PARSE, ERR_SERVICE_UNAVAILABLE,
};

pub static ANALYZE_SINGLE_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "analyze-job-notice".to_string(),
    description: "Extract every advertised post from one recruitment notice PDF and return the records with extraction quality metadata as JSON.".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "file": {
                "type": "string",
                "description": "Path of the notice PDF"
            },
            "organization": {
                "type": "string",
                "description": "Optional organization hint (e.g. NTPC)"
            }
        },
        "required": ["file"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Analyze Job Notice".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
struct AnalyzeSingleParams {
    file: String,
    #[serde(default)]
    organization: String,
}

pub struct AnalyzeSingleTool {
    analyzer: Option<Arc<JobNoticeAnalyzer>>,
}

impl AnalyzeSingleTool {
    pub fn new(analyzer: Option<Arc<JobNoticeAnalyzer>>) -> Self {
        Self { analyzer }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let analyzer = match &self.analyzer {
            Some(analyzer) => analyzer,
            None => {
                return CallToolResult::error(build_error_payload(
                    ERR_SERVICE_UNAVAILABLE,
                    "Mistral API key not configured. Set MISTRAL_API_KEY environment variable.",
                    json!({ "tool": "analyze-job-notice" }),
                ));
            }
        };

        let params = match arguments {
            Some(args) => match serde_json::from_value::<AnalyzeSingleParams>(args) {
                Ok(params) => params,
                Err(e) => {
                    error!("Invalid notice parameters: {}", e);
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
                    json!({ "required": ["file"] }),
                ));
            }
        };

        info!("Analyzing notice {}", params.file);

        match analyzer
            .analyze_file(Path::new(&params.file), &params.organization, Organization::Unknown)
            .await
        {
            Ok(result) => match serde_json::to_string_pretty(&result) {
                Ok(body) => CallToolResult::success(body),
                Err(e) => CallToolResult::error(format!("Failed to serialize result: {}", e)),
            },
            Err(e) => {
                let code = match &e {
                    AnalysisError::Input(_) => ERR_INPUT,
                    AnalysisError::ServiceUnavailable(_) => ERR_SERVICE_UNAVAILABLE,
                    AnalysisError::ResponseParse(_) => ERR_RESPONSE_PARSE,
                };
                warn!("Analysis of {} failed: {}", params.file, e);
                CallToolResult::error(build_error_payload(
                    code,
                    &e.to_string(),
                    json!({ "file": params.file }),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::analyzer::tests::{analyzer, ScriptedClient};

    fn tool(client: Arc<ScriptedClient>) -> AnalyzeSingleTool {
        AnalyzeSingleTool::new(Some(Arc::new(analyzer(client))))
    }

    #[tokio::test]
    async fn unconfigured_tool_reports_service_unavailable() {
        let result = AnalyzeSingleTool::new(None)
            .execute(Some(json!({ "file": "a.pdf" })))
            .await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.contains(ERR_SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn missing_file_is_an_input_error() {
        let client = ScriptedClient::replying("[]");
        let result = tool(client.clone())
            .execute(Some(json!({ "file": "/nonexistent/csir.pdf", "organization": "CSIR" })))
            .await;

        assert_eq!(result.is_error, Some(true));
        let (_, payload) = result.content[0].text.split_once('\n').unwrap();
        let payload: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(payload["code"], ERR_INPUT);
        assert_eq!(payload["details"]["file"], "/nonexistent/csir.pdf");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn file_is_required() {
        let result = tool(ScriptedClient::replying("[]"))
            .execute(Some(json!({ "organization": "NTPC" })))
            .await;
        assert!(result.content[0].text.starts_with("Invalid parameters"));
    }
}
