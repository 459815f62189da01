use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::extraction::dates::DeadlineWindow;
use crate::extraction::last_date::LastDateExtractor;
use crate::extraction::organization::{OrganizationDirectory, OrganizationResolver};
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::content_guard::{build_error_payload, ERR_INPUT};
use crate::utils::pdf::read_pdf_document;

pub static LAST_DATE_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "detect-last-date".to_string(),
    description: "Detect the issuing organization and the application deadline of a recruitment notice using text heuristics only (no AI call).".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "file": {
                "type": "string",
                "description": "Path of the notice PDF"
            },
            "text": {
                "type": "string",
                "description": "Notice text, used when no file is given"
            },
            "organization": {
                "type": "string",
                "description": "Optional organization hint (e.g. TANUVAS)"
            }
        }
    }),
    annotations: Some(ToolAnnotations {
        title: Some("Detect Last Date".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(false),
    }),
});

#[derive(Debug, Deserialize)]
struct LastDateParams {
    file: Option<String>,
    text: Option<String>,
    #[serde(default)]
    organization: String,
}

pub struct LastDateTool {
    directory: Arc<OrganizationDirectory>,
    resolver: OrganizationResolver,
    deadlines: LastDateExtractor,
}

impl LastDateTool {
    pub fn new(directory: Arc<OrganizationDirectory>, window: DeadlineWindow) -> Self {
        Self {
            resolver: OrganizationResolver::new(directory.clone()),
            deadlines: LastDateExtractor::new(directory.clone(), window),
            directory,
        }
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match arguments.map(serde_json::from_value::<LastDateParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                error!("Invalid last date parameters: {}", e);
                return CallToolResult::error(build_error_payload(
                    ERR_INPUT,
                    &format!("Invalid parameters: {}", e),
                    json!({}),
                ));
            }
            None => {
                return CallToolResult::error(build_error_payload(
                    ERR_INPUT,
                    "Missing required parameters",
                    json!({ "required": ["file", "text"] }),
                ));
            }
        };

        let text = match (&params.file, params.text) {
            (Some(file), _) => match read_pdf_document(Path::new(file)).await {
                Ok(document) => document.text(),
                Err(e) => {
                    return CallToolResult::error(build_error_payload(
                        ERR_INPUT,
                        &e.to_string(),
                        json!({ "file": file }),
                    ));
                }
            },
            (None, Some(text)) => text,
            (None, None) => {
                return CallToolResult::error(build_error_payload(
                    ERR_INPUT,
                    "Either file or text is required",
                    json!({ "required": ["file", "text"] }),
                ));
            }
        };

        let organization = self.resolver.resolve(&text, &params.organization);
        let outcome = self.deadlines.extract(&text, &organization);
        info!(%organization, source = %outcome.source, "Heuristic deadline detection finished");

        let body = json!({
            "organization": organization,
            "last_date": outcome.date,
            "source": outcome.source,
            "known_deadline": self.directory.known_deadline(&organization),
        });
        match serde_json::to_string_pretty(&body) {
            Ok(body) => CallToolResult::success(body),
            Err(e) => CallToolResult::error(format!("Failed to serialize result: {}", e)),
        }
    }
}
