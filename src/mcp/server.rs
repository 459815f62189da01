use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::transport::{LineTransport, StdioTransport};
use super::types::*;
use crate::extraction::analyzer::JobNoticeAnalyzer;
use crate::extraction::dates::DeadlineWindow;
use crate::extraction::organization::OrganizationDirectory;
use crate::tools::{
    analyze_batch_tool::{AnalyzeBatchTool, ANALYZE_BATCH_TOOL_DEFINITION},
    analyze_single_tool::{AnalyzeSingleTool, ANALYZE_SINGLE_TOOL_DEFINITION},
    last_date_tool::{LastDateTool, LAST_DATE_TOOL_DEFINITION},
};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Everything the tools need, assembled once at startup.
pub struct ServerConfig {
    /// Present only when a completion credential is configured.
    pub analyzer: Option<Arc<JobNoticeAnalyzer>>,
    pub directory: Arc<OrganizationDirectory>,
    pub window: DeadlineWindow,
    pub output_dir: PathBuf,
}

pub struct McpServer {
    batch_tool: AnalyzeBatchTool,
    single_tool: AnalyzeSingleTool,
    last_date_tool: LastDateTool,
    ai_enabled: bool,
    initialized: bool,
}

impl McpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            ai_enabled: config.analyzer.is_some(),
            batch_tool: AnalyzeBatchTool::new(config.analyzer.clone(), config.output_dir),
            single_tool: AnalyzeSingleTool::new(config.analyzer),
            last_date_tool: LastDateTool::new(config.directory, config.window),
            initialized: false,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        let mut transport = StdioTransport::stdio();
        info!("MCP server started and listening on stdio");
        self.serve(&mut transport).await
    }

    /// Answers messages until the peer closes its side.
    pub async fn serve<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            match transport.read_message().await? {
                Some(McpMessage::Request(request)) => {
                    let response = self.handle_request(request).await;
                    transport.write_response(response).await?;
                }
                Some(McpMessage::Notification(notification)) => {
                    self.handle_notification(notification).await;
                }
                Some(McpMessage::Malformed { code, message }) => {
                    let response = McpResponse::failure(Self::ensure_valid_id(None), code, message);
                    transport.write_response(response).await?;
                }
                None => {
                    info!("Client disconnected");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_request(&mut self, request: McpRequest) -> McpResponse {
        let id = Self::ensure_valid_id(request.id.clone());
        if !self.initialized && request.method != "initialize" {
            debug!("{} received before initialization completed", request.method);
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request).await,
            "tools/list" => self.handle_list_tools(request).await,
            "tools/call" => self.handle_call_tool(request).await,
            "ping" => McpResponse::success(id, serde_json::json!({})),
            _ => McpResponse::failure(id, METHOD_NOT_FOUND, "Method not found"),
        }
    }

    async fn handle_notification(&mut self, notification: McpNotification) {
        debug!("Received notification: {}", notification.method);

        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialization completed");
                self.initialized = true;
            }
            "notifications/cancelled" => {
                debug!("Request cancelled notification received");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    fn ensure_valid_id(id: Option<serde_json::Value>) -> serde_json::Value {
        match id {
            Some(serde_json::Value::Null) | None => serde_json::Value::String("0".to_string()),
            Some(value) => value,
        }
    }

    fn respond<T: serde::Serialize>(id: serde_json::Value, result: &T) -> McpResponse {
        match serde_json::to_value(result) {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => McpResponse::failure(id, INTERNAL_ERROR, format!("Serialization failed: {}", e)),
        }
    }

    async fn handle_initialize(&mut self, request: McpRequest) -> McpResponse {
        let id = Self::ensure_valid_id(request.id.clone());

        let Some(params) = request.params else {
            return McpResponse::failure(id, INVALID_PARAMS, "Missing params");
        };
        match serde_json::from_value::<InitializeParams>(params) {
            Ok(init_params) => {
                debug!("Client protocol version: {}", init_params.protocol_version);
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    server_info: ServerInfo {
                        name: "Job Notice Extraction MCP".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        description: Some(
                            "Extracts structured job postings from government recruitment notice PDFs"
                                .to_string(),
                        ),
                    },
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability {
                            list_changed: Some(true),
                        }),
                        logging: Some(serde_json::json!({})),
                    },
                };
                Self::respond(id, &result)
            }
            Err(e) => McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    async fn handle_list_tools(&self, request: McpRequest) -> McpResponse {
        let mut tools = vec![LAST_DATE_TOOL_DEFINITION.clone()];

        // AI tools only when a completion credential is configured
        if self.ai_enabled {
            tools.push(ANALYZE_BATCH_TOOL_DEFINITION.clone());
            tools.push(ANALYZE_SINGLE_TOOL_DEFINITION.clone());
        }

        Self::respond(Self::ensure_valid_id(request.id), &ListToolsResult { tools })
    }

    async fn handle_call_tool(&self, request: McpRequest) -> McpResponse {
        let id = Self::ensure_valid_id(request.id.clone());

        let Some(params) = request.params else {
            return McpResponse::failure(id, INVALID_PARAMS, "Missing params");
        };
        match serde_json::from_value::<CallToolParams>(params) {
            Ok(call_params) => {
                let result = self.execute_tool(call_params).await;
                Self::respond(id, &result)
            }
            Err(e) => McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    async fn execute_tool(&self, params: CallToolParams) -> CallToolResult {
        info!("Calling tool {}", params.name);
        match params.name.as_str() {
            "analyze-job-notices" => self.batch_tool.execute(params.arguments).await,
            "analyze-job-notice" => self.single_tool.execute(params.arguments).await,
            "detect-last-date" => self.last_date_tool.execute(params.arguments).await,
            _ => CallToolResult::error(format!("Tool not found: {}", params.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::analyzer::tests::{analyzer, ScriptedClient};
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn config(with_ai: bool) -> ServerConfig {
        ServerConfig {
            analyzer: with_ai.then(|| Arc::new(analyzer(ScriptedClient::replying("[]")))),
            directory: Arc::new(OrganizationDirectory::default()),
            window: DeadlineWindow::default(),
            output_dir: std::env::temp_dir(),
        }
    }

    /// Feeds `input` lines to a server and returns every response line.
    async fn exchange(with_ai: bool, input: &[Value]) -> Vec<Value> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, mut client_write) = tokio::io::split(client);

        let serve = tokio::spawn(async move {
            let mut transport = LineTransport::new(server_read, server_write);
            McpServer::new(config(with_ai)).serve(&mut transport).await
        });

        for message in input {
            client_write
                .write_all(format!("{}\n", message).as_bytes())
                .await
                .unwrap();
        }
        client_write.write_all(b"{broken\n").await.unwrap();
        client_write.shutdown().await.unwrap();
        drop(client_write);

        serve.await.unwrap().unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let mut responses = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            responses.push(serde_json::from_str(&line).unwrap());
        }
        responses
    }

    fn tool_names(response: &Value) -> Vec<&str> {
        response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn session_without_credential() {
        let responses = exchange(
            false,
            &[
                json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                       "params": {"protocolVersion": "2024-11-05",
                                  "clientInfo": {"name": "test", "version": "0"}}}),
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
                json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                       "params": {"name": "analyze-job-notice", "arguments": {"file": "x.pdf"}}}),
                json!({"jsonrpc": "2.0", "id": 4, "method": "resources/list"}),
                json!({"jsonrpc": "2.0", "id": null, "method": "ping"}),
            ],
        )
        .await;

        assert_eq!(responses.len(), 6);
        assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(tool_names(&responses[1]), ["detect-last-date"]);
        assert_eq!(responses[2]["result"]["isError"], true);
        assert!(responses[2]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("ERR_SERVICE_UNAVAILABLE"));
        assert_eq!(responses[3]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[4]["id"], "0");
        assert_eq!(responses[5]["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn credential_enables_ai_tools() {
        let responses = exchange(
            true,
            &[
                json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                       "params": {"name": "detect-last-date",
                                  "arguments": {"text": "NHM notice. Last Date: 31/01/2025"}}}),
                json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                       "params": {"name": "no-such-tool"}}),
                json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call"}),
            ],
        )
        .await;

        assert_eq!(
            tool_names(&responses[0]),
            ["detect-last-date", "analyze-job-notices", "analyze-job-notice"]
        );
        let text = responses[1]["result"]["content"][0]["text"].as_str().unwrap();
        let detected: Value = serde_json::from_str(text).unwrap();
        assert_eq!(detected["organization"], "NHM");
        assert_eq!(detected["last_date"], "31-01-2025");
        assert_eq!(responses[2]["result"]["isError"], true);
        assert_eq!(responses[3]["error"]["code"], INVALID_PARAMS);
    }
}
