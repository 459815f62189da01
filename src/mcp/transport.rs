use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, BufReader, Stdin, Stdout};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error};

use super::types::{
    McpMessage, McpNotification, McpRequest, McpResponse, INVALID_REQUEST, PARSE_ERROR,
};

/// Newline-delimited JSON-RPC over any byte stream.
pub struct LineTransport<R, W> {
    reader: FramedRead<BufReader<R>, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
}

pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedRead::new(BufReader::new(reader), LinesCodec::new()),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    /// Next message, or `None` at end of input. Blank lines are skipped.
    pub async fn read_message(&mut self) -> Result<Option<McpMessage>> {
        loop {
            let line = match self.reader.next().await {
                Some(line) => line.context("Transport error while reading input")?,
                None => {
                    debug!("EOF reached");
                    return Ok(None);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            debug!("Received: {}", line);
            return Ok(Some(Self::classify(&line)));
        }
    }

    fn classify(line: &str) -> McpMessage {
        let value = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON: {}", e);
                return McpMessage::Malformed {
                    code: PARSE_ERROR,
                    message: format!("Parse error: {}", e),
                };
            }
        };

        // Requests carry an id, notifications do not.
        let is_request = match value.as_object() {
            Some(obj) => obj.contains_key("id"),
            None => {
                error!("Invalid JSON-RPC message structure");
                return McpMessage::Malformed {
                    code: INVALID_REQUEST,
                    message: "Invalid JSON-RPC message structure".to_string(),
                };
            }
        };

        let parsed = if is_request {
            serde_json::from_value::<McpRequest>(value).map(McpMessage::Request)
        } else {
            serde_json::from_value::<McpNotification>(value).map(McpMessage::Notification)
        };
        parsed.unwrap_or_else(|e| {
            error!("Failed to parse message: {}", e);
            McpMessage::Malformed {
                code: INVALID_REQUEST,
                message: format!("Invalid JSON-RPC message: {}", e),
            }
        })
    }

    pub async fn write_response(&mut self, response: McpResponse) -> Result<()> {
        let json = serde_json::to_string(&response)?;
        debug!("Sending: {}", json);

        self.writer
            .send(json)
            .await
            .context("Transport error while writing response")?;

        Ok(())
    }
}
