//! MCP server implementation
//!
//! Implements the Model Context Protocol server that exposes object storage
//! as MCP tools, plus the company info resource and job description prompt,
//! via stdio.

use crate::content::{
    ContentLibrary, COMPANY_INFO_DESCRIPTION, COMPANY_INFO_NAME, COMPANY_INFO_URI,
    JOB_DESCRIPTION_PROMPT, JOB_DESCRIPTION_PROMPT_DESCRIPTION,
};
use crate::mcp::protocol::*;
use crate::mcp::tools;
use crate::storage::StorageManager;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub struct McpServer {
    storage: Arc<StorageManager>,
    content: Arc<ContentLibrary>,
    initialized: Arc<Mutex<bool>>,
}

impl McpServer {
    pub fn new(storage: Arc<StorageManager>, content: Arc<ContentLibrary>) -> Self {
        Self {
            storage,
            content,
            initialized: Arc::new(Mutex::new(false)),
        }
    }

    /// Run the MCP server on stdio until the client disconnects
    pub async fn run(&self) -> Result<()> {
        info!("MCP server starting on stdio");

        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, answering on `writer`
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("Client closed connection");
                    return Ok(());
                }
                Err(e) => {
                    error!("Failed to read line: {}", e);
                    return Err(e.into());
                }
            };

            let line = line.trim();

            // Skip empty lines
            if line.is_empty() {
                continue;
            }

            debug!("Received request: {}", line);

            // Notifications get no response
            let Some(response) = self.handle_request(line).await else {
                continue;
            };

            let response_json = serde_json::to_string(&response)?;
            writer.write_all(response_json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;

            debug!("Sent response");
        }
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_request(&self, content: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(content) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request).await;
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    format!("Unsupported jsonrpc version: {}", request.jsonrpc),
                ),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            "resources/list" => self.handle_list_resources(),
            "resources/read" => self.handle_read_resource(request.params).await,
            "prompts/list" => self.handle_list_prompts(),
            "prompts/get" => self.handle_get_prompt(request.params).await,
            _ => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    async fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client finished initialization"),
            "notifications/cancelled" => debug!("Client cancelled a request"),
            other => debug!("Ignoring notification: {}", other),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(params, "initialize")?;
        if let Some(client) = &params.client_info {
            info!("Initializing session for client: {}", client.name);
        }

        *self.initialized.lock().await = true;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                experimental: None,
                logging: None,
                prompts: Some(serde_json::json!({})),
                resources: Some(serde_json::json!({})),
                tools: Some(serde_json::json!({})),
            },
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_result(&result)
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        to_result(&ListToolsResult {
            tools: tools::get_tool_definitions(),
        })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !*self.initialized.lock().await {
            return Err(JsonRpcError::new(INTERNAL_ERROR, "Server not initialized"));
        }

        let params: CallToolParams = parse_params(params, "tool call")?;

        let result =
            tools::call_tool(&params.name, params.arguments, Arc::clone(&self.storage)).await;

        to_result(&result)
    }

    fn handle_list_resources(&self) -> Result<Value, JsonRpcError> {
        to_result(&ListResourcesResult {
            resources: vec![Resource {
                uri: COMPANY_INFO_URI.to_string(),
                name: COMPANY_INFO_NAME.to_string(),
                description: Some(COMPANY_INFO_DESCRIPTION.to_string()),
                mime_type: Some("text/plain".to_string()),
            }],
        })
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = parse_params(params, "resource read")?;

        if params.uri != COMPANY_INFO_URI {
            return Err(JsonRpcError::new(
                INVALID_PARAMS,
                format!("Unknown resource: {}", params.uri),
            ));
        }

        let text = self.content.company_info().await;

        to_result(&ReadResourceResult {
            contents: vec![ResourceContents {
                uri: params.uri,
                mime_type: Some("text/plain".to_string()),
                text,
            }],
        })
    }

    fn handle_list_prompts(&self) -> Result<Value, JsonRpcError> {
        to_result(&ListPromptsResult {
            prompts: vec![Prompt {
                name: JOB_DESCRIPTION_PROMPT.to_string(),
                description: Some(JOB_DESCRIPTION_PROMPT_DESCRIPTION.to_string()),
                arguments: vec![PromptArgument {
                    name: "job_title".to_string(),
                    description: Some("Job Title".to_string()),
                    required: true,
                }],
            }],
        })
    }

    async fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: GetPromptParams = parse_params(params, "prompt get")?;

        if params.name != JOB_DESCRIPTION_PROMPT {
            return Err(JsonRpcError::new(
                INVALID_PARAMS,
                format!("Unknown prompt: {}", params.name),
            ));
        }

        let job_title = params
            .arguments
            .as_ref()
            .and_then(|args| args.get("job_title"))
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing argument: job_title"))?;

        let text = self.content.job_description_prompt(job_title).await;

        to_result(&GetPromptResult {
            description: Some(JOB_DESCRIPTION_PROMPT_DESCRIPTION.to_string()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: ToolContent::Text { text },
            }],
        })
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>, what: &str) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or_else(|| serde_json::json!({}));
    serde_json::from_value(params).map_err(|e| {
        JsonRpcError::new(INVALID_PARAMS, format!("Invalid {} params: {}", what, e))
    })
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| {
        JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize result: {}", e))
    })
}
