//! MCP server handler implementation

use anyhow::Result;
use rmcp::{
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData as McpError, ServerHandler,
};
use std::sync::Arc;

use crate::context::ServiceContext;
use crate::envelope::JsonObject;
use crate::evm::tools as evm_tools;
use crate::vendors;

const NETWORKS_RESOURCE_URI: &str = "networks://evm";

/// MCP server handler
#[derive(Clone)]
pub struct MultichainMcpHandler {
    ctx: Arc<ServiceContext>,
}

impl MultichainMcpHandler {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Every tool this server exposes, EVM first
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools = evm_tools::get_evm_tools();
        tools.extend(vendors::get_vendor_tools());
        tools
    }

    /// Run one tool call by name.
    ///
    /// Unknown tool names and malformed arguments are protocol errors; chain-side
    /// failures come back as error results.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Option<&JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = name, "tool call");

        if let Some(result) = evm_tools::handle_tool(&self.ctx, name, args).await {
            return result;
        }
        if let Some(result) = vendors::handle_tool(&self.ctx, name, args).await {
            return result;
        }

        Err(McpError::invalid_params(
            format!("Unknown tool: {}", name),
            None,
        ))
    }

    fn networks_json(&self) -> Result<String, McpError> {
        let networks = self.ctx.registry().chains();
        serde_json::to_string_pretty(&networks)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

impl ServerHandler for MultichainMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                prompts: None,
                resources: Some(ResourcesCapability {
                    subscribe: None,
                    list_changed: None,
                }),
                tools: Some(ToolsCapability {
                    list_changed: None,
                }),
                logging: None,
                completions: None,
                experimental: None,
            },
            server_info: Implementation {
                name: "multichain-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Multichain MCP Server".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some("Read-only blockchain queries over MCP. EVM tools take an optional `network` argument (chain name, alias or numeric chain ID; unknown names fall back to Ethereum mainnet unless strict resolution is enabled). Cosmos, Aptos, Sui and Near tools are prefixed with their chain family.".into()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut networks = RawResource::new(NETWORKS_RESOURCE_URI, "Supported EVM Networks");
        networks.description =
            Some("Chain IDs, native currencies and default endpoints of the built-in EVM networks".to_string());
        networks.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![networks.no_annotation()],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match request.uri.as_str() {
            NETWORKS_RESOURCE_URI => Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    text: self.networks_json()?,
                    uri: request.uri,
                    mime_type: Some("application/json".to_string()),
                    meta: None,
                }],
            }),
            _ => Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            )),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments.as_ref()).await
    }
}
