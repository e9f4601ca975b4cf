//! Non-EVM chain vendors
//!
//! Each vendor owns its tool names (by prefix), its endpoint configuration and its
//! response mapping. None of them touch the EVM client cache.

pub mod aptos;
pub mod cosmos;
pub mod http;
pub mod near;
pub mod sui;

use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;

use crate::context::ServiceContext;
use crate::envelope::JsonObject;

/// Get all non-EVM vendor tools
pub fn get_vendor_tools() -> Vec<Tool> {
    let mut tools = cosmos::get_cosmos_tools();
    tools.extend(aptos::get_aptos_tools());
    tools.extend(sui::get_sui_tools());
    tools.extend(near::get_near_tools());
    tools
}

/// Route a tool call to its vendor by name prefix; `None` if no vendor claims it.
pub async fn handle_tool(
    ctx: &ServiceContext,
    name: &str,
    args: Option<&JsonObject>,
) -> Option<Result<CallToolResult, McpError>> {
    match name.split_once('_').map(|(prefix, _)| prefix) {
        Some("cosmos") => cosmos::handle_tool(ctx, name, args).await,
        Some("aptos") => aptos::handle_tool(ctx, name, args).await,
        Some("sui") => sui::handle_tool(ctx, name, args).await,
        Some("near") => near::handle_tool(ctx, name, args).await,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Test that every vendor tool is prefixed by its vendor and unique
    #[test]
    fn test_vendor_tool_names() {
        let tools = get_vendor_tools();
        let mut seen = HashSet::new();
        for tool in &tools {
            let name = tool.name.as_ref();
            assert!(seen.insert(name.to_string()), "duplicate tool {}", name);
            let prefix = name.split_once('_').map(|(p, _)| p).unwrap();
            assert!(["cosmos", "aptos", "sui", "near"].contains(&prefix));
        }
    }

    /// Test that names outside every vendor prefix are not handled
    #[tokio::test]
    async fn test_unclaimed_names() {
        let ctx = ServiceContext::new(crate::config::Config::default()).unwrap();
        assert!(handle_tool(&ctx, "solana_get_balance", None).await.is_none());
        assert!(handle_tool(&ctx, "cosmos_do_nothing", None).await.is_none());
        assert!(handle_tool(&ctx, "noprefix", None).await.is_none());
    }
}
