//! End-to-end tool dispatch through the MCP handler against mocked endpoints

use std::collections::HashMap;
use std::sync::Arc;

use mockito::Matcher;
use multichain_mcp::config::Config;
use multichain_mcp::envelope::{first_text, JsonObject};
use multichain_mcp::evm::{ChainRegistry, ClientCache};
use multichain_mcp::{MultichainMcpHandler, ServiceContext};
use serde_json::{json, Value};

fn handler_with_evm(overrides: HashMap<u64, String>) -> (MultichainMcpHandler, Arc<ChainRegistry>) {
    let registry = Arc::new(ChainRegistry::builtin().clone());
    let clients = ClientCache::new(Arc::clone(&registry))
        .with_env_lookup(|_| None)
        .with_overrides(overrides);
    let ctx = ServiceContext::with_clients(Config::default(), clients).unwrap();
    (MultichainMcpHandler::new(ctx), registry)
}

fn args(value: Value) -> JsonObject {
    value.as_object().cloned().unwrap()
}

async fn mock_method(server: &mut mockito::ServerGuard, method: &str, result: Value) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::Regex(format!(r#""method":"{}""#, method)))
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string())
        .create_async()
        .await
}

/// Test that every spelling of a chain reaches the same cached client
#[tokio::test]
async fn test_aliases_share_one_client() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(&mut server, "eth_gasPrice", json!("0x3b9aca00")).await;
    let (handler, _) = handler_with_evm(HashMap::from([(97, server.url())]));

    for network in [json!("bsc-testnet"), json!("BSCTESTNET"), json!(" bsc_testnet "), json!(97), json!("97")] {
        let result = handler
            .dispatch("get_gas_price", Some(&args(json!({ "network": network }))))
            .await
            .unwrap();
        let data: Value = serde_json::from_str(first_text(&result).unwrap()).unwrap();
        assert_eq!(data["chainId"], 97, "network {}", network);
        assert_eq!(data["gasPriceWei"], "1000000000");
    }

    let clients = handler.context().clients();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients.constructed(), 1);
}

/// Test that typos and omissions land on Ethereum mainnet
#[tokio::test]
async fn test_unknown_network_falls_back_to_mainnet() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(&mut server, "eth_getTransactionCount", json!("0x2a")).await;
    let (handler, _) = handler_with_evm(HashMap::from([(1, server.url())]));

    for call in [
        json!({"address": "0x0000000000000000000000000000000000000001", "network": "ethereun"}),
        json!({"address": "0x0000000000000000000000000000000000000001"}),
    ] {
        let result = handler
            .dispatch("get_transaction_count", Some(&args(call)))
            .await
            .unwrap();
        let data: Value = serde_json::from_str(first_text(&result).unwrap()).unwrap();
        assert_eq!(data["chainId"], 1);
        assert_eq!(data["network"], "Ethereum");
        assert_eq!(data["transactionCount"], "42");
    }
    assert_eq!(handler.context().clients().constructed(), 1);
}

/// Test concurrent first requests across chains build one client per chain
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_builds_once_per_chain() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(&mut server, "eth_blockNumber", json!("0x10")).await;
    let _c = mock_method(&mut server, "eth_chainId", json!("0x1")).await;
    let (handler, _) = handler_with_evm(HashMap::from([
        (1, server.url()),
        (8453, server.url()),
        (10, server.url()),
    ]));

    let mut tasks = Vec::new();
    for i in 0..24 {
        let handler = handler.clone();
        let network = ["mainnet", "base", "op"][i % 3];
        tasks.push(tokio::spawn(async move {
            handler
                .dispatch("get_chain_info", Some(&args(json!({ "network": network }))))
                .await
                .unwrap()
        }));
    }
    for task in tasks {
        let result = task.await.unwrap();
        assert_ne!(result.is_error, Some(true));
    }

    let clients = handler.context().clients();
    assert_eq!(clients.len(), 3);
    assert_eq!(clients.constructed(), 3);
}

/// Test that unregistered numeric chain IDs are usable once an endpoint is configured
#[tokio::test]
async fn test_unregistered_chain_with_override() {
    let mut server = mockito::Server::new_async().await;
    let _m = mock_method(&mut server, "eth_getBalance", json!("0x0")).await;
    let (handler, registry) = handler_with_evm(HashMap::from([(31337, server.url())]));
    assert!(registry.get(31337).is_none());

    let result = handler
        .dispatch(
            "get_native_balance",
            Some(&args(json!({"address": "0x0000000000000000000000000000000000000001", "network": 31337}))),
        )
        .await
        .unwrap();
    let data: Value = serde_json::from_str(first_text(&result).unwrap()).unwrap();
    assert_eq!(data["chainId"], 31337);
    assert!(data["network"].is_null());
    assert!(data["symbol"].is_null());
    assert_eq!(data["balanceWei"], "0");
}

/// Test that vendor tools route through the same dispatch entry point
#[tokio::test]
async fn test_vendor_dispatch() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "network_info"})))
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": "dontcare",
                "result": {
                    "active_peers": [{"id": "ed25519:peer", "addr": "10.0.0.1:24567"}],
                    "num_active_peers": 1,
                    "sent_bytes_per_sec": 1000,
                    "received_bytes_per_sec": 2000,
                    "known_producers": []
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let config = Config {
        near_rpc_url: Some(server.url()),
        ..Config::default()
    };
    let handler = MultichainMcpHandler::new(ServiceContext::new(config).unwrap());

    let result = handler.dispatch("near_get_network_info", None).await.unwrap();
    let data: Value = serde_json::from_str(first_text(&result).unwrap()).unwrap();
    assert_eq!(data["activePeers"], 1);
    assert_eq!(data["peers"].as_array().unwrap().len(), 1);

    // Vendor calls never touch the EVM client cache
    assert!(handler.context().clients().is_empty());
}

/// Test that strict resolution from the config rejects unknown names
#[tokio::test]
async fn test_strict_mode_from_config() {
    let config = Config {
        strict_network_resolution: true,
        ..Config::default()
    };
    let handler = MultichainMcpHandler::new(ServiceContext::new(config).unwrap());

    let err = handler
        .dispatch("resolve_network", Some(&args(json!({"network": "polygon-mumbai"}))))
        .await
        .unwrap_err();
    assert!(err.message.contains("polygon-mumbai"));

    let ok = handler
        .dispatch("resolve_network", Some(&args(json!({"network": "amoy"}))))
        .await
        .unwrap();
    let data: Value = serde_json::from_str(first_text(&ok).unwrap()).unwrap();
    assert_eq!(data["chainId"], 80002);
}
