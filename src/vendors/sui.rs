//! Sui fullnode JSON-RPC

use anyhow::Result;
use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::http::{format_base_units, json_rpc};
use crate::context::ServiceContext;
use crate::envelope::{self, JsonObject};

pub const DEFAULT_SUI_RPC_URL: &str = "https://fullnode.mainnet.sui.io";
const VENDOR: &str = "Sui";
const SUI_DECIMALS: u32 = 9;
const SUI_COIN_TYPE: &str = "0x2::sui::SUI";
const DEFAULT_OBJECT_LIMIT: u32 = 50;
const MAX_VALIDATORS: usize = 20;

async fn rpc<T: DeserializeOwned>(ctx: &ServiceContext, method: &str, params: Value) -> Result<T> {
    let url = ctx.vendor_endpoint(
        "SUI_RPC_URL",
        ctx.config().sui_rpc_url.as_deref(),
        DEFAULT_SUI_RPC_URL,
    );
    json_rpc(ctx.http(), VENDOR, &url, method, params).await
}

fn mist_to_sui(raw: &str) -> String {
    format_base_units(raw, SUI_DECIMALS).unwrap_or_else(|_| raw.to_string())
}

fn validate_address(field: &str, value: &str) -> Result<String, McpError> {
    let trimmed = value.trim();
    let valid = trimmed
        .strip_prefix("0x")
        .is_some_and(|hex| !hex.is_empty() && hex.len() <= 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()));
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(McpError::invalid_params(format!("Invalid Sui {}: {}", field, value), None))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddressParams {
    /// Sui address (0x...)
    pub address: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OwnedObjectsParams {
    /// Sui address (0x...)
    pub address: String,
    /// Max objects to return
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectParams {
    /// Object ID (0x...)
    pub object_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DigestParams {
    /// Transaction digest (base58)
    pub digest: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoinTypeParams {
    /// Coin type (default 0x2::sui::SUI)
    #[serde(default)]
    pub coin_type: Option<String>,
}

impl CoinTypeParams {
    fn coin_type(&self) -> Result<String, McpError> {
        let coin_type = self.coin_type.as_deref().unwrap_or(SUI_COIN_TYPE).trim();
        let mut parts = coin_type.splitn(2, "::");
        let package = parts.next().unwrap_or_default();
        if parts.next().is_none() {
            return Err(McpError::invalid_params(
                format!("Invalid Sui coin type: {}", coin_type),
                None,
            ));
        }
        validate_address("coin type", package)?;
        Ok(coin_type.to_string())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBalance {
    coin_type: String,
    coin_object_count: u64,
    total_balance: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiBalance {
    pub address: String,
    pub balance: String,
    pub balance_raw: String,
    pub coin_object_count: u64,
    pub symbol: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinBalance {
    pub coin_type: String,
    pub name: String,
    pub balance_raw: String,
    /// Only formatted for SUI itself; other coins carry their own decimals
    pub balance: Option<String>,
    pub coin_object_count: u64,
}

impl From<RawBalance> for CoinBalance {
    fn from(raw: RawBalance) -> Self {
        let name = raw
            .coin_type
            .rsplit("::")
            .next()
            .unwrap_or(&raw.coin_type)
            .to_string();
        let balance = (raw.coin_type == SUI_COIN_TYPE).then(|| mist_to_sui(&raw.total_balance));

        Self {
            name,
            balance,
            coin_type: raw.coin_type,
            balance_raw: raw.total_balance,
            coin_object_count: raw.coin_object_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllBalances {
    pub address: String,
    pub token_count: usize,
    pub balances: Vec<CoinBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedObjectsPage {
    #[serde(default)]
    data: Vec<ObjectResponse>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    #[serde(default)]
    data: Option<RawObject>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObject {
    object_id: String,
    version: String,
    #[serde(default, rename = "type")]
    object_type: Option<String>,
    #[serde(default)]
    owner: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    previous_transaction: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub object_id: String,
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedObjects {
    pub address: String,
    pub object_count: usize,
    pub has_more: bool,
    pub objects: Vec<ObjectRef>,
}

impl OwnedObjects {
    fn from_page(address: String, page: OwnedObjectsPage) -> Self {
        let objects: Vec<ObjectRef> = page
            .data
            .into_iter()
            .filter_map(|o| o.data)
            .map(|o| ObjectRef {
                object_id: o.object_id,
                object_type: o.object_type,
                version: o.version,
            })
            .collect();

        Self {
            address,
            object_count: objects.len(),
            has_more: page.has_next_page,
            objects,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiObject {
    pub object_id: String,
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    pub version: String,
    pub owner: Option<Value>,
    pub previous_transaction: Option<String>,
    pub content: Option<Value>,
}

impl SuiObject {
    fn from_response(response: ObjectResponse) -> Result<Self> {
        match (response.data, response.error) {
            (Some(o), _) => Ok(Self {
                object_id: o.object_id,
                object_type: o.object_type,
                version: o.version,
                owner: o.owner,
                previous_transaction: o.previous_transaction,
                content: o.content,
            }),
            (None, Some(error)) => anyhow::bail!("Object unavailable: {}", error),
            (None, None) => anyhow::bail!("Object not found"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransactionBlock {
    digest: String,
    #[serde(default)]
    timestamp_ms: Option<String>,
    #[serde(default)]
    checkpoint: Option<String>,
    #[serde(default)]
    effects: Option<Value>,
    #[serde(default)]
    transaction: Option<Value>,
    #[serde(default)]
    balance_changes: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiTransaction {
    pub digest: String,
    pub timestamp_ms: Option<String>,
    pub checkpoint: Option<String>,
    /// "success" or "failure"
    pub status: Option<String>,
    pub error: Option<String>,
    pub gas_used: Option<Value>,
    pub balance_changes: Vec<Value>,
    pub transaction: Option<Value>,
}

impl From<RawTransactionBlock> for SuiTransaction {
    fn from(raw: RawTransactionBlock) -> Self {
        let effects = raw.effects.as_ref();
        let status = |key: &str| {
            effects
                .and_then(|e| e.get("status"))
                .and_then(|s| s.get(key))
                .and_then(Value::as_str)
                .map(String::from)
        };

        Self {
            status: status("status"),
            error: status("error"),
            gas_used: effects.and_then(|e| e.get("gasUsed")).cloned(),
            digest: raw.digest,
            timestamp_ms: raw.timestamp_ms,
            checkpoint: raw.checkpoint,
            balance_changes: raw.balance_changes.unwrap_or_default(),
            transaction: raw.transaction,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub checkpoint_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    pub reference_gas_price: String,
    pub gas_price_sui: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinMetadata {
    #[serde(default)]
    pub coin_type: String,
    pub decimals: u32,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSupply {
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSupply {
    pub coin_type: String,
    pub total_supply: String,
    /// Only formatted for SUI itself
    pub total_supply_formatted: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSystemState {
    #[serde(default)]
    epoch: Option<String>,
    #[serde(default)]
    active_validators: Vec<RawValidator>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValidator {
    name: String,
    sui_address: String,
    staking_pool_sui_balance: String,
    /// Basis points
    commission_rate: String,
    voting_power: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub name: String,
    pub address: String,
    pub staked_sui: String,
    /// Percent
    pub commission_rate: String,
    pub voting_power: String,
}

impl From<RawValidator> for Validator {
    fn from(raw: RawValidator) -> Self {
        Self {
            staked_sui: mist_to_sui(&raw.staking_pool_sui_balance),
            commission_rate: format_base_units(&raw.commission_rate, 2)
                .unwrap_or_else(|_| raw.commission_rate.clone()),
            name: raw.name,
            address: raw.sui_address,
            voting_power: raw.voting_power,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validators {
    pub epoch: Option<String>,
    pub validator_count: usize,
    pub validators: Vec<Validator>,
}

impl From<RawSystemState> for Validators {
    fn from(state: RawSystemState) -> Self {
        Self {
            epoch: state.epoch,
            validator_count: state.active_validators.len(),
            validators: state
                .active_validators
                .into_iter()
                .take(MAX_VALIDATORS)
                .map(Validator::from)
                .collect(),
        }
    }
}

/// Get Sui MCP tools
pub fn get_sui_tools() -> Vec<Tool> {
    vec![
        envelope::tool::<AddressParams>("sui_get_balance", "Get the SUI balance of an address."),
        envelope::tool::<AddressParams>(
            "sui_get_all_balances",
            "Get every coin balance held by a Sui address.",
        ),
        envelope::tool::<OwnedObjectsParams>(
            "sui_get_owned_objects",
            "List objects (coins, NFTs, ...) owned by a Sui address.",
        ),
        envelope::tool::<ObjectParams>(
            "sui_get_object",
            "Get a Sui object with its type, owner and content.",
        ),
        envelope::tool::<DigestParams>(
            "sui_get_transaction",
            "Get a Sui transaction block by digest, including effects and balance changes.",
        ),
        envelope::tool::<NoParams>(
            "sui_get_latest_checkpoint",
            "Get the latest Sui checkpoint sequence number.",
        ),
        envelope::tool::<NoParams>("sui_get_gas_price", "Get the current Sui reference gas price."),
        envelope::tool::<CoinTypeParams>(
            "sui_get_coin_metadata",
            "Get name, symbol, decimals and description of a Sui coin type.",
        ),
        envelope::tool::<CoinTypeParams>(
            "sui_get_total_supply",
            "Get the total supply of a Sui coin type.",
        ),
        envelope::tool::<NoParams>(
            "sui_get_validators",
            "List the active Sui validators (first 20) with stake and commission.",
        ),
    ]
}

pub async fn handle_tool(
    ctx: &ServiceContext,
    name: &str,
    args: Option<&JsonObject>,
) -> Option<Result<CallToolResult, McpError>> {
    let result = match name {
        "sui_get_balance" => handle_get_balance(ctx, args).await,
        "sui_get_all_balances" => handle_get_all_balances(ctx, args).await,
        "sui_get_owned_objects" => handle_get_owned_objects(ctx, args).await,
        "sui_get_object" => handle_get_object(ctx, args).await,
        "sui_get_transaction" => handle_get_transaction(ctx, args).await,
        "sui_get_latest_checkpoint" => handle_get_latest_checkpoint(ctx).await,
        "sui_get_gas_price" => handle_get_gas_price(ctx).await,
        "sui_get_coin_metadata" => handle_get_coin_metadata(ctx, args).await,
        "sui_get_total_supply" => handle_get_total_supply(ctx, args).await,
        "sui_get_validators" => handle_get_validators(ctx).await,
        _ => return None,
    };
    Some(result)
}

pub async fn handle_get_balance(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address("address", &params.address)?;

    envelope::run("fetching balance", async {
        let raw: RawBalance = rpc(ctx, "suix_getBalance", json!([address, SUI_COIN_TYPE])).await?;
        Ok(SuiBalance {
            address: address.clone(),
            balance: mist_to_sui(&raw.total_balance),
            balance_raw: raw.total_balance,
            coin_object_count: raw.coin_object_count,
            symbol: "SUI",
        })
    })
    .await
}

pub async fn handle_get_all_balances(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address("address", &params.address)?;

    envelope::run("fetching balances", async {
        let raw: Vec<RawBalance> = rpc(ctx, "suix_getAllBalances", json!([address])).await?;
        let balances: Vec<CoinBalance> = raw.into_iter().map(CoinBalance::from).collect();
        Ok(AllBalances {
            address: address.clone(),
            token_count: balances.len(),
            balances,
        })
    })
    .await
}

pub async fn handle_get_owned_objects(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: OwnedObjectsParams = envelope::parse_args(args)?;
    let address = validate_address("address", &params.address)?;
    let limit = params.limit.unwrap_or(DEFAULT_OBJECT_LIMIT);

    envelope::run("fetching owned objects", async {
        let query = json!({ "options": { "showType": true } });
        let page: OwnedObjectsPage = rpc(
            ctx,
            "suix_getOwnedObjects",
            json!([address, query, Value::Null, limit]),
        )
        .await?;
        Ok(OwnedObjects::from_page(address.clone(), page))
    })
    .await
}

pub async fn handle_get_object(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ObjectParams = envelope::parse_args(args)?;
    let object_id = validate_address("objectId", &params.object_id)?;

    envelope::run("fetching object", async {
        let options = json!({
            "showType": true,
            "showContent": true,
            "showOwner": true,
            "showPreviousTransaction": true
        });
        let response: ObjectResponse = rpc(ctx, "sui_getObject", json!([object_id, options])).await?;
        SuiObject::from_response(response)
    })
    .await
}

pub async fn handle_get_transaction(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: DigestParams = envelope::parse_args(args)?;
    let digest = params.digest.trim();
    if digest.is_empty() {
        return Err(McpError::invalid_params("digest must not be empty", None));
    }

    envelope::run("fetching transaction", async {
        let options = json!({
            "showInput": true,
            "showEffects": true,
            "showBalanceChanges": true
        });
        let raw: RawTransactionBlock =
            rpc(ctx, "sui_getTransactionBlock", json!([digest, options])).await?;
        Ok(SuiTransaction::from(raw))
    })
    .await
}

pub async fn handle_get_latest_checkpoint(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    envelope::run("fetching checkpoint", async {
        let number: String = rpc(ctx, "sui_getLatestCheckpointSequenceNumber", json!([])).await?;
        Ok(Checkpoint {
            checkpoint_number: number,
        })
    })
    .await
}

pub async fn handle_get_gas_price(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    envelope::run("fetching gas price", async {
        // Returned as a decimal string
        let price: String = rpc(ctx, "suix_getReferenceGasPrice", json!([])).await?;
        Ok(GasPrice {
            gas_price_sui: mist_to_sui(&price),
            reference_gas_price: price,
        })
    })
    .await
}

pub async fn handle_get_coin_metadata(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: CoinTypeParams = envelope::parse_args(args)?;
    let coin_type = params.coin_type()?;

    envelope::run("fetching coin metadata", async {
        // Unknown coin types come back as a null result
        let mut metadata: CoinMetadata = rpc(ctx, "suix_getCoinMetadata", json!([coin_type])).await?;
        metadata.coin_type = coin_type.clone();
        Ok(metadata)
    })
    .await
}

pub async fn handle_get_total_supply(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: CoinTypeParams = envelope::parse_args(args)?;
    let coin_type = params.coin_type()?;

    envelope::run("fetching total supply", async {
        let supply: RawSupply = rpc(ctx, "suix_getTotalSupply", json!([coin_type])).await?;
        Ok(TotalSupply {
            total_supply_formatted: (coin_type == SUI_COIN_TYPE).then(|| mist_to_sui(&supply.value)),
            coin_type: coin_type.clone(),
            total_supply: supply.value,
        })
    })
    .await
}

pub async fn handle_get_validators(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    envelope::run("fetching validators", async {
        let state: RawSystemState = rpc(ctx, "suix_getLatestSuiSystemState", json!([])).await?;
        Ok(Validators::from(state))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use mockito::Matcher;

    const ADDRESS: &str = "0x02a212de6a9dfa3a69e22387acfbafbb1a9e591bd9d636e7895dcfc8de05f331";

    fn context_for(url: String) -> ServiceContext {
        let config = Config {
            sui_rpc_url: Some(url),
            ..Config::default()
        };
        ServiceContext::new(config).unwrap()
    }

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn body(result: &CallToolResult) -> Value {
        serde_json::from_str(envelope::first_text(result).unwrap()).unwrap()
    }

    async fn mock_rpc(server: &mut mockito::ServerGuard, method: &str, result: Value) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create_async()
            .await
    }

    /// Test that the balance is formatted in whole units
    #[tokio::test]
    async fn test_get_balance() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_rpc(
            &mut server,
            "suix_getBalance",
            json!({"coinType": SUI_COIN_TYPE, "coinObjectCount": 3, "totalBalance": "1500000000", "lockedBalance": {}}),
        )
        .await;
        let ctx = context_for(server.url());

        let result = handle_get_balance(&ctx, Some(&args(json!({"address": ADDRESS}))))
            .await
            .unwrap();
        let data = body(&result);
        assert_eq!(data["balance"], "1.5");
        assert_eq!(data["balanceRaw"], "1500000000");
        assert_eq!(data["coinObjectCount"], 3);
    }

    /// Test that only SUI balances are formatted
    #[tokio::test]
    async fn test_get_all_balances() {
        let mut server = mockito::Server::new_async().await;
        let usdc = "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
        let _m = mock_rpc(
            &mut server,
            "suix_getAllBalances",
            json!([
                {"coinType": SUI_COIN_TYPE, "coinObjectCount": 1, "totalBalance": "2000000000", "lockedBalance": {}},
                {"coinType": usdc, "coinObjectCount": 2, "totalBalance": "5000000", "lockedBalance": {}}
            ]),
        )
        .await;
        let ctx = context_for(server.url());

        let result = handle_get_all_balances(&ctx, Some(&args(json!({"address": ADDRESS}))))
            .await
            .unwrap();
        let data = body(&result);
        assert_eq!(data["tokenCount"], 2);
        assert_eq!(data["balances"][0]["balance"], "2");
        assert_eq!(data["balances"][1]["name"], "USDC");
        assert!(data["balances"][1]["balance"].is_null());
    }

    /// Test that a missing object is reported as an error
    #[tokio::test]
    async fn test_get_object_missing() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_rpc(
            &mut server,
            "sui_getObject",
            json!({"error": {"code": "notExists", "object_id": "0x5"}}),
        )
        .await;
        let ctx = context_for(server.url());

        let result = handle_get_object(&ctx, Some(&args(json!({"objectId": "0x5"}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(envelope::first_text(&result).unwrap().contains("notExists"));
    }

    /// Test that the transaction status is taken from effects
    #[tokio::test]
    async fn test_get_transaction_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_rpc(
            &mut server,
            "sui_getTransactionBlock",
            json!({
                "digest": "8RtGnkDeR1m7rCZcAhNkpG6Bqjs4LwnS9ofnNk3GfbVj",
                "timestampMs": "1700000000000",
                "checkpoint": "20000000",
                "effects": {
                    "status": {"status": "failure", "error": "InsufficientGas"},
                    "gasUsed": {"computationCost": "1000000", "storageCost": "0", "storageRebate": "0"}
                },
                "balanceChanges": []
            }),
        )
        .await;
        let ctx = context_for(server.url());

        let result = handle_get_transaction(
            &ctx,
            Some(&args(json!({"digest": "8RtGnkDeR1m7rCZcAhNkpG6Bqjs4LwnS9ofnNk3GfbVj"}))),
        )
        .await
        .unwrap();
        let data = body(&result);
        assert_eq!(data["status"], "failure");
        assert_eq!(data["error"], "InsufficientGas");
        assert_eq!(data["gasUsed"]["computationCost"], "1000000");
    }

    /// Test that the gas price is returned from the node
    #[tokio::test]
    async fn test_get_gas_price() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_rpc(&mut server, "suix_getReferenceGasPrice", json!("750")).await;
        let ctx = context_for(server.url());

        let result = handle_get_gas_price(&ctx).await.unwrap();
        let data = body(&result);
        assert_eq!(data["referenceGasPrice"], "750");
        assert_eq!(data["gasPriceSui"], "0.00000075");
    }

    /// Test that JSON-RPC errors surface as error results
    #[tokio::test]
    async fn test_rpc_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"node is syncing"}}"#)
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_get_latest_checkpoint(&ctx).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(envelope::first_text(&result).unwrap().contains("node is syncing"));
    }

    /// Test that an invalid address is rejected before any request
    #[tokio::test]
    async fn test_invalid_address() {
        let ctx = ServiceContext::new(Config::default()).unwrap();
        let err = handle_get_balance(&ctx, Some(&args(json!({"address": "sui1abc"}))))
            .await
            .unwrap_err();
        assert!(err.message.contains("Invalid Sui address"));
    }

    /// Test that coin metadata defaults to SUI and carries the coin type
    #[tokio::test]
    async fn test_get_coin_metadata() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"method": "suix_getCoinMetadata"})),
                Matcher::Regex(r#""params":\["0x2::sui::SUI"\]"#.to_string()),
            ]))
            .with_body(
                json!({"jsonrpc": "2.0", "id": 1, "result": {
                    "decimals": 9,
                    "name": "Sui",
                    "symbol": "SUI",
                    "description": "",
                    "iconUrl": null,
                    "id": "0x9258181f5ceac8dbffb7030890243caed69a9599d2886d957a9cb7656af3bdb3"
                }})
                .to_string(),
            )
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_tool(&ctx, "sui_get_coin_metadata", Some(&args(json!({}))))
            .await
            .unwrap()
            .unwrap();
        m.assert_async().await;
        let data = body(&result);
        assert_eq!(data["coinType"], SUI_COIN_TYPE);
        assert_eq!(data["symbol"], "SUI");
        assert_eq!(data["decimals"], 9);
    }

    /// Test that a coin type without metadata is an error result
    #[tokio::test]
    async fn test_get_coin_metadata_missing() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_rpc(&mut server, "suix_getCoinMetadata", Value::Null).await;
        let ctx = context_for(server.url());

        let result = handle_get_coin_metadata(&ctx, Some(&args(json!({"coinType": "0xabc::fake::FAKE"}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(envelope::first_text(&result)
            .unwrap()
            .contains("no result for suix_getCoinMetadata"));
    }

    /// Test that malformed coin types are rejected before any request
    #[tokio::test]
    async fn test_coin_type_validation() {
        let ctx = ServiceContext::new(Config::default()).unwrap();
        for coin_type in ["SUI", "sui::SUI", "0xzz::sui::SUI"] {
            let err = handle_get_total_supply(&ctx, Some(&args(json!({"coinType": coin_type}))))
                .await
                .unwrap_err();
            assert!(err.message.contains("Invalid Sui coin type"), "{}", err.message);
        }
    }

    /// Test that SUI total supply is formatted and other coins are left raw
    #[tokio::test]
    async fn test_get_total_supply() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_rpc(&mut server, "suix_getTotalSupply", json!({"value": "10000000000000000000"})).await;
        let ctx = context_for(server.url());

        let result = handle_get_total_supply(&ctx, Some(&args(json!({})))).await.unwrap();
        let data = body(&result);
        assert_eq!(data["totalSupply"], "10000000000000000000");
        assert_eq!(data["totalSupplyFormatted"], "10000000000");

        let other = "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
        let result = handle_get_total_supply(&ctx, Some(&args(json!({"coinType": other}))))
            .await
            .unwrap();
        let data = body(&result);
        assert_eq!(data["coinType"], other);
        assert!(data["totalSupplyFormatted"].is_null());
    }

    /// Test that validators are capped at 20 with commission in percent
    #[tokio::test]
    async fn test_get_validators() {
        let mut server = mockito::Server::new_async().await;
        let validators: Vec<Value> = (0..25)
            .map(|i| {
                json!({
                    "name": format!("validator-{}", i),
                    "suiAddress": format!("0x{:064x}", i),
                    "stakingPoolSuiBalance": "2500000000000000",
                    "commissionRate": "200",
                    "votingPower": "40"
                })
            })
            .collect();
        let _m = mock_rpc(
            &mut server,
            "suix_getLatestSuiSystemState",
            json!({"epoch": "512", "activeValidators": validators}),
        )
        .await;
        let ctx = context_for(server.url());

        let result = handle_get_validators(&ctx).await.unwrap();
        let data = body(&result);
        assert_eq!(data["validatorCount"], 25);
        assert_eq!(data["validators"].as_array().unwrap().len(), 20);
        assert_eq!(data["validators"][0]["stakedSui"], "2500000");
        assert_eq!(data["validators"][0]["commissionRate"], "2");
        assert_eq!(data["epoch"], "512");
    }
}
