//! Aptos fullnode REST API

use anyhow::{Context, Result};
use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::{format_base_units, get_json, post_json};
use crate::context::ServiceContext;
use crate::envelope::{self, JsonObject};

pub const DEFAULT_APTOS_API_URL: &str = "https://fullnode.mainnet.aptoslabs.com/v1";
const VENDOR: &str = "Aptos";
const APT_DECIMALS: u32 = 8;
const APT_COIN_STORE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";
const DEFAULT_RESOURCE_LIMIT: u32 = 100;
const DEFAULT_PAGE_LIMIT: u32 = 25;
const APT_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";
const MAX_TYPE_TAG_LEN: usize = 512;

fn base_url(ctx: &ServiceContext) -> String {
    ctx.vendor_endpoint(
        "APTOS_API_URL",
        ctx.config().aptos_api_url.as_deref(),
        DEFAULT_APTOS_API_URL,
    )
}

async fn fetch<T: DeserializeOwned>(ctx: &ServiceContext, path: &str) -> Result<T> {
    let url = format!("{}{}", base_url(ctx), path);
    get_json(ctx.http(), VENDOR, &url).await
}

async fn post<T: DeserializeOwned>(ctx: &ServiceContext, path: &str, body: &Value) -> Result<T> {
    let url = format!("{}{}", base_url(ctx), path);
    post_json(ctx.http(), VENDOR, &url, body).await
}

/// Aptos addresses are 0x-prefixed hex of at most 64 digits
fn validate_address(address: &str) -> Result<&str, McpError> {
    let trimmed = address.trim();
    let valid = trimmed
        .strip_prefix("0x")
        .is_some_and(|hex| !hex.is_empty() && hex.len() <= 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()));
    if valid {
        Ok(trimmed)
    } else {
        Err(McpError::invalid_params(
            format!("Invalid Aptos address: {}", address),
            None,
        ))
    }
}

/// Move type tags and function ids: `0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>`.
///
/// These end up in URL paths, so separators other than `::` are rejected.
fn validate_type_tag<'a>(kind: &str, value: &'a str) -> Result<&'a str, McpError> {
    let trimmed = value.trim();
    let head = trimmed.split("::").next().unwrap_or_default();
    let valid = trimmed.len() <= MAX_TYPE_TAG_LEN
        && trimmed.contains("::")
        && validate_address(head).is_ok()
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'<' | b'>' | b',' | b' '));
    if valid {
        Ok(trimmed)
    } else {
        Err(McpError::invalid_params(
            format!("Invalid Aptos {}: {}", kind, value),
            None,
        ))
    }
}

fn validate_identifier(value: &str) -> Result<&str, McpError> {
    let trimmed = value.trim();
    let mut bytes = trimmed.bytes();
    let valid = bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(trimmed)
    } else {
        Err(McpError::invalid_params(
            format!("Invalid Aptos field name: {}", value),
            None,
        ))
    }
}

/// Aptos timestamps are microseconds; results carry milliseconds.
fn micros_to_millis(micros: Option<&str>) -> Option<u64> {
    micros.and_then(|m| m.parse::<u64>().ok()).map(|m| m / 1000)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddressParams {
    /// Aptos account address (0x...)
    pub address: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResourcesParams {
    /// Aptos account address (0x...)
    pub address: String,
    /// Max resources to return
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AccountTransactionsParams {
    /// Aptos account address (0x...)
    pub address: String,
    /// Max transactions to return (default 25)
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventsParams {
    /// Account address holding the event handle
    pub address: String,
    /// Event handle struct, e.g. 0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>
    pub event_handle: String,
    /// Field name of the event handle, e.g. deposit_events
    pub field_name: String,
    /// Max events to return (default 25)
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewFunctionParams {
    /// Function identifier, e.g. 0x1::coin::balance
    pub function: String,
    /// Type arguments
    #[serde(default)]
    pub type_arguments: Vec<String>,
    /// Function arguments
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoinInfoParams {
    /// Coin type (default 0x1::aptos_coin::AptosCoin)
    #[serde(default)]
    pub coin_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TxParams {
    /// Transaction hash
    pub hash: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptBalance {
    pub address: String,
    pub balance: String,
    pub balance_raw: String,
    pub symbol: &'static str,
}

impl AptBalance {
    fn from_resources(address: &str, resources: &[Resource]) -> Self {
        let raw = resources
            .iter()
            .find(|r| r.resource_type == APT_COIN_STORE)
            .and_then(|r| r.data.pointer("/coin/value"))
            .and_then(Value::as_str)
            .unwrap_or("0")
            .to_string();

        Self {
            address: address.to_string(),
            balance: format_base_units(&raw, APT_DECIMALS).unwrap_or_else(|_| "0".to_string()),
            balance_raw: raw,
            symbol: "APT",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    sequence_number: String,
    authentication_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub sequence_number: String,
    pub authentication_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub address: String,
    pub resource_count: usize,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct RawModule {
    #[serde(default)]
    abi: Option<RawModuleAbi>,
}

#[derive(Debug, Deserialize)]
struct RawModuleAbi {
    name: String,
    #[serde(default)]
    exposed_functions: Vec<Named>,
    #[serde(default)]
    structs: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub name: String,
    pub exposed_functions: Vec<String>,
    pub structs: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Modules {
    pub address: String,
    pub module_count: usize,
    pub modules: Vec<ModuleSummary>,
}

impl Modules {
    fn from_raw(address: &str, raw: Vec<RawModule>) -> Self {
        let modules: Vec<ModuleSummary> = raw
            .into_iter()
            .filter_map(|m| m.abi)
            .map(|abi| ModuleSummary {
                name: abi.name,
                exposed_functions: abi.exposed_functions.into_iter().map(|f| f.name).collect(),
                structs: abi.structs.into_iter().map(|s| s.name).collect(),
            })
            .collect();

        Self {
            address: address.to_string(),
            module_count: modules.len(),
            modules,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    hash: String,
    #[serde(rename = "type")]
    tx_type: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    sequence_number: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    gas_unit_price: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AptosTransaction {
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub version: Option<String>,
    pub sender: Option<String>,
    pub sequence_number: Option<String>,
    pub gas_used: Option<String>,
    pub gas_unit_price: Option<String>,
    pub success: Option<bool>,
    pub vm_status: Option<String>,
    pub timestamp_ms: Option<u64>,
    pub payload: Option<Value>,
}

impl From<RawTransaction> for AptosTransaction {
    fn from(tx: RawTransaction) -> Self {
        Self {
            timestamp_ms: micros_to_millis(tx.timestamp.as_deref()),
            hash: tx.hash,
            tx_type: tx.tx_type,
            version: tx.version,
            sender: tx.sender,
            sequence_number: tx.sequence_number,
            gas_used: tx.gas_used,
            gas_unit_price: tx.gas_unit_price,
            success: tx.success,
            vm_status: tx.vm_status,
            payload: tx.payload,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub success: Option<bool>,
    pub timestamp_ms: Option<u64>,
    pub gas_used: Option<String>,
    pub payload: Option<String>,
}

impl From<RawTransaction> for TransactionSummary {
    fn from(tx: RawTransaction) -> Self {
        let payload = tx.payload.as_ref().and_then(|p| {
            p.get("function")
                .or_else(|| p.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        Self {
            timestamp_ms: micros_to_millis(tx.timestamp.as_deref()),
            hash: tx.hash,
            tx_type: tx.tx_type,
            success: tx.success,
            gas_used: tx.gas_used,
            payload,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransactions {
    pub address: String,
    pub transaction_count: usize,
    pub transactions: Vec<TransactionSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Events {
    pub address: String,
    pub event_handle: String,
    pub field_name: String,
    pub event_count: usize,
    pub events: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResult {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<String>,
    pub result: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinInfo {
    pub coin_type: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u64>,
    pub supply: Option<String>,
}

impl CoinInfo {
    /// Find `0x1::coin::CoinInfo<coin_type>` among the issuer's resources.
    fn from_resources(coin_type: &str, resources: &[Resource]) -> Option<Self> {
        let wanted = format!("0x1::coin::CoinInfo<{}>", coin_type);
        let data = &resources.iter().find(|r| r.resource_type == wanted)?.data;
        let text = |field: &str| data.get(field).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            coin_type: coin_type.to_string(),
            name: text("name"),
            symbol: text("symbol"),
            decimals: data.get("decimals").and_then(Value::as_u64),
            supply: data
                .pointer("/supply/vec/0/integer/vec/0/value")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawLedgerInfo {
    chain_id: u64,
    epoch: String,
    ledger_version: String,
    oldest_ledger_version: String,
    ledger_timestamp: String,
    node_role: String,
    #[serde(default)]
    block_height: Option<String>,
    #[serde(default)]
    git_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerInfo {
    pub chain_id: u64,
    pub epoch: String,
    pub ledger_version: String,
    pub oldest_ledger_version: String,
    pub block_height: Option<String>,
    pub ledger_timestamp_ms: Option<u64>,
    pub node_role: String,
    pub git_hash: Option<String>,
}

impl From<RawLedgerInfo> for LedgerInfo {
    fn from(raw: RawLedgerInfo) -> Self {
        Self {
            ledger_timestamp_ms: micros_to_millis(Some(&raw.ledger_timestamp)),
            chain_id: raw.chain_id,
            epoch: raw.epoch,
            ledger_version: raw.ledger_version,
            oldest_ledger_version: raw.oldest_ledger_version,
            block_height: raw.block_height,
            node_role: raw.node_role,
            git_hash: raw.git_hash,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    #[serde(alias = "gas_estimate")]
    pub gas_estimate: u64,
    #[serde(default, alias = "deprioritized_gas_estimate")]
    pub deprioritized_gas_estimate: Option<u64>,
    #[serde(default, alias = "prioritized_gas_estimate")]
    pub prioritized_gas_estimate: Option<u64>,
}

/// Get Aptos MCP tools
pub fn get_aptos_tools() -> Vec<Tool> {
    vec![
        envelope::tool::<AddressParams>("aptos_get_balance", "Get the APT balance of an Aptos account."),
        envelope::tool::<AddressParams>(
            "aptos_get_account",
            "Get Aptos account information including sequence number and authentication key.",
        ),
        envelope::tool::<ResourcesParams>(
            "aptos_get_resources",
            "List the Move resources held by an Aptos account.",
        ),
        envelope::tool::<AddressParams>(
            "aptos_get_modules",
            "List the Move modules published by an Aptos account with their functions and structs.",
        ),
        envelope::tool::<TxParams>("aptos_get_transaction", "Get an Aptos transaction by hash."),
        envelope::tool::<AccountTransactionsParams>(
            "aptos_get_account_transactions",
            "List recent transactions sent by an Aptos account.",
        ),
        envelope::tool::<EventsParams>(
            "aptos_get_events",
            "Get events from an event handle held by an Aptos account.",
        ),
        envelope::tool::<ViewFunctionParams>(
            "aptos_view_function",
            "Call a Move view function (read-only).",
        ),
        envelope::tool::<CoinInfoParams>(
            "aptos_get_coin_info",
            "Get name, symbol, decimals and supply of an Aptos coin type.",
        ),
        envelope::tool::<NoParams>(
            "aptos_get_ledger_info",
            "Get the current Aptos ledger version, epoch and chain ID.",
        ),
        envelope::tool::<NoParams>("aptos_estimate_gas", "Estimate the Aptos gas unit price."),
    ]
}

pub async fn handle_tool(
    ctx: &ServiceContext,
    name: &str,
    args: Option<&JsonObject>,
) -> Option<Result<CallToolResult, McpError>> {
    let result = match name {
        "aptos_get_balance" => handle_get_balance(ctx, args).await,
        "aptos_get_account" => handle_get_account(ctx, args).await,
        "aptos_get_resources" => handle_get_resources(ctx, args).await,
        "aptos_get_modules" => handle_get_modules(ctx, args).await,
        "aptos_get_transaction" => handle_get_transaction(ctx, args).await,
        "aptos_get_account_transactions" => handle_get_account_transactions(ctx, args).await,
        "aptos_get_events" => handle_get_events(ctx, args).await,
        "aptos_view_function" => handle_view_function(ctx, args).await,
        "aptos_get_coin_info" => handle_get_coin_info(ctx, args).await,
        "aptos_get_ledger_info" => handle_get_ledger_info(ctx).await,
        "aptos_estimate_gas" => handle_estimate_gas(ctx).await,
        _ => return None,
    };
    Some(result)
}

pub async fn handle_get_balance(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;

    envelope::run("fetching balance", async {
        let resources: Vec<Resource> = fetch(ctx, &format!("/accounts/{}/resources", address)).await?;
        Ok(AptBalance::from_resources(address, &resources))
    })
    .await
}

pub async fn handle_get_account(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;

    envelope::run("fetching account", async {
        let raw: RawAccount = fetch(ctx, &format!("/accounts/{}", address)).await?;
        Ok(Account {
            address: address.to_string(),
            sequence_number: raw.sequence_number,
            authentication_key: raw.authentication_key,
        })
    })
    .await
}

pub async fn handle_get_resources(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ResourcesParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;
    let limit = params.limit.unwrap_or(DEFAULT_RESOURCE_LIMIT);

    envelope::run("fetching resources", async {
        let resources: Vec<Resource> =
            fetch(ctx, &format!("/accounts/{}/resources?limit={}", address, limit)).await?;
        Ok(Resources {
            address: address.to_string(),
            resource_count: resources.len(),
            resources,
        })
    })
    .await
}

pub async fn handle_get_modules(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;

    envelope::run("fetching modules", async {
        let raw: Vec<RawModule> = fetch(ctx, &format!("/accounts/{}/modules", address)).await?;
        Ok(Modules::from_raw(address, raw))
    })
    .await
}

pub async fn handle_get_transaction(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: TxParams = envelope::parse_args(args)?;

    envelope::run("fetching transaction", async {
        let raw: RawTransaction =
            fetch(ctx, &format!("/transactions/by_hash/{}", params.hash.trim())).await?;
        Ok(AptosTransaction::from(raw))
    })
    .await
}

pub async fn handle_get_account_transactions(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AccountTransactionsParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    envelope::run("fetching transactions", async {
        let raw: Vec<RawTransaction> =
            fetch(ctx, &format!("/accounts/{}/transactions?limit={}", address, limit)).await?;
        let transactions: Vec<TransactionSummary> = raw.into_iter().map(Into::into).collect();
        Ok(AccountTransactions {
            address: address.to_string(),
            transaction_count: transactions.len(),
            transactions,
        })
    })
    .await
}

pub async fn handle_get_events(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: EventsParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;
    let event_handle = validate_type_tag("event handle", &params.event_handle)?;
    let field_name = validate_identifier(&params.field_name)?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    envelope::run("fetching events", async {
        let events: Vec<Value> = fetch(
            ctx,
            &format!(
                "/accounts/{}/events/{}/{}?limit={}",
                address, event_handle, field_name, limit
            ),
        )
        .await?;
        Ok(Events {
            address: address.to_string(),
            event_handle: event_handle.to_string(),
            field_name: field_name.to_string(),
            event_count: events.len(),
            events,
        })
    })
    .await
}

pub async fn handle_view_function(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ViewFunctionParams = envelope::parse_args(args)?;
    let function = validate_type_tag("function", &params.function)?.to_string();

    envelope::run("calling view function", async {
        let request = serde_json::json!({
            "function": function,
            "type_arguments": params.type_arguments,
            "arguments": params.arguments,
        });
        let result: Value = post(ctx, "/view", &request).await?;
        Ok(ViewResult {
            function,
            type_arguments: params.type_arguments,
            arguments: params.arguments,
            result,
        })
    })
    .await
}

pub async fn handle_get_coin_info(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: CoinInfoParams = envelope::parse_args(args)?;
    let coin_type = validate_type_tag(
        "coin type",
        params.coin_type.as_deref().unwrap_or(APT_COIN_TYPE),
    )?;
    let issuer = coin_type.split("::").next().unwrap_or_default();

    envelope::run("fetching coin info", async {
        let resources: Vec<Resource> = fetch(ctx, &format!("/accounts/{}/resources", issuer)).await?;
        CoinInfo::from_resources(coin_type, &resources)
            .with_context(|| format!("Coin info not found for {}", coin_type))
    })
    .await
}

pub async fn handle_get_ledger_info(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    envelope::run("fetching ledger info", async {
        let raw: RawLedgerInfo = fetch(ctx, "/").await?;
        Ok(LedgerInfo::from(raw))
    })
    .await
}

pub async fn handle_estimate_gas(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    envelope::run("estimating gas", async {
        let estimate: GasEstimate = fetch(ctx, "/estimate_gas_price").await?;
        Ok(estimate)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    const ADDRESS: &str = "0x1d8727df513fa2a8785d0834e40b34223daff1affc079574082baadb74b66ee4";

    fn context_for(url: String) -> ServiceContext {
        let config = Config {
            aptos_api_url: Some(url),
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

    /// Test address validation accepts well-formed and rejects malformed input
    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x1").is_ok());
        assert!(validate_address(ADDRESS).is_ok());
        assert!(validate_address("1d8727df").is_err());
        assert!(validate_address("0xzz").is_err());
        assert!(validate_address(&format!("0x{}", "a".repeat(65))).is_err());
    }

    /// Test APT balance extraction from the coin store resource
    #[tokio::test]
    async fn test_get_balance() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", format!("/accounts/{}/resources", ADDRESS).as_str())
            .with_body(
                json!([
                    {"type": "0x1::account::Account", "data": {"sequence_number": "3"}},
                    {"type": APT_COIN_STORE, "data": {"coin": {"value": "250000000"}, "frozen": false}}
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_get_balance(&ctx, Some(&args(json!({"address": ADDRESS}))))
            .await
            .unwrap();
        let data = body(&result);
        assert_eq!(data["balance"], "2.5");
        assert_eq!(data["balanceRaw"], "250000000");
        assert_eq!(data["symbol"], "APT");
    }

    /// Test that an account without a coin store reports zero
    #[test]
    fn test_balance_without_coin_store() {
        let balance = AptBalance::from_resources("0x1", &[]);
        assert_eq!(balance.balance, "0");
        assert_eq!(balance.balance_raw, "0");
    }

    /// Test that an invalid address is rejected before any request
    #[tokio::test]
    async fn test_get_balance_invalid_address() {
        let ctx = ServiceContext::new(Config::default()).unwrap();
        let err = handle_get_balance(&ctx, Some(&args(json!({"address": "alice.near"}))))
            .await
            .unwrap_err();
        assert!(err.message.contains("Invalid Aptos address"));
    }

    /// Test that ledger info is summarised from the node index
    #[tokio::test]
    async fn test_get_ledger_info() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_body(
                json!({
                    "chain_id": 1,
                    "epoch": "8000",
                    "ledger_version": "1500000000",
                    "oldest_ledger_version": "0",
                    "ledger_timestamp": "1700000000123456",
                    "node_role": "full_node",
                    "oldest_block_height": "0",
                    "block_height": "200000000",
                    "git_hash": "abc123"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let ctx = context_for(format!("{}/", server.url()));

        let result = handle_get_ledger_info(&ctx).await.unwrap();
        let data = body(&result);
        assert_eq!(data["chainId"], 1);
        assert_eq!(data["ledgerVersion"], "1500000000");
        assert_eq!(data["ledgerTimestampMs"], 1700000000123u64);
    }

    /// Test that gas estimates are passed through
    #[tokio::test]
    async fn test_estimate_gas() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/estimate_gas_price")
            .with_body(r#"{"deprioritized_gas_estimate":100,"gas_estimate":100,"prioritized_gas_estimate":150}"#)
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_estimate_gas(&ctx).await.unwrap();
        let data = body(&result);
        assert_eq!(data["gasEstimate"], 100);
        assert_eq!(data["prioritizedGasEstimate"], 150);
    }

    /// Test that modules are listed by name
    #[tokio::test]
    async fn test_get_modules() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/accounts/0x1/modules")
            .with_body(
                json!([{
                    "bytecode": "0xa11ceb0b",
                    "abi": {
                        "address": "0x1",
                        "name": "coin",
                        "friends": [],
                        "exposed_functions": [{"name": "balance"}, {"name": "transfer"}],
                        "structs": [{"name": "CoinStore"}]
                    }
                }])
                .to_string(),
            )
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_get_modules(&ctx, Some(&args(json!({"address": "0x1"}))))
            .await
            .unwrap();
        let data = body(&result);
        assert_eq!(data["moduleCount"], 1);
        assert_eq!(data["modules"][0]["exposedFunctions"], json!(["balance", "transfer"]));
    }

    /// Test that an unknown hash yields an error result
    #[tokio::test]
    async fn test_get_transaction_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/transactions/by_hash/0xdead")
            .with_status(404)
            .with_body(r#"{"message":"Transaction not found by Transaction hash(0xdead)","error_code":"transaction_not_found"}"#)
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_get_transaction(&ctx, Some(&args(json!({"hash": "0xdead"}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(envelope::first_text(&result)
            .unwrap()
            .contains("transaction_not_found"));
    }

    /// Test that account transactions are summarised with their entry function
    #[tokio::test]
    async fn test_get_account_transactions() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/accounts/0x1/transactions")
            .match_query(mockito::Matcher::UrlEncoded("limit".into(), "2".into()))
            .with_body(
                json!([
                    {
                        "hash": "0xaa",
                        "type": "user_transaction",
                        "success": true,
                        "timestamp": "1700000000123456",
                        "gas_used": "12",
                        "payload": {"type": "entry_function_payload", "function": "0x1::coin::transfer"}
                    },
                    {
                        "hash": "0xbb",
                        "type": "user_transaction",
                        "success": false,
                        "payload": {"type": "script_payload"}
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_tool(
            &ctx,
            "aptos_get_account_transactions",
            Some(&args(json!({"address": "0x1", "limit": 2}))),
        )
        .await
        .unwrap()
        .unwrap();
        m.assert_async().await;
        let data = body(&result);
        assert_eq!(data["transactionCount"], 2);
        assert_eq!(data["transactions"][0]["payload"], "0x1::coin::transfer");
        assert_eq!(data["transactions"][0]["timestampMs"], 1700000000123u64);
        assert_eq!(data["transactions"][1]["payload"], "script_payload");
    }

    /// Test that events are read from the handle and field path
    #[tokio::test]
    async fn test_get_events() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/accounts/0x1/events/0x1::coin::CoinStore.*/deposit_events$".to_string()),
            )
            .match_query(mockito::Matcher::UrlEncoded("limit".into(), "25".into()))
            .with_body(
                json!([
                    {"version": "10", "sequence_number": "0", "type": "0x1::coin::DepositEvent", "data": {"amount": "100"}}
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_get_events(
            &ctx,
            Some(&args(json!({
                "address": "0x1",
                "eventHandle": APT_COIN_STORE,
                "fieldName": "deposit_events"
            }))),
        )
        .await
        .unwrap();
        m.assert_async().await;
        let data = body(&result);
        assert_eq!(data["eventCount"], 1);
        assert_eq!(data["fieldName"], "deposit_events");
        assert_eq!(data["events"][0]["data"]["amount"], "100");
    }

    /// Test that path separators in event handles and field names are rejected
    #[tokio::test]
    async fn test_get_events_rejects_path_segments() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let ctx = context_for(server.url());

        for (handle, field) in [
            ("../../transactions", "x"),
            ("0x1::coin::CoinStore", "deposit_events/../../x"),
            ("0x1::coin::CoinStore", "deposit_events?limit=1"),
        ] {
            let err = handle_get_events(
                &ctx,
                Some(&args(json!({"address": "0x1", "eventHandle": handle, "fieldName": field}))),
            )
            .await
            .unwrap_err();
            assert!(err.message.contains("Invalid Aptos"), "{}", err.message);
        }
        m.assert_async().await;
    }

    /// Test that view functions POST the function, type arguments and arguments
    #[tokio::test]
    async fn test_view_function() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/view")
            .match_body(mockito::Matcher::Json(json!({
                "function": "0x1::coin::balance",
                "type_arguments": [APT_COIN_TYPE],
                "arguments": ["0x1"]
            })))
            .with_body(r#"["123456"]"#)
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_view_function(
            &ctx,
            Some(&args(json!({
                "function": "0x1::coin::balance",
                "typeArguments": [APT_COIN_TYPE],
                "arguments": ["0x1"]
            }))),
        )
        .await
        .unwrap();
        m.assert_async().await;
        let data = body(&result);
        assert_eq!(data["result"], json!(["123456"]));
        assert_eq!(data["typeArguments"][0], APT_COIN_TYPE);
    }

    /// Test that an aborted view call is reported as an error result
    #[tokio::test]
    async fn test_view_function_abort() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/view")
            .with_status(400)
            .with_body(r#"{"message":"Move abort","error_code":"invalid_input"}"#)
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_view_function(&ctx, Some(&args(json!({"function": "0x1::coin::balance"}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let text = envelope::first_text(&result).unwrap();
        assert!(text.starts_with("Error calling view function"));
        assert!(text.contains("400"));
    }

    /// Test that coin info defaults to APT and reads the supply aggregator
    #[tokio::test]
    async fn test_get_coin_info() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/accounts/0x1/resources")
            .with_body(
                json!([
                    {"type": "0x1::account::Account", "data": {}},
                    {
                        "type": format!("0x1::coin::CoinInfo<{}>", APT_COIN_TYPE),
                        "data": {
                            "name": "Aptos Coin",
                            "symbol": "APT",
                            "decimals": 8,
                            "supply": {"vec": [{"aggregator": {"vec": []}, "integer": {"vec": [{"limit": "340282366920938463463374607431768211455", "value": "111000000000000000"}]}}]}
                        }
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_get_coin_info(&ctx, Some(&args(json!({})))).await.unwrap();
        let data = body(&result);
        assert_eq!(data["coinType"], APT_COIN_TYPE);
        assert_eq!(data["symbol"], "APT");
        assert_eq!(data["decimals"], 8);
        assert_eq!(data["supply"], "111000000000000000");
    }

    /// Test that a coin type without a CoinInfo resource is an error result
    #[tokio::test]
    async fn test_get_coin_info_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/accounts/0xabc/resources")
            .with_body("[]")
            .create_async()
            .await;
        let ctx = context_for(server.url());

        let result = handle_get_coin_info(&ctx, Some(&args(json!({"coinType": "0xabc::token::Token"}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(envelope::first_text(&result)
            .unwrap()
            .contains("Coin info not found for 0xabc::token::Token"));
    }
}
