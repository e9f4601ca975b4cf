//! NEAR Protocol JSON-RPC

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::http::{format_base_units, json_rpc};
use crate::context::ServiceContext;
use crate::envelope::{self, JsonObject};

pub const DEFAULT_NEAR_RPC_URL: &str = "https://rpc.mainnet.near.org";
const VENDOR: &str = "Near";
const NEAR_DECIMALS: u32 = 24;
/// Code hash of an account with no contract deployed
const EMPTY_CODE_HASH: &str = "11111111111111111111111111111111";
const MAX_LISTED_PEERS: usize = 10;
const MAX_LISTED_VALIDATORS: usize = 20;
const MAX_LISTED_STATE: usize = 50;

async fn rpc<T: DeserializeOwned>(ctx: &ServiceContext, method: &str, params: Value) -> Result<T> {
    let url = ctx.vendor_endpoint(
        "NEAR_RPC_URL",
        ctx.config().near_rpc_url.as_deref(),
        DEFAULT_NEAR_RPC_URL,
    );
    json_rpc(ctx.http(), VENDOR, &url, method, params).await
}

fn yocto_to_near(raw: &str) -> String {
    format_base_units(raw, NEAR_DECIMALS).unwrap_or_else(|_| raw.to_string())
}

/// Named (`alice.near`) or implicit (64 hex chars) account ID
fn validate_account_id(field: &str, value: &str) -> Result<String, McpError> {
    let id = value.trim();
    let valid = (2..=64).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.'))
        && !id.starts_with(['.', '-', '_'])
        && !id.ends_with(['.', '-', '_']);
    if valid {
        Ok(id.to_string())
    } else {
        Err(McpError::invalid_params(
            format!("Invalid NEAR {}: {}", field, value),
            None,
        ))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountParams {
    /// NEAR account ID (e.g. example.near)
    pub account_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TxParams {
    /// Transaction hash (base58)
    pub tx_hash: String,
    /// Account that signed the transaction
    pub sender_account_id: String,
}

/// Block height or base58 block hash
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BlockRef {
    Height(u64),
    Hash(String),
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockParams {
    /// Block height or hash (omit for the latest final block)
    #[serde(default)]
    pub block_id: Option<BlockRef>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewFunctionParams {
    /// Contract account ID
    pub contract_id: String,
    /// View method name
    pub method_name: String,
    /// Arguments as a JSON object
    #[serde(default)]
    pub args: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractStateParams {
    /// Contract account ID
    pub contract_id: String,
    /// Only keys starting with this prefix
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

fn validate_method_name(value: &str) -> Result<&str, McpError> {
    let name = value.trim();
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(name)
    } else {
        Err(McpError::invalid_params(
            format!("Invalid NEAR methodName: {}", value),
            None,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ViewAccount {
    amount: String,
    locked: String,
    code_hash: String,
    storage_usage: u64,
    block_height: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearBalance {
    pub account_id: String,
    pub balance: String,
    pub balance_raw: String,
    pub locked: String,
    pub locked_raw: String,
    pub symbol: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearAccount {
    pub account_id: String,
    pub balance: String,
    pub locked: String,
    pub storage_usage_bytes: u64,
    pub has_contract: bool,
    pub code_hash: String,
    pub block_height: u64,
}

impl NearAccount {
    fn from_view(account_id: String, view: ViewAccount) -> Self {
        Self {
            account_id,
            balance: yocto_to_near(&view.amount),
            locked: yocto_to_near(&view.locked),
            storage_usage_bytes: view.storage_usage,
            has_contract: view.code_hash != EMPTY_CODE_HASH,
            code_hash: view.code_hash,
            block_height: view.block_height,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessKeyList {
    keys: Vec<AccessKeyInfo>,
}

#[derive(Debug, Deserialize)]
struct AccessKeyInfo {
    public_key: String,
    access_key: AccessKey,
}

#[derive(Debug, Deserialize)]
struct AccessKey {
    nonce: u64,
    permission: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySummary {
    pub public_key: String,
    pub nonce: u64,
    /// "FullAccess" or "FunctionCall"
    pub permission: String,
    pub function_call_details: Option<Value>,
}

impl From<AccessKeyInfo> for KeySummary {
    fn from(info: AccessKeyInfo) -> Self {
        let (permission, details) = match info.access_key.permission {
            Value::String(s) => (s, None),
            Value::Object(mut map) => {
                let details = map.remove("FunctionCall");
                ("FunctionCall".to_string(), details)
            }
            other => (other.to_string(), None),
        };

        Self {
            public_key: info.public_key,
            nonce: info.access_key.nonce,
            permission,
            function_call_details: details,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeys {
    pub account_id: String,
    pub key_count: usize,
    pub keys: Vec<KeySummary>,
}

#[derive(Debug, Deserialize)]
struct TxStatus {
    status: Value,
    #[serde(default)]
    transaction: Option<Value>,
    #[serde(default)]
    transaction_outcome: Option<Value>,
    #[serde(default)]
    receipts_outcome: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearTransaction {
    pub tx_hash: String,
    pub sender: String,
    pub success: bool,
    pub status: Value,
    pub receiver: Option<String>,
    pub actions: Option<Value>,
    pub gas_burnt: Option<u64>,
    pub tokens_burnt: Option<String>,
    pub logs: Option<Value>,
    pub receipts_count: usize,
}

impl NearTransaction {
    fn from_status(tx_hash: String, sender: String, raw: TxStatus) -> Self {
        let outcome = raw
            .transaction_outcome
            .as_ref()
            .and_then(|o| o.get("outcome"));
        let success = raw.status.get("SuccessValue").is_some()
            || raw.status.get("SuccessReceiptId").is_some();

        Self {
            tx_hash,
            sender,
            success,
            receiver: raw
                .transaction
                .as_ref()
                .and_then(|t| t.get("receiver_id"))
                .and_then(Value::as_str)
                .map(String::from),
            actions: raw.transaction.as_ref().and_then(|t| t.get("actions")).cloned(),
            gas_burnt: outcome.and_then(|o| o.get("gas_burnt")).and_then(Value::as_u64),
            tokens_burnt: outcome
                .and_then(|o| o.get("tokens_burnt"))
                .and_then(Value::as_str)
                .map(yocto_to_near),
            logs: outcome.and_then(|o| o.get("logs")).cloned(),
            receipts_count: raw.receipts_outcome.len(),
            status: raw.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    author: String,
    header: BlockHeader,
    #[serde(default)]
    chunks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    height: u64,
    hash: String,
    /// Nanoseconds since the epoch
    timestamp: u64,
    gas_price: String,
    total_supply: String,
    #[serde(default)]
    chunks_included: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearBlock {
    pub height: u64,
    pub hash: String,
    pub author: String,
    pub timestamp_ms: u64,
    pub gas_price: String,
    pub total_supply: String,
    pub chunks_included: Option<u64>,
    pub chunk_count: usize,
}

impl From<RawBlock> for NearBlock {
    fn from(raw: RawBlock) -> Self {
        Self {
            height: raw.header.height,
            hash: raw.header.hash,
            author: raw.author,
            timestamp_ms: raw.header.timestamp / 1_000_000,
            gas_price: raw.header.gas_price,
            total_supply: yocto_to_near(&raw.header.total_supply),
            chunks_included: raw.header.chunks_included,
            chunk_count: raw.chunks.len(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGasPrice {
    gas_price: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearGasPrice {
    pub gas_price_yocto: String,
    pub gas_price_near: String,
}

#[derive(Debug, Deserialize)]
struct RawNetworkInfo {
    #[serde(default)]
    active_peers: Vec<Value>,
    num_active_peers: u64,
    #[serde(default)]
    sent_bytes_per_sec: u64,
    #[serde(default)]
    received_bytes_per_sec: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub active_peers: u64,
    pub sent_bytes_per_sec: u64,
    pub received_bytes_per_sec: u64,
    pub peers: Vec<Value>,
}

impl From<RawNetworkInfo> for NetworkInfo {
    fn from(raw: RawNetworkInfo) -> Self {
        Self {
            active_peers: raw.num_active_peers,
            sent_bytes_per_sec: raw.sent_bytes_per_sec,
            received_bytes_per_sec: raw.received_bytes_per_sec,
            peers: raw.active_peers.into_iter().take(MAX_LISTED_PEERS).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCallResult {
    result: Vec<u8>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    block_height: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewFunctionResult {
    pub contract_id: String,
    pub method_name: String,
    pub args: Value,
    /// Parsed as JSON when possible, otherwise the raw UTF-8 text
    pub result: Value,
    pub logs: Vec<String>,
    pub block_height: Option<u64>,
}

fn decode_call_result(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[derive(Debug, Deserialize)]
struct RawViewState {
    values: Vec<RawStateItem>,
}

#[derive(Debug, Deserialize)]
struct RawStateItem {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
pub struct StateItem {
    pub key: String,
    pub value: String,
}

impl StateItem {
    fn decode(raw: &RawStateItem) -> Result<Self> {
        let text = |encoded: &str| -> Result<String> {
            let bytes = BASE64
                .decode(encoded)
                .with_context(|| format!("Invalid base64 in contract state: {}", encoded))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        };
        Ok(Self {
            key: text(&raw.key)?,
            value: text(&raw.value)?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractState {
    pub contract_id: String,
    pub state_count: usize,
    pub state: Vec<StateItem>,
}

#[derive(Debug, Deserialize)]
struct RawValidators {
    current_validators: Vec<RawValidator>,
    epoch_start_height: u64,
}

#[derive(Debug, Deserialize)]
struct RawValidator {
    account_id: String,
    stake: String,
    #[serde(default)]
    num_produced_blocks: u64,
    #[serde(default)]
    num_expected_blocks: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub account_id: String,
    pub stake: String,
    pub blocks_produced: u64,
    pub blocks_expected: u64,
    /// Percent with two decimals, absent before the first expected block
    pub uptime: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validators {
    pub validator_count: usize,
    pub total_stake: String,
    pub epoch_start_height: u64,
    pub validators: Vec<Validator>,
}

fn uptime(produced: u64, expected: u64) -> Option<String> {
    if expected == 0 {
        return None;
    }
    let basis_points = u128::from(produced) * 10_000 / u128::from(expected);
    Some(format!("{}.{:02}", basis_points / 100, basis_points % 100))
}

impl Validators {
    fn from_raw(raw: RawValidators) -> Result<Self> {
        let mut total: u128 = 0;
        for validator in &raw.current_validators {
            let stake: u128 = validator
                .stake
                .parse()
                .with_context(|| format!("Invalid stake for {}: {}", validator.account_id, validator.stake))?;
            total = total.checked_add(stake).context("Total stake overflows")?;
        }

        Ok(Self {
            validator_count: raw.current_validators.len(),
            total_stake: yocto_to_near(&total.to_string()),
            epoch_start_height: raw.epoch_start_height,
            validators: raw
                .current_validators
                .into_iter()
                .take(MAX_LISTED_VALIDATORS)
                .map(|v| Validator {
                    uptime: uptime(v.num_produced_blocks, v.num_expected_blocks),
                    stake: yocto_to_near(&v.stake),
                    account_id: v.account_id,
                    blocks_produced: v.num_produced_blocks,
                    blocks_expected: v.num_expected_blocks,
                })
                .collect(),
        })
    }
}

/// Get NEAR MCP tools
pub fn get_near_tools() -> Vec<Tool> {
    vec![
        envelope::tool::<AccountParams>(
            "near_get_balance",
            "Get the NEAR balance (liquid and locked) of an account.",
        ),
        envelope::tool::<AccountParams>(
            "near_get_account",
            "Get NEAR account state: balance, storage usage and whether a contract is deployed.",
        ),
        envelope::tool::<AccountParams>(
            "near_get_access_keys",
            "List the access keys of a NEAR account with their permissions.",
        ),
        envelope::tool::<TxParams>(
            "near_get_transaction",
            "Get NEAR transaction status and outcome by hash and sender.",
        ),
        envelope::tool::<BlockParams>(
            "near_get_block",
            "Get a NEAR block by height or hash, or the latest final block.",
        ),
        envelope::tool::<BlockParams>(
            "near_get_gas_price",
            "Get the NEAR gas price, optionally at a given block.",
        ),
        envelope::tool::<NoParams>(
            "near_get_network_info",
            "Get NEAR node network status and connected peers.",
        ),
        envelope::tool::<ViewFunctionParams>(
            "near_view_function",
            "Call a view method on a NEAR contract (read-only).",
        ),
        envelope::tool::<ContractStateParams>(
            "near_get_contract_state",
            "Get the storage keys and values of a NEAR contract, optionally filtered by key prefix.",
        ),
        envelope::tool::<NoParams>(
            "near_get_validators",
            "List the current NEAR validators (first 20) with stake and uptime.",
        ),
    ]
}

pub async fn handle_tool(
    ctx: &ServiceContext,
    name: &str,
    args: Option<&JsonObject>,
) -> Option<Result<CallToolResult, McpError>> {
    let result = match name {
        "near_get_balance" => handle_get_balance(ctx, args).await,
        "near_get_account" => handle_get_account(ctx, args).await,
        "near_get_access_keys" => handle_get_access_keys(ctx, args).await,
        "near_get_transaction" => handle_get_transaction(ctx, args).await,
        "near_get_block" => handle_get_block(ctx, args).await,
        "near_get_gas_price" => handle_get_gas_price(ctx, args).await,
        "near_get_network_info" => handle_get_network_info(ctx).await,
        "near_view_function" => handle_view_function(ctx, args).await,
        "near_get_contract_state" => handle_get_contract_state(ctx, args).await,
        "near_get_validators" => handle_get_validators(ctx).await,
        _ => return None,
    };
    Some(result)
}

async fn view_account(ctx: &ServiceContext, account_id: &str) -> Result<ViewAccount> {
    rpc(
        ctx,
        "query",
        json!({
            "request_type": "view_account",
            "finality": "final",
            "account_id": account_id,
        }),
    )
    .await
}

pub async fn handle_get_balance(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AccountParams = envelope::parse_args(args)?;
    let account_id = validate_account_id("accountId", &params.account_id)?;

    envelope::run("fetching balance", async {
        let view = view_account(ctx, &account_id).await?;
        Ok(NearBalance {
            account_id: account_id.clone(),
            balance: yocto_to_near(&view.amount),
            balance_raw: view.amount,
            locked: yocto_to_near(&view.locked),
            locked_raw: view.locked,
            symbol: "NEAR",
        })
    })
    .await
}

pub async fn handle_get_account(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AccountParams = envelope::parse_args(args)?;
    let account_id = validate_account_id("accountId", &params.account_id)?;

    envelope::run("fetching account", async {
        let view = view_account(ctx, &account_id).await?;
        Ok(NearAccount::from_view(account_id.clone(), view))
    })
    .await
}

pub async fn handle_get_access_keys(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AccountParams = envelope::parse_args(args)?;
    let account_id = validate_account_id("accountId", &params.account_id)?;

    envelope::run("fetching access keys", async {
        let list: AccessKeyList = rpc(
            ctx,
            "query",
            json!({
                "request_type": "view_access_key_list",
                "finality": "final",
                "account_id": account_id,
            }),
        )
        .await?;
        let keys: Vec<KeySummary> = list.keys.into_iter().map(KeySummary::from).collect();

        Ok(AccessKeys {
            account_id: account_id.clone(),
            key_count: keys.len(),
            keys,
        })
    })
    .await
}

pub async fn handle_get_transaction(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: TxParams = envelope::parse_args(args)?;
    let sender = validate_account_id("senderAccountId", &params.sender_account_id)?;
    let tx_hash = params.tx_hash.trim().to_string();

    envelope::run("fetching transaction", async {
        let raw: TxStatus = rpc(ctx, "tx", json!([tx_hash, sender])).await?;
        Ok(NearTransaction::from_status(tx_hash.clone(), sender.clone(), raw))
    })
    .await
}

pub async fn handle_get_block(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: BlockParams = envelope::parse_args(args)?;
    let query = match &params.block_id {
        Some(id) => json!({ "block_id": id }),
        None => json!({ "finality": "final" }),
    };

    envelope::run("fetching block", async {
        let raw: RawBlock = rpc(ctx, "block", query).await?;
        Ok(NearBlock::from(raw))
    })
    .await
}

pub async fn handle_get_gas_price(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: BlockParams = envelope::parse_args(args)?;

    envelope::run("fetching gas price", async {
        let raw: RawGasPrice = rpc(ctx, "gas_price", json!([params.block_id])).await?;
        Ok(NearGasPrice {
            gas_price_near: yocto_to_near(&raw.gas_price),
            gas_price_yocto: raw.gas_price,
        })
    })
    .await
}

pub async fn handle_get_network_info(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    envelope::run("fetching network info", async {
        let raw: RawNetworkInfo = rpc(ctx, "network_info", json!({})).await?;
        Ok(NetworkInfo::from(raw))
    })
    .await
}

pub async fn handle_view_function(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ViewFunctionParams = envelope::parse_args(args)?;
    let contract_id = validate_account_id("contractId", &params.contract_id)?;
    let method_name = validate_method_name(&params.method_name)?.to_string();
    let call_args = params.args.unwrap_or_else(|| json!({}));
    if !call_args.is_object() {
        return Err(McpError::invalid_params("args must be a JSON object", None));
    }

    envelope::run("calling view function", async {
        let raw: RawCallResult = rpc(
            ctx,
            "query",
            json!({
                "request_type": "call_function",
                "finality": "final",
                "account_id": contract_id,
                "method_name": method_name,
                "args_base64": BASE64.encode(call_args.to_string()),
            }),
        )
        .await?;
        Ok(ViewFunctionResult {
            contract_id: contract_id.clone(),
            method_name: method_name.clone(),
            result: decode_call_result(&raw.result),
            args: call_args.clone(),
            logs: raw.logs,
            block_height: raw.block_height,
        })
    })
    .await
}

pub async fn handle_get_contract_state(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ContractStateParams = envelope::parse_args(args)?;
    let contract_id = validate_account_id("contractId", &params.contract_id)?;

    envelope::run("fetching contract state", async {
        let raw: RawViewState = rpc(
            ctx,
            "query",
            json!({
                "request_type": "view_state",
                "finality": "final",
                "account_id": contract_id,
                "prefix_base64": BASE64.encode(&params.prefix),
            }),
        )
        .await?;
        let state = raw
            .values
            .iter()
            .take(MAX_LISTED_STATE)
            .map(StateItem::decode)
            .collect::<Result<Vec<_>>>()?;
        Ok(ContractState {
            contract_id: contract_id.clone(),
            state_count: raw.values.len(),
            state,
        })
    })
    .await
}

pub async fn handle_get_validators(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    envelope::run("fetching validators", async {
        let raw: RawValidators = rpc(ctx, "validators", json!([null])).await?;
        Validators::from_raw(raw)
    })
    .await
}
