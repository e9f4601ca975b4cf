//! EVM tools
//!
//! Each handler resolves its `network` argument, borrows the cached client for the
//! resolved chain, runs one query and maps the ethers response onto a flat JSON shape.

use anyhow::{bail, Context as _, Result};
use ethers::abi::{decode, encode, ParamType, Token};
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Block, BlockId, BlockNumber, Bytes, Transaction, TransactionReceipt,
    TransactionRequest, H256, U256,
};
use ethers::utils::{format_ether, format_units, keccak256};
use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::ServiceContext;
use crate::envelope::{self, JsonObject};
use crate::evm::chains::{Chain, ChainSummary, Network};
use crate::evm::clients::EvmClient;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NetworkParams {
    /// Network name, alias or chain ID (default: Ethereum mainnet)
    #[serde(default)]
    pub network: Option<Network>,
}

/// Block number given as a JSON number or a decimal / 0x-hex string
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BlockNumberArg {
    Number(u64),
    Text(String),
}

impl BlockNumberArg {
    fn value(&self) -> Result<u64, McpError> {
        match self {
            BlockNumberArg::Number(n) => Ok(*n),
            BlockNumberArg::Text(text) => {
                let text = text.trim();
                let parsed = match text.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => text.parse::<u64>(),
                };
                parsed.map_err(|_| {
                    McpError::invalid_params(format!("Invalid block number: {}", text), None)
                })
            }
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockTimeParams {
    /// Number of recent blocks to average over (2-1000, default 10)
    #[serde(default)]
    pub sample_size: Option<u64>,
    #[serde(default)]
    pub network: Option<Network>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalityParams {
    /// Block to check (default: latest)
    #[serde(default)]
    pub block_number: Option<BlockNumberArg>,
    #[serde(default)]
    pub network: Option<Network>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockNumberParams {
    /// Block number (decimal or 0x-prefixed hex)
    pub block_number: BlockNumberArg,
    #[serde(default)]
    pub network: Option<Network>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockHashParams {
    /// 32-byte block hash (0x...)
    pub block_hash: String,
    #[serde(default)]
    pub network: Option<Network>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddressParams {
    /// Account or contract address (0x...)
    pub address: String,
    #[serde(default)]
    pub network: Option<Network>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenParams {
    /// ERC-20 contract address
    pub token_address: String,
    #[serde(default)]
    pub network: Option<Network>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceParams {
    /// ERC-20 contract address
    pub token_address: String,
    /// Holder address
    pub owner_address: String,
    #[serde(default)]
    pub network: Option<Network>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TxHashParams {
    /// 32-byte transaction hash (0x...)
    pub tx_hash: String,
    #[serde(default)]
    pub network: Option<Network>,
}

fn hex<T: fmt::Debug>(value: &T) -> String {
    format!("{:?}", value)
}

fn parse_address(field: &str, value: &str) -> Result<Address, McpError> {
    Address::from_str(value.trim())
        .map_err(|_| McpError::invalid_params(format!("Invalid {}: {}", field, value), None))
}

fn parse_hash(field: &str, value: &str) -> Result<H256, McpError> {
    H256::from_str(value.trim())
        .map_err(|_| McpError::invalid_params(format!("Invalid {}: {}", field, value), None))
}

fn network_name(chain: Chain<'_>) -> Option<String> {
    chain.name().map(String::from)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub chain_id: u64,
    pub name: String,
    pub slug: String,
    pub native_currency_symbol: String,
    pub is_testnet: bool,
    pub explorer_url: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedNetwork {
    pub input: Option<String>,
    pub chain_id: u64,
    pub fallback: bool,
    pub chain: ChainSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub chain_id: u64,
    pub network: Option<String>,
    pub native_currency_symbol: Option<String>,
    pub is_testnet: Option<bool>,
    pub explorer_url: Option<String>,
    /// Chain ID reported by the node itself
    pub rpc_chain_id: String,
    pub block_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub chain_id: u64,
    pub network: Option<String>,
    pub number: Option<String>,
    pub hash: Option<String>,
    pub parent_hash: String,
    pub timestamp: String,
    pub miner: Option<String>,
    pub gas_used: String,
    pub gas_limit: String,
    pub base_fee_per_gas: Option<String>,
    pub transaction_count: usize,
    pub transactions: Vec<String>,
}

impl BlockSummary {
    fn from_block(chain: Chain<'_>, block: &Block<H256>) -> Self {
        Self {
            chain_id: chain.id(),
            network: network_name(chain),
            number: block.number.map(|n| n.to_string()),
            hash: block.hash.as_ref().map(hex),
            parent_hash: hex(&block.parent_hash),
            timestamp: block.timestamp.to_string(),
            miner: block.author.as_ref().map(hex),
            gas_used: block.gas_used.to_string(),
            gas_limit: block.gas_limit.to_string(),
            base_fee_per_gas: block.base_fee_per_gas.map(|fee| fee.to_string()),
            transaction_count: block.transactions.len(),
            transactions: block.transactions.iter().map(hex).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTimeEstimate {
    pub chain_id: u64,
    pub network: Option<String>,
    pub sample_size: u64,
    pub from_block: String,
    pub to_block: String,
    pub average_block_time_seconds: f64,
    pub blocks_per_minute: f64,
}

impl BlockTimeEstimate {
    fn between(chain: Chain<'_>, older: &Block<H256>, latest: &Block<H256>) -> Result<Self> {
        let from = older.number.context("Block without a number")?.as_u64();
        let to = latest.number.context("Block without a number")?.as_u64();
        let span = to.saturating_sub(from);
        let elapsed = latest.timestamp.saturating_sub(older.timestamp);
        if span == 0 || elapsed.is_zero() || elapsed > U256::from(u64::MAX) {
            bail!("Not enough block history to estimate block time");
        }

        let average = elapsed.as_u64() as f64 / span as f64;
        Ok(Self {
            chain_id: chain.id(),
            network: network_name(chain),
            sample_size: span,
            from_block: from.to_string(),
            to_block: to.to_string(),
            average_block_time_seconds: round3(average),
            blocks_per_minute: round3(60.0 / average),
        })
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    /// At or below the node's finalized block
    Finalized,
    /// Mined but above the finalized block
    Unfinalized,
    /// Above the latest block
    Pending,
    /// The node does not serve the `finalized` tag
    Unknown,
}

impl Finality {
    fn of(block: u64, latest: u64, finalized: Option<u64>) -> Self {
        if block > latest {
            return Finality::Pending;
        }
        match finalized {
            Some(finalized) if block <= finalized => Finality::Finalized,
            Some(_) => Finality::Unfinalized,
            None => Finality::Unknown,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalityStatus {
    pub chain_id: u64,
    pub network: Option<String>,
    pub block_number: String,
    pub latest_block: String,
    pub finalized_block: Option<String>,
    pub confirmations: u64,
    pub finality_status: Finality,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBalance {
    pub chain_id: u64,
    pub network: Option<String>,
    pub address: String,
    /// Balance in whole native units
    pub balance: String,
    pub balance_wei: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub chain_id: u64,
    pub network: Option<String>,
    pub token_address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<String>,
    pub formatted_total_supply: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub chain_id: u64,
    pub network: Option<String>,
    pub token_address: String,
    pub owner_address: String,
    pub raw_balance: String,
    pub balance: Option<String>,
    pub decimals: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub chain_id: u64,
    pub network: Option<String>,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub value_formatted: String,
    pub nonce: String,
    pub gas: String,
    pub gas_price: Option<String>,
    pub block_number: Option<String>,
    pub block_hash: Option<String>,
    pub transaction_index: Option<String>,
    pub input: String,
}

impl TransactionSummary {
    fn from_transaction(chain: Chain<'_>, tx: &Transaction) -> Self {
        Self {
            chain_id: chain.id(),
            network: network_name(chain),
            hash: hex(&tx.hash),
            from: hex(&tx.from),
            to: tx.to.as_ref().map(hex),
            value: tx.value.to_string(),
            value_formatted: format_ether(tx.value),
            nonce: tx.nonce.to_string(),
            gas: tx.gas.to_string(),
            gas_price: tx.gas_price.map(|price| price.to_string()),
            block_number: tx.block_number.map(|n| n.to_string()),
            block_hash: tx.block_hash.as_ref().map(hex),
            transaction_index: tx.transaction_index.map(|i| i.to_string()),
            input: tx.input.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub chain_id: u64,
    pub network: Option<String>,
    pub transaction_hash: String,
    /// "success", "reverted", or null for pre-Byzantium receipts
    pub status: Option<&'static str>,
    pub block_number: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub contract_address: Option<String>,
    pub gas_used: Option<String>,
    pub effective_gas_price: Option<String>,
    pub logs_count: usize,
}

impl ReceiptSummary {
    fn from_receipt(chain: Chain<'_>, receipt: &TransactionReceipt) -> Self {
        Self {
            chain_id: chain.id(),
            network: network_name(chain),
            transaction_hash: hex(&receipt.transaction_hash),
            status: receipt
                .status
                .map(|s| if s.is_zero() { "reverted" } else { "success" }),
            block_number: receipt.block_number.map(|n| n.to_string()),
            from: hex(&receipt.from),
            to: receipt.to.as_ref().map(hex),
            contract_address: receipt.contract_address.as_ref().map(hex),
            gas_used: receipt.gas_used.map(|g| g.to_string()),
            effective_gas_price: receipt.effective_gas_price.map(|p| p.to_string()),
            logs_count: receipt.logs.len(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    pub chain_id: u64,
    pub network: Option<String>,
    pub gas_price_wei: String,
    pub gas_price_gwei: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCount {
    pub chain_id: u64,
    pub network: Option<String>,
    pub address: String,
    pub transaction_count: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCheck {
    pub chain_id: u64,
    pub network: Option<String>,
    pub address: String,
    pub is_contract: bool,
    pub bytecode_size: usize,
}

/// Get EVM MCP tools
pub fn get_evm_tools() -> Vec<Tool> {
    vec![
        envelope::tool::<NoParams>(
            "get_supported_networks",
            "List every supported EVM network with its chain ID, native currency, testnet flag and accepted aliases.",
        ),
        envelope::tool::<NetworkParams>(
            "resolve_network",
            "Resolve a network name, alias or chain ID to the chain the EVM tools will use. Reports whether the default network (Ethereum mainnet) was substituted for an unknown name.",
        ),
        envelope::tool::<NetworkParams>(
            "get_chain_info",
            "Get chain configuration plus the chain ID and latest block number reported by the RPC node.",
        ),
        envelope::tool::<NetworkParams>(
            "get_latest_block",
            "Get the latest block on an EVM network.",
        ),
        envelope::tool::<BlockNumberParams>(
            "get_block_by_number",
            "Get a block by number on an EVM network.",
        ),
        envelope::tool::<BlockHashParams>(
            "get_block_by_hash",
            "Get a block by hash on an EVM network.",
        ),
        envelope::tool::<AddressParams>(
            "get_native_balance",
            "Get the native token balance (ETH, BNB, MATIC, ...) of an address.",
        ),
        envelope::tool::<TokenParams>(
            "get_erc20_token_info",
            "Get ERC-20 token metadata: name, symbol, decimals and total supply.",
        ),
        envelope::tool::<TokenBalanceParams>(
            "get_erc20_balance",
            "Get the ERC-20 token balance of an address, raw and formatted with the token's decimals.",
        ),
        envelope::tool::<TxHashParams>(
            "get_transaction",
            "Get a transaction by hash.",
        ),
        envelope::tool::<TxHashParams>(
            "get_transaction_receipt",
            "Get a transaction receipt by hash, including execution status and gas used.",
        ),
        envelope::tool::<NetworkParams>(
            "get_gas_price",
            "Get the current gas price in wei and gwei.",
        ),
        envelope::tool::<AddressParams>(
            "get_transaction_count",
            "Get the number of transactions sent from an address (its nonce).",
        ),
        envelope::tool::<AddressParams>(
            "is_contract",
            "Check whether an address holds contract bytecode.",
        ),
        envelope::tool::<BlockTimeParams>(
            "estimate_block_time",
            "Estimate the average block time from recent block timestamps.",
        ),
        envelope::tool::<FinalityParams>(
            "get_finality_status",
            "Check whether a block (default: latest) is finalized and how many confirmations it has.",
        ),
    ]
}

/// Dispatch an EVM tool call; `None` when `name` is not an EVM tool.
pub async fn handle_tool(
    ctx: &ServiceContext,
    name: &str,
    args: Option<&JsonObject>,
) -> Option<Result<CallToolResult, McpError>> {
    let result = match name {
        "get_supported_networks" => handle_get_supported_networks(ctx),
        "resolve_network" => handle_resolve_network(ctx, args),
        "get_chain_info" => handle_get_chain_info(ctx, args).await,
        "get_latest_block" => handle_get_latest_block(ctx, args).await,
        "get_block_by_number" => handle_get_block_by_number(ctx, args).await,
        "get_block_by_hash" => handle_get_block_by_hash(ctx, args).await,
        "get_native_balance" => handle_get_native_balance(ctx, args).await,
        "get_erc20_token_info" => handle_get_erc20_token_info(ctx, args).await,
        "get_erc20_balance" => handle_get_erc20_balance(ctx, args).await,
        "get_transaction" => handle_get_transaction(ctx, args).await,
        "get_transaction_receipt" => handle_get_transaction_receipt(ctx, args).await,
        "get_gas_price" => handle_get_gas_price(ctx, args).await,
        "get_transaction_count" => handle_get_transaction_count(ctx, args).await,
        "is_contract" => handle_is_contract(ctx, args).await,
        "estimate_block_time" => handle_estimate_block_time(ctx, args).await,
        "get_finality_status" => handle_get_finality_status(ctx, args).await,
        _ => return None,
    };
    Some(result)
}

fn client_for(ctx: &ServiceContext, chain_id: u64) -> Result<std::sync::Arc<EvmClient>> {
    Ok(ctx.clients().client_for(chain_id)?)
}

pub fn handle_get_supported_networks(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    let registry = ctx.registry();
    let networks: Vec<NetworkEntry> = registry
        .chains()
        .into_iter()
        .map(|def| NetworkEntry {
            chain_id: def.id,
            name: def.name.to_string(),
            slug: def.slug.to_string(),
            native_currency_symbol: def.native_currency_symbol.to_string(),
            is_testnet: def.is_testnet,
            explorer_url: def.explorer_url.to_string(),
            aliases: registry
                .aliases_for(def.id)
                .into_iter()
                .map(String::from)
                .collect(),
        })
        .collect();

    envelope::json_result(&serde_json::json!({
        "defaultChainId": crate::evm::DEFAULT_CHAIN_ID,
        "networks": networks,
    }))
}

pub fn handle_resolve_network(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: NetworkParams = envelope::parse_args(args)?;
    let resolution = ctx.resolve(params.network.as_ref())?;

    envelope::json_result(&ResolvedNetwork {
        input: params.network.as_ref().map(|n| n.to_string()),
        chain_id: resolution.chain_id,
        fallback: resolution.fallback,
        chain: ctx.chain(resolution.chain_id).summary(),
    })
}

pub async fn handle_get_chain_info(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: NetworkParams = envelope::parse_args(args)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching chain info", async {
        let client = client_for(ctx, chain_id)?;
        let (rpc_chain_id, block_number) = tokio::try_join!(
            client.provider().get_chainid(),
            client.provider().get_block_number()
        )?;
        let chain = ctx.chain(chain_id);

        Ok(ChainStatus {
            chain_id,
            network: network_name(chain),
            native_currency_symbol: chain.native_currency_symbol().map(String::from),
            is_testnet: chain.is_testnet(),
            explorer_url: chain.definition().map(|def| def.explorer_url.to_string()),
            rpc_chain_id: rpc_chain_id.to_string(),
            block_number: block_number.to_string(),
        })
    })
    .await
}

async fn fetch_block(
    ctx: &ServiceContext,
    chain_id: u64,
    id: BlockId,
    action: &str,
) -> Result<CallToolResult, McpError> {
    envelope::run(action, async {
        let client = client_for(ctx, chain_id)?;
        let block = client
            .provider()
            .get_block(id)
            .await?
            .context("Block not found")?;
        Ok(BlockSummary::from_block(ctx.chain(chain_id), &block))
    })
    .await
}

pub async fn handle_get_latest_block(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: NetworkParams = envelope::parse_args(args)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;
    fetch_block(
        ctx,
        chain_id,
        BlockId::Number(BlockNumber::Latest),
        "fetching latest block",
    )
    .await
}

pub async fn handle_get_block_by_number(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: BlockNumberParams = envelope::parse_args(args)?;
    let number = params.block_number.value()?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;
    fetch_block(
        ctx,
        chain_id,
        BlockId::Number(BlockNumber::Number(number.into())),
        "fetching block",
    )
    .await
}

pub async fn handle_get_block_by_hash(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: BlockHashParams = envelope::parse_args(args)?;
    let hash = parse_hash("blockHash", &params.block_hash)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;
    fetch_block(ctx, chain_id, BlockId::Hash(hash), "fetching block").await
}

const DEFAULT_BLOCK_SAMPLE: u64 = 10;
const MAX_BLOCK_SAMPLE: u64 = 1000;

pub async fn handle_estimate_block_time(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: BlockTimeParams = envelope::parse_args(args)?;
    let sample = params.sample_size.unwrap_or(DEFAULT_BLOCK_SAMPLE);
    if !(2..=MAX_BLOCK_SAMPLE).contains(&sample) {
        return Err(McpError::invalid_params(
            format!("sampleSize must be between 2 and {}", MAX_BLOCK_SAMPLE),
            None,
        ));
    }
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("estimating block time", async {
        let client = client_for(ctx, chain_id)?;
        let latest = client
            .provider()
            .get_block(BlockNumber::Latest)
            .await?
            .context("Latest block not found")?;
        let head = latest.number.context("Block without a number")?.as_u64();
        let older = client
            .provider()
            .get_block(BlockNumber::Number(head.saturating_sub(sample).into()))
            .await?
            .context("Sample block not found")?;
        BlockTimeEstimate::between(ctx.chain(chain_id), &older, &latest)
    })
    .await
}

pub async fn handle_get_finality_status(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: FinalityParams = envelope::parse_args(args)?;
    let requested = params.block_number.as_ref().map(BlockNumberArg::value).transpose()?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching finality status", async {
        let client = client_for(ctx, chain_id)?;
        let latest = client.provider().get_block_number().await?.as_u64();
        let finalized = match client.provider().get_block(BlockNumber::Finalized).await {
            Ok(block) => block.and_then(|b| b.number).map(|n| n.as_u64()),
            Err(e) => {
                tracing::debug!(chain_id, error = %e, "finalized tag unavailable");
                None
            }
        };
        let block = requested.unwrap_or(latest);
        let chain = ctx.chain(chain_id);

        Ok(FinalityStatus {
            chain_id,
            network: network_name(chain),
            block_number: block.to_string(),
            latest_block: latest.to_string(),
            finalized_block: finalized.map(|n| n.to_string()),
            confirmations: latest.saturating_sub(block),
            finality_status: Finality::of(block, latest, finalized),
        })
    })
    .await
}

pub async fn handle_get_native_balance(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = parse_address("address", &params.address)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching balance", async {
        let client = client_for(ctx, chain_id)?;
        let wei = client.provider().get_balance(address, None).await?;
        let chain = ctx.chain(chain_id);

        Ok(NativeBalance {
            chain_id,
            network: network_name(chain),
            address: hex(&address),
            balance: format_ether(wei),
            balance_wei: wei.to_string(),
            symbol: chain.native_currency_symbol().map(String::from),
        })
    })
    .await
}

fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = keccak256(signature.as_bytes())[..4].to_vec();
    data.extend(encode(args));
    Bytes::from(data)
}

async fn eth_call(client: &EvmClient, to: Address, data: Bytes) -> Result<Bytes> {
    let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
    Ok(client.provider().call(&tx, None).await?)
}

/// ABI string, falling back to a NUL-padded bytes32 for older tokens
fn decode_string(raw: &[u8]) -> Option<String> {
    if let Ok(tokens) = decode(&[ParamType::String], raw) {
        if let Some(Token::String(s)) = tokens.into_iter().next() {
            return Some(s);
        }
    }
    if let Ok(tokens) = decode(&[ParamType::FixedBytes(32)], raw) {
        if let Some(Token::FixedBytes(bytes)) = tokens.into_iter().next() {
            let trimmed: Vec<u8> = bytes.into_iter().take_while(|b| *b != 0).collect();
            return String::from_utf8(trimmed).ok().filter(|s| !s.is_empty());
        }
    }
    None
}

fn decode_uint(raw: &[u8]) -> Option<U256> {
    match decode(&[ParamType::Uint(256)], raw).ok()?.into_iter().next() {
        Some(Token::Uint(n)) => Some(n),
        _ => None,
    }
}

fn as_decimals(n: U256) -> Option<u8> {
    if n <= U256::from(u8::MAX) {
        Some(n.low_u32() as u8)
    } else {
        None
    }
}

fn format_amount(amount: U256, decimals: Option<u8>) -> Option<String> {
    decimals.and_then(|d| format_units(amount, u32::from(d)).ok())
}

async fn call_or_none(client: &EvmClient, token: Address, signature: &str) -> Option<Bytes> {
    eth_call(client, token, encode_call(signature, &[])).await.ok()
}

pub async fn handle_get_erc20_token_info(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: TokenParams = envelope::parse_args(args)?;
    let token = parse_address("tokenAddress", &params.token_address)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching token info", async {
        let client = client_for(ctx, chain_id)?;
        let (name, symbol, decimals, total_supply) = tokio::join!(
            call_or_none(&client, token, "name()"),
            call_or_none(&client, token, "symbol()"),
            call_or_none(&client, token, "decimals()"),
            call_or_none(&client, token, "totalSupply()"),
        );

        let name = name.as_deref().and_then(decode_string);
        let symbol = symbol.as_deref().and_then(decode_string);
        let decimals = decimals.as_deref().and_then(decode_uint).and_then(as_decimals);
        let total_supply = total_supply.as_deref().and_then(decode_uint);

        if name.is_none() && symbol.is_none() && decimals.is_none() && total_supply.is_none() {
            bail!("No ERC-20 contract found at {}", hex(&token));
        }

        Ok(TokenInfo {
            chain_id,
            network: network_name(ctx.chain(chain_id)),
            token_address: hex(&token),
            name,
            symbol,
            decimals,
            total_supply: total_supply.map(|s| s.to_string()),
            formatted_total_supply: total_supply.and_then(|s| format_amount(s, decimals)),
        })
    })
    .await
}

pub async fn handle_get_erc20_balance(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: TokenBalanceParams = envelope::parse_args(args)?;
    let token = parse_address("tokenAddress", &params.token_address)?;
    let owner = parse_address("ownerAddress", &params.owner_address)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching token balance", async {
        let client = client_for(ctx, chain_id)?;
        let data = encode_call("balanceOf(address)", &[Token::Address(owner)]);
        let (raw, decimals) = tokio::join!(
            eth_call(&client, token, data),
            call_or_none(&client, token, "decimals()"),
        );
        let raw = decode_uint(&raw?).context("balanceOf returned malformed data")?;
        let decimals = decimals.as_deref().and_then(decode_uint).and_then(as_decimals);

        Ok(TokenBalance {
            chain_id,
            network: network_name(ctx.chain(chain_id)),
            token_address: hex(&token),
            owner_address: hex(&owner),
            raw_balance: raw.to_string(),
            balance: format_amount(raw, decimals),
            decimals,
        })
    })
    .await
}

pub async fn handle_get_transaction(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: TxHashParams = envelope::parse_args(args)?;
    let hash = parse_hash("txHash", &params.tx_hash)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching transaction", async {
        let client = client_for(ctx, chain_id)?;
        let tx = client
            .provider()
            .get_transaction(hash)
            .await?
            .context("Transaction not found")?;
        Ok(TransactionSummary::from_transaction(ctx.chain(chain_id), &tx))
    })
    .await
}

pub async fn handle_get_transaction_receipt(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: TxHashParams = envelope::parse_args(args)?;
    let hash = parse_hash("txHash", &params.tx_hash)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching transaction receipt", async {
        let client = client_for(ctx, chain_id)?;
        let receipt = client
            .provider()
            .get_transaction_receipt(hash)
            .await?
            .context("Receipt not found (transaction unknown or still pending)")?;
        Ok(ReceiptSummary::from_receipt(ctx.chain(chain_id), &receipt))
    })
    .await
}

pub async fn handle_get_gas_price(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: NetworkParams = envelope::parse_args(args)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching gas price", async {
        let client = client_for(ctx, chain_id)?;
        let price = client.provider().get_gas_price().await?;
        Ok(GasPrice {
            chain_id,
            network: network_name(ctx.chain(chain_id)),
            gas_price_wei: price.to_string(),
            gas_price_gwei: format_units(price, "gwei")?,
        })
    })
    .await
}

pub async fn handle_get_transaction_count(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = parse_address("address", &params.address)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("fetching transaction count", async {
        let client = client_for(ctx, chain_id)?;
        let count = client.provider().get_transaction_count(address, None).await?;
        Ok(TransactionCount {
            chain_id,
            network: network_name(ctx.chain(chain_id)),
            address: hex(&address),
            transaction_count: count.to_string(),
        })
    })
    .await
}

pub async fn handle_is_contract(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = parse_address("address", &params.address)?;
    let chain_id = ctx.resolve(params.network.as_ref())?.chain_id;

    envelope::run("checking contract code", async {
        let client = client_for(ctx, chain_id)?;
        let code = client.provider().get_code(address, None).await?;
        Ok(ContractCheck {
            chain_id,
            network: network_name(ctx.chain(chain_id)),
            address: hex(&address),
            is_contract: !code.is_empty(),
            bytecode_size: code.len(),
        })
    })
    .await
}
