//! Cosmos SDK chains over the REST (LCD) gateway
//!
//! Chain names are matched case-insensitively; an unknown or missing name falls back
//! to the Cosmos Hub, mirroring the EVM resolver's default-chain behaviour.

use anyhow::{Context, Result};
use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::{format_base_units, get_json};
use crate::context::ServiceContext;
use crate::envelope::{self, JsonObject};
use crate::evm::EndpointOrigin;

const VENDOR: &str = "Cosmos";
const DEFAULT_VALIDATOR_LIMIT: u32 = 100;
const MAX_LISTED_VALIDATORS: usize = 20;
const MAX_LISTED_CHANNELS: usize = 50;
const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const MAX_ADDRESS_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosmosChain {
    pub name: &'static str,
    pub rest_url: &'static str,
    pub denom: &'static str,
    pub decimals: u32,
    pub symbol: &'static str,
}

pub static COSMOS_CHAINS: &[CosmosChain] = &[
    CosmosChain { name: "cosmoshub", rest_url: "https://cosmos-rest.publicnode.com", denom: "uatom", decimals: 6, symbol: "ATOM" },
    CosmosChain { name: "osmosis", rest_url: "https://osmosis-rest.publicnode.com", denom: "uosmo", decimals: 6, symbol: "OSMO" },
    CosmosChain { name: "juno", rest_url: "https://juno-api.polkachu.com", denom: "ujuno", decimals: 6, symbol: "JUNO" },
    CosmosChain { name: "stargaze", rest_url: "https://stargaze-api.polkachu.com", denom: "ustars", decimals: 6, symbol: "STARS" },
    CosmosChain { name: "akash", rest_url: "https://akash-api.polkachu.com", denom: "uakt", decimals: 6, symbol: "AKT" },
    CosmosChain { name: "injective", rest_url: "https://injective-api.polkachu.com", denom: "inj", decimals: 18, symbol: "INJ" },
];

/// Look up a chain by name, falling back to the Cosmos Hub.
pub fn resolve_chain(name: Option<&str>) -> &'static CosmosChain {
    let wanted = name.map(|n| n.trim().to_lowercase());
    wanted
        .as_deref()
        .and_then(|w| COSMOS_CHAINS.iter().find(|c| c.name == w))
        .unwrap_or(&COSMOS_CHAINS[0])
}

fn endpoint(ctx: &ServiceContext, chain: &CosmosChain) -> (String, EndpointOrigin) {
    let env_key = format!("{}_REST_URL", chain.name.to_uppercase());
    let configured = ctx.config().cosmos_rest_urls.get(chain.name).map(String::as_str);
    ctx.vendor_endpoint_with_origin(&env_key, configured, chain.rest_url)
}

async fn fetch<T: serde::de::DeserializeOwned>(
    ctx: &ServiceContext,
    chain: &CosmosChain,
    path: &str,
) -> Result<T> {
    let url = format!("{}{}", endpoint(ctx, chain).0, path);
    get_json(ctx.http(), VENDOR, &url).await
}

fn native_amount(chain: &CosmosChain, amount: &str) -> Option<String> {
    format_base_units(amount, chain.decimals).ok()
}

/// Bech32 address: lowercase human-readable prefix, `1`, then charset data
fn validate_address(address: &str) -> Result<&str, McpError> {
    let trimmed = address.trim();
    let valid = trimmed.len() <= MAX_ADDRESS_LEN
        && trimmed.rsplit_once('1').is_some_and(|(prefix, data)| {
            !prefix.is_empty()
                && prefix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
                && data.len() >= 6
                && data.chars().all(|c| BECH32_CHARSET.contains(c))
        });
    if valid {
        Ok(trimmed)
    } else {
        Err(McpError::invalid_params(
            format!("Invalid Cosmos address: {}", address),
            None,
        ))
    }
}

/// Status enum names such as `BOND_STATUS_BONDED`
fn validate_status<'a>(kind: &str, prefix: &str, status: &'a str) -> Result<&'a str, McpError> {
    let valid = status
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_uppercase() || b == b'_'));
    if valid {
        Ok(status)
    } else {
        Err(McpError::invalid_params(
            format!("Invalid {} status: {}", kind, status),
            None,
        ))
    }
}

fn validate_tx_hash(hash: &str) -> Result<&str, McpError> {
    let trimmed = hash.trim();
    if !trimmed.is_empty() && trimmed.len() <= 64 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(trimmed)
    } else {
        Err(McpError::invalid_params(
            format!("Invalid Cosmos transaction hash: {}", hash),
            None,
        ))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddressParams {
    /// Bech32 account address (cosmos1..., osmo1..., ...)
    pub address: String,
    /// Chain name (cosmoshub, osmosis, juno, stargaze, akash, injective)
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChainParams {
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidatorParams {
    #[serde(default)]
    pub chain: Option<String>,
    /// BOND_STATUS_BONDED (default), BOND_STATUS_UNBONDED or BOND_STATUS_UNBONDING
    #[serde(default)]
    pub status: Option<String>,
    /// Max validators to request
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProposalParams {
    #[serde(default)]
    pub chain: Option<String>,
    /// e.g. PROPOSAL_STATUS_VOTING_PERIOD
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TxParams {
    /// Transaction hash
    pub hash: String,
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    balances: Vec<Coin>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub address: String,
    pub chain: &'static str,
    pub balance: String,
    pub balance_raw: String,
    pub symbol: &'static str,
    pub all_balances: Vec<Coin>,
}

impl Balance {
    fn from_response(chain: &CosmosChain, address: String, response: BalancesResponse) -> Self {
        let raw = response
            .balances
            .iter()
            .find(|coin| coin.denom == chain.denom)
            .map(|coin| coin.amount.clone())
            .unwrap_or_else(|| "0".to_string());

        Self {
            address,
            chain: chain.name,
            balance: native_amount(chain, &raw).unwrap_or_else(|| "0".to_string()),
            balance_raw: raw,
            symbol: chain.symbol,
            all_balances: response.balances,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub chain: &'static str,
    pub account_type: Option<String>,
    pub account_number: Option<String>,
    pub sequence: Option<String>,
    pub pub_key: Option<Value>,
}

impl Account {
    fn from_response(chain: &CosmosChain, address: String, response: AccountResponse) -> Self {
        // Vesting and module accounts nest the fields under base_account
        let account = &response.account;
        let base = account.get("base_account").unwrap_or(account);
        let text = |key: &str| base.get(key).and_then(Value::as_str).map(String::from);

        Self {
            address,
            chain: chain.name,
            account_type: account.get("@type").and_then(Value::as_str).map(String::from),
            account_number: text("account_number"),
            sequence: text("sequence"),
            pub_key: base.get("pub_key").filter(|v| !v.is_null()).cloned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DelegationsResponse {
    #[serde(default)]
    delegation_responses: Vec<DelegationResponse>,
}

#[derive(Debug, Deserialize)]
struct DelegationResponse {
    delegation: DelegationBody,
    balance: Coin,
}

#[derive(Debug, Deserialize)]
struct DelegationBody {
    validator_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub validator: String,
    pub amount: String,
    pub amount_raw: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegations {
    pub address: String,
    pub chain: &'static str,
    pub total_staked: String,
    pub symbol: &'static str,
    pub delegations: Vec<Delegation>,
}

impl Delegations {
    /// Every listed delegation is counted in `total_staked`; a malformed amount fails the call.
    fn from_response(chain: &CosmosChain, address: String, response: DelegationsResponse) -> Result<Self> {
        let mut total: u128 = 0;
        let mut delegations = Vec::with_capacity(response.delegation_responses.len());
        for d in response.delegation_responses {
            let raw: u128 = d
                .balance
                .amount
                .parse()
                .with_context(|| format!("Invalid delegation amount: {}", d.balance.amount))?;
            total = total
                .checked_add(raw)
                .context("Total delegated amount overflows")?;
            delegations.push(Delegation {
                validator: d.delegation.validator_address,
                amount: native_amount(chain, &d.balance.amount).unwrap_or_default(),
                amount_raw: d.balance.amount,
            });
        }

        Ok(Self {
            address,
            chain: chain.name,
            total_staked: native_amount(chain, &total.to_string()).unwrap_or_default(),
            symbol: chain.symbol,
            delegations,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RewardsResponse {
    #[serde(default)]
    rewards: Vec<Value>,
    #[serde(default)]
    total: Vec<Coin>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rewards {
    pub address: String,
    pub chain: &'static str,
    pub pending_rewards: String,
    pub symbol: &'static str,
    pub rewards_by_validator: Vec<Value>,
}

impl Rewards {
    fn from_response(chain: &CosmosChain, address: String, response: RewardsResponse) -> Self {
        let pending = response
            .total
            .iter()
            .find(|coin| coin.denom == chain.denom)
            .and_then(|coin| native_amount(chain, &coin.amount))
            .unwrap_or_else(|| "0".to_string());

        Self {
            address,
            chain: chain.name,
            pending_rewards: pending,
            symbol: chain.symbol,
            rewards_by_validator: response.rewards,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidatorsResponse {
    #[serde(default)]
    validators: Vec<RawValidator>,
}

#[derive(Debug, Deserialize)]
struct RawValidator {
    operator_address: String,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    tokens: String,
    #[serde(default)]
    commission: Option<Value>,
    #[serde(default)]
    jailed: bool,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub name: Option<String>,
    pub address: String,
    pub tokens: Option<String>,
    /// Commission rate as a fraction, e.g. "0.050000000000000000"
    pub commission_rate: Option<String>,
    pub jailed: bool,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validators {
    pub chain: &'static str,
    pub validator_count: usize,
    pub validators: Vec<Validator>,
}

impl Validators {
    fn from_response(chain: &CosmosChain, response: ValidatorsResponse) -> Self {
        let count = response.validators.len();
        let validators = response
            .validators
            .into_iter()
            .take(MAX_LISTED_VALIDATORS)
            .map(|v| Validator {
                name: v
                    .description
                    .as_ref()
                    .and_then(|d| d.get("moniker"))
                    .and_then(Value::as_str)
                    .map(String::from),
                tokens: native_amount(chain, &v.tokens),
                commission_rate: v
                    .commission
                    .as_ref()
                    .and_then(|c| c.pointer("/commission_rates/rate"))
                    .and_then(Value::as_str)
                    .map(String::from),
                address: v.operator_address,
                jailed: v.jailed,
                status: v.status,
            })
            .collect();

        Self {
            chain: chain.name,
            validator_count: count,
            validators,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    channels: Vec<RawChannel>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    channel_id: String,
    port_id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    counterparty: Value,
    #[serde(default)]
    connection_hops: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub channel_id: String,
    pub port_id: String,
    pub state: String,
    pub counterparty: Value,
    pub connection_hops: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channels {
    pub chain: &'static str,
    pub channel_count: usize,
    pub channels: Vec<Channel>,
}

impl Channels {
    fn from_response(chain: &CosmosChain, response: ChannelsResponse) -> Self {
        Self {
            chain: chain.name,
            channel_count: response.channels.len(),
            channels: response
                .channels
                .into_iter()
                .take(MAX_LISTED_CHANNELS)
                .map(|c| Channel {
                    channel_id: c.channel_id,
                    port_id: c.port_id,
                    state: c.state,
                    counterparty: c.counterparty,
                    connection_hops: c.connection_hops,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProposalsResponse {
    #[serde(default)]
    proposals: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub submit_time: Option<String>,
    pub voting_end_time: Option<String>,
    pub total_deposit: Option<Value>,
}

impl Proposal {
    fn from_value(p: &Value) -> Self {
        let text = |key: &str| p.get(key).and_then(Value::as_str).map(String::from);
        Self {
            id: text("proposal_id"),
            title: p
                .pointer("/content/title")
                .and_then(Value::as_str)
                .map(String::from)
                .or_else(|| text("title")),
            status: text("status"),
            submit_time: text("submit_time"),
            voting_end_time: text("voting_end_time"),
            total_deposit: p.get("total_deposit").cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposals {
    pub chain: &'static str,
    pub proposal_count: usize,
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Deserialize)]
struct TxResponseEnvelope {
    #[serde(default)]
    tx: Option<Value>,
    tx_response: TxResponse,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    txhash: String,
    height: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    gas_wanted: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    logs: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmosTransaction {
    pub chain: &'static str,
    pub hash: String,
    pub height: String,
    pub code: u32,
    pub success: bool,
    pub gas_used: Option<String>,
    pub gas_wanted: Option<String>,
    pub timestamp: Option<String>,
    pub messages: Option<Value>,
    pub logs: Vec<Value>,
}

impl CosmosTransaction {
    fn from_response(chain: &CosmosChain, response: TxResponseEnvelope) -> Self {
        let tx = response.tx_response;
        Self {
            chain: chain.name,
            hash: tx.txhash,
            height: tx.height,
            code: tx.code,
            success: tx.code == 0,
            gas_used: tx.gas_used,
            gas_wanted: tx.gas_wanted,
            timestamp: tx.timestamp,
            messages: response
                .tx
                .as_ref()
                .and_then(|t| t.pointer("/body/messages"))
                .cloned(),
            logs: tx.logs,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedChain {
    pub chain: &'static str,
    pub symbol: &'static str,
    pub denom: &'static str,
    pub decimals: u32,
    /// Built-in public endpoint; overrides are only reported by origin
    pub rest_endpoint: &'static str,
    /// "registry" for the built-in endpoint, "config" or "env" when overridden
    pub endpoint_origin: String,
}

/// Get Cosmos MCP tools
pub fn get_cosmos_tools() -> Vec<Tool> {
    vec![
        envelope::tool::<AddressParams>(
            "cosmos_get_balance",
            "Get the native and full token balance of a Cosmos SDK chain address.",
        ),
        envelope::tool::<AddressParams>(
            "cosmos_get_account",
            "Get Cosmos account information including account number and sequence.",
        ),
        envelope::tool::<AddressParams>(
            "cosmos_get_delegations",
            "Get staking delegations for a Cosmos delegator address.",
        ),
        envelope::tool::<AddressParams>(
            "cosmos_get_rewards",
            "Get pending staking rewards for a Cosmos delegator address.",
        ),
        envelope::tool::<ValidatorParams>(
            "cosmos_get_validators",
            "List validators on a Cosmos SDK chain, filtered by bond status.",
        ),
        envelope::tool::<ChainParams>(
            "cosmos_get_ibc_channels",
            "List IBC channels available for cross-chain transfers.",
        ),
        envelope::tool::<ProposalParams>(
            "cosmos_get_proposals",
            "List governance proposals, optionally filtered by status.",
        ),
        envelope::tool::<TxParams>(
            "cosmos_get_transaction",
            "Get a Cosmos transaction by hash.",
        ),
        envelope::tool::<NoParams>(
            "cosmos_get_supported_chains",
            "List supported Cosmos SDK chains with their native denom and REST endpoint.",
        ),
    ]
}

pub async fn handle_tool(
    ctx: &ServiceContext,
    name: &str,
    args: Option<&JsonObject>,
) -> Option<Result<CallToolResult, McpError>> {
    let result = match name {
        "cosmos_get_balance" => handle_get_balance(ctx, args).await,
        "cosmos_get_account" => handle_get_account(ctx, args).await,
        "cosmos_get_delegations" => handle_get_delegations(ctx, args).await,
        "cosmos_get_rewards" => handle_get_rewards(ctx, args).await,
        "cosmos_get_validators" => handle_get_validators(ctx, args).await,
        "cosmos_get_ibc_channels" => handle_get_ibc_channels(ctx, args).await,
        "cosmos_get_proposals" => handle_get_proposals(ctx, args).await,
        "cosmos_get_transaction" => handle_get_transaction(ctx, args).await,
        "cosmos_get_supported_chains" => handle_get_supported_chains(ctx),
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
    let chain = resolve_chain(params.chain.as_deref());

    envelope::run("fetching balance", async {
        let path = format!("/cosmos/bank/v1beta1/balances/{}", address);
        let response: BalancesResponse = fetch(ctx, chain, &path).await?;
        Ok(Balance::from_response(chain, address.to_string(), response))
    })
    .await
}

pub async fn handle_get_account(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;
    let chain = resolve_chain(params.chain.as_deref());

    envelope::run("fetching account", async {
        let path = format!("/cosmos/auth/v1beta1/accounts/{}", address);
        let response: AccountResponse = fetch(ctx, chain, &path).await?;
        Ok(Account::from_response(chain, address.to_string(), response))
    })
    .await
}

pub async fn handle_get_delegations(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;
    let chain = resolve_chain(params.chain.as_deref());

    envelope::run("fetching delegations", async {
        let path = format!("/cosmos/staking/v1beta1/delegations/{}", address);
        let response: DelegationsResponse = fetch(ctx, chain, &path).await?;
        Delegations::from_response(chain, address.to_string(), response)
    })
    .await
}

pub async fn handle_get_rewards(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: AddressParams = envelope::parse_args(args)?;
    let address = validate_address(&params.address)?;
    let chain = resolve_chain(params.chain.as_deref());

    envelope::run("fetching rewards", async {
        let path = format!("/cosmos/distribution/v1beta1/delegators/{}/rewards", address);
        let response: RewardsResponse = fetch(ctx, chain, &path).await?;
        Ok(Rewards::from_response(chain, address.to_string(), response))
    })
    .await
}

pub async fn handle_get_validators(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ValidatorParams = envelope::parse_args(args)?;
    let chain = resolve_chain(params.chain.as_deref());
    let status = params.status.as_deref().unwrap_or("BOND_STATUS_BONDED");
    let status = validate_status("validator", "BOND_STATUS_", status.trim())?;
    let limit = params.limit.unwrap_or(DEFAULT_VALIDATOR_LIMIT);

    envelope::run("fetching validators", async {
        let path = format!(
            "/cosmos/staking/v1beta1/validators?status={}&pagination.limit={}",
            status, limit
        );
        let response: ValidatorsResponse = fetch(ctx, chain, &path).await?;
        Ok(Validators::from_response(chain, response))
    })
    .await
}

pub async fn handle_get_ibc_channels(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ChainParams = envelope::parse_args(args)?;
    let chain = resolve_chain(params.chain.as_deref());

    envelope::run("fetching IBC channels", async {
        let response: ChannelsResponse = fetch(ctx, chain, "/ibc/core/channel/v1/channels").await?;
        Ok(Channels::from_response(chain, response))
    })
    .await
}

pub async fn handle_get_proposals(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ProposalParams = envelope::parse_args(args)?;
    let chain = resolve_chain(params.chain.as_deref());
    let status = params
        .status
        .as_deref()
        .map(|status| validate_status("proposal", "PROPOSAL_STATUS_", status.trim()))
        .transpose()?;

    envelope::run("fetching proposals", async {
        let path = match status {
            Some(status) => format!("/cosmos/gov/v1beta1/proposals?proposal_status={}", status),
            None => "/cosmos/gov/v1beta1/proposals".to_string(),
        };
        let response: ProposalsResponse = fetch(ctx, chain, &path).await?;
        let proposals: Vec<Proposal> = response.proposals.iter().map(Proposal::from_value).collect();

        Ok(Proposals {
            chain: chain.name,
            proposal_count: proposals.len(),
            proposals,
        })
    })
    .await
}

pub async fn handle_get_transaction(
    ctx: &ServiceContext,
    args: Option<&JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: TxParams = envelope::parse_args(args)?;
    let hash = validate_tx_hash(&params.hash)?;
    let chain = resolve_chain(params.chain.as_deref());

    envelope::run("fetching transaction", async {
        let path = format!("/cosmos/tx/v1beta1/txs/{}", hash);
        let response: TxResponseEnvelope = fetch(ctx, chain, &path).await?;
        Ok(CosmosTransaction::from_response(chain, response))
    })
    .await
}

pub fn handle_get_supported_chains(ctx: &ServiceContext) -> Result<CallToolResult, McpError> {
    let chains: Vec<SupportedChain> = COSMOS_CHAINS
        .iter()
        .map(|chain| SupportedChain {
            chain: chain.name,
            symbol: chain.symbol,
            denom: chain.denom,
            decimals: chain.decimals,
            rest_endpoint: chain.rest_url,
            endpoint_origin: endpoint(ctx, chain).1.to_string(),
        })
        .collect();

    envelope::json_result(&serde_json::json!({ "supportedChains": chains }))
}
