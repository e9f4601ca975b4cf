//! HTTP plumbing shared by the REST and JSON-RPC vendor modules

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_ERROR_BODY: usize = 200;

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

async fn read_json<T: DeserializeOwned>(vendor: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .with_context(|| format!("{} API returned an unreadable body", vendor))?;

    if !status.is_success() {
        bail!("{} API error: {} - {}", vendor, status, truncate(text.trim()));
    }

    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} API response", vendor))
}

/// GET `url` and decode the JSON body. Non-2xx statuses are errors.
pub async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    vendor: &str,
    url: &str,
) -> Result<T> {
    let response = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("{} API request failed", vendor))?;
    read_json(vendor, response).await
}

/// POST `body` as JSON to `url` and decode the JSON reply.
pub async fn post_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    vendor: &str,
    url: &str,
    body: &Value,
) -> Result<T> {
    let response = http
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("{} API request failed", vendor))?;
    read_json(vendor, response).await
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// JSON-RPC 2.0 call. An `error` member or a missing `result` becomes an error.
pub async fn json_rpc<T: DeserializeOwned>(
    http: &reqwest::Client,
    vendor: &str,
    url: &str,
    method: &str,
    params: Value,
) -> Result<T> {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response = http
        .post(url)
        .json(&request)
        .send()
        .await
        .with_context(|| format!("{} RPC request failed", vendor))?;
    let body: RpcResponse<T> = read_json(vendor, response).await?;

    if let Some(error) = body.error {
        match error.data {
            Some(data) => bail!(
                "{} RPC error {}: {} ({})",
                vendor,
                error.code,
                error.message,
                data
            ),
            None => bail!("{} RPC error {}: {}", vendor, error.code, error.message),
        }
    }
    body.result
        .with_context(|| format!("{} RPC returned no result for {}", vendor, method))
}

/// Format an integer amount of base units (`raw`) as a decimal string with
/// `decimals` fractional digits, trailing zeros removed.
///
/// Decimal-coin strings with a fractional part (Cosmos `DecCoin`) are truncated
/// to their integer part first.
pub fn format_base_units(raw: &str, decimals: u32) -> Result<String> {
    let raw = raw.trim();
    let integer = raw.split('.').next().unwrap_or(raw);
    if integer.is_empty() || !integer.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Invalid amount: {}", raw);
    }

    let digits = integer.trim_start_matches('0');
    let decimals = decimals as usize;
    if digits.is_empty() {
        return Ok("0".to_string());
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        Ok(whole.to_string())
    } else {
        Ok(format!("{}.{}", whole, fraction))
    }
}
