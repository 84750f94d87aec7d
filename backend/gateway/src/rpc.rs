//! Soroban RPC client.
//!
//! ## Resilience
//!
//! * Read-only methods back off exponentially on transport errors, HTTP 429
//!   and soft JSON-RPC errors, from [`INITIAL_BACKOFF_SECS`] up to
//!   [`MAX_BACKOFF_SECS`], for at most [`MAX_ATTEMPTS`] tries.
//! * `sendTransaction` is sent exactly once. Whether to resubmit is the
//!   caller's decision.
//!
//! Transactions and ledger keys go out as base64 XDR. Simulation results and
//! ledger entries are read back as base64 XDR too; receipts and send results
//! are requested with `xdrFormat: "json"`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use stellar_xdr::curr::{
    LedgerEntryData, LedgerKey, LedgerKeyAccount, ScVal, SorobanAuthorizationEntry,
    SorobanTransactionData,
};

use crate::errors::{host_error_code, GatewayError, Result};
use crate::fees::FeeConditions;
use crate::ledger::{
    simulation_failure, Inclusion, Invocation, Ledger, SignedEnvelope, Simulation,
    TransactionEnvelope, TxLookup,
};
use crate::signer::simulation_source;
use crate::xdr;

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_ATTEMPTS: u32 = 5;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Fee distribution as reported by `getFeeStats` (all values strings).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeDistribution {
    min: String,
    mode: String,
    p90: String,
    transaction_count: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeStats {
    soroban_inclusion_fee: FeeDistribution,
}

#[derive(Debug, Deserialize)]
struct HostFunctionResult {
    #[serde(default)]
    auth: Vec<String>,
    xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResult {
    #[serde(default)]
    min_resource_fee: Option<String>,
    #[serde(default)]
    results: Vec<HostFunctionResult>,
    #[serde(default)]
    transaction_data: Option<String>,
    #[serde(default)]
    restore_preamble: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    latest_ledger: u32,
}

#[derive(Debug, Deserialize)]
struct LedgerEntry {
    xdr: String,
}

#[derive(Debug, Deserialize)]
struct LedgerEntries {
    #[serde(default)]
    entries: Option<Vec<LedgerEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResult {
    status: String,
    hash: String,
    #[serde(default)]
    error_result_json: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionResult {
    status: String,
    #[serde(default)]
    ledger: Option<u32>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    return_value_json: Option<Value>,
    #[serde(default)]
    result_meta_json: Option<Value>,
    #[serde(default)]
    result_json: Option<Value>,
    #[serde(default)]
    diagnostic_events_json: Option<Value>,
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: Client,
    url: String,
    initial_backoff: Duration,
    max_attempts: u32,
}

impl RpcClient {
    pub fn new(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            initial_backoff: Duration::from_secs(INITIAL_BACKOFF_SECS),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Override the retry schedule.
    pub fn with_backoff(mut self, initial: Duration, max_attempts: u32) -> Self {
        self.initial_backoff = initial;
        self.max_attempts = max_attempts.max(1);
        self
    }

    async fn post(&self, method: &str, params: &Value) -> Result<reqwest::Response> {
        Ok(self
            .http
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?)
    }

    /// Idempotent call with back-off.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let failure = match self.post(method, &params).await {
                Err(e) => e.to_string(),
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    "rate-limited".to_string()
                }
                Ok(resp) => {
                    let body: RpcResponse = resp.json().await?;
                    match body.error {
                        // Invalid request / unknown method / bad params are never transient.
                        Some(err) if matches!(err.code, -32600 | -32601 | -32602) => {
                            return Err(GatewayError::Network(format!(
                                "RPC hard error {}: {}",
                                err.code, err.message
                            )));
                        }
                        Some(err) => format!("{} {}", err.code, err.message),
                        None => {
                            return body.result.ok_or_else(|| {
                                GatewayError::Decode(format!("Empty result from {method}"))
                            })
                        }
                    }
                }
            };

            if attempt >= self.max_attempts {
                return Err(GatewayError::Network(format!(
                    "{method} failed after {attempt} attempts: {failure}"
                )));
            }
            warn!("{method} failed (will retry in {}s): {failure}", backoff.as_secs());
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(Duration::from_secs(MAX_BACKOFF_SECS));
            attempt += 1;
        }
    }

    /// Single-shot call.
    async fn call_once(&self, method: &str, params: Value) -> Result<Value> {
        let resp = self.post(method, &params).await?;
        if !resp.status().is_success() {
            return Err(GatewayError::Network(format!(
                "{method} returned HTTP {}",
                resp.status()
            )));
        }
        let body: RpcResponse = resp.json().await?;
        if let Some(err) = body.error {
            return Err(GatewayError::Network(format!(
                "{method} error {}: {}",
                err.code, err.message
            )));
        }
        body.result
            .ok_or_else(|| GatewayError::Decode(format!("Empty result from {method}")))
    }
}

fn parse_u64(raw: &str, what: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| GatewayError::Decode(format!("{what} is not a number: {raw}")))
}

fn fee_conditions(stats: &FeeStats) -> Result<FeeConditions> {
    let dist = &stats.soroban_inclusion_fee;
    let base_fee = parse_u64(&dist.min, "fee min")?;
    let p90 = parse_u64(&dist.p90, "fee p90")?;
    let observed = parse_u64(&dist.transaction_count, "transaction count")?;

    if observed > 0 && p90 > base_fee {
        Ok(FeeConditions::Dynamic {
            base_fee,
            priority_fee: p90 - base_fee,
        })
    } else {
        Ok(FeeConditions::Flat {
            price: parse_u64(&dist.mode, "fee mode")?,
        })
    }
}

/// Contract return value from a `getTransaction` result.
fn return_value(result: &GetTransactionResult) -> Option<Value> {
    if let Some(value) = &result.return_value_json {
        return Some(value.clone());
    }
    let meta = result.result_meta_json.as_ref()?;
    ["/v4/soroban_meta/return_value", "/v3/soroban_meta/return_value"]
        .iter()
        .find_map(|ptr| meta.pointer(ptr))
        .cloned()
}

/// Contract error code carried by a failed transaction's diagnostics, either
/// as host error text or as a JSON `{"error": {"contract": N}}` value.
fn contract_code(diagnostics: &Value) -> Option<u32> {
    match diagnostics {
        Value::String(text) => host_error_code(text),
        Value::Array(items) => items.iter().find_map(contract_code),
        Value::Object(fields) => fields
            .get("error")
            .and_then(|e| e.get("contract"))
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
            .or_else(|| fields.values().find_map(contract_code)),
        _ => None,
    }
}

#[async_trait]
impl Ledger for RpcClient {
    async fn fee_conditions(&self) -> Result<FeeConditions> {
        let raw = self.call("getFeeStats", json!({})).await?;
        let stats: FeeStats = serde_json::from_value(raw)?;
        fee_conditions(&stats)
    }

    async fn latest_ledger(&self) -> Result<u32> {
        let raw = self.call("getLatestLedger", json!({})).await?;
        raw.get("sequence")
            .and_then(Value::as_u64)
            .and_then(|s| u32::try_from(s).ok())
            .ok_or_else(|| GatewayError::Decode("getLatestLedger without sequence".into()))
    }

    async fn sequence(&self, account: &str) -> Result<i64> {
        let key = LedgerKey::Account(LedgerKeyAccount {
            account_id: xdr::account_id(account)?,
        });
        let raw = self
            .call("getLedgerEntries", json!({ "keys": [xdr::encode(&key)?] }))
            .await?;
        let found: LedgerEntries = serde_json::from_value(raw)?;

        let entry = found
            .entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                GatewayError::Funds(format!("account {account} does not exist; fund it first"))
            })?;
        match xdr::decode::<LedgerEntryData>(&entry.xdr)? {
            LedgerEntryData::Account(account) => Ok(account.seq_num.0),
            other => Err(GatewayError::Decode(format!(
                "expected an account entry, got {}",
                other.name()
            ))),
        }
    }

    async fn simulate(&self, source: Option<&str>, invocation: &Invocation) -> Result<Simulation> {
        let source = source.map_or_else(simulation_source, str::to_string);
        let transaction =
            TransactionEnvelope::for_simulation(&source, invocation.clone()).to_base64()?;
        debug!(function = %invocation.function, bytes = transaction.len(), "simulateTransaction");

        let raw = self
            .call("simulateTransaction", json!({ "transaction": transaction }))
            .await?;
        let result: SimulateResult = serde_json::from_value(raw)?;

        if let Some(message) = result.error {
            return Err(simulation_failure(&message, invocation.codes));
        }
        if result.restore_preamble.is_some() {
            return Err(GatewayError::State(format!(
                "{} touches archived ledger entries that must be restored first",
                invocation.function
            )));
        }

        let min_resource_fee = match result.min_resource_fee.as_deref() {
            Some(fee) => parse_u64(fee, "minResourceFee")?,
            None => 0,
        };
        let (value, auth) = match result.results.into_iter().next() {
            Some(host) => {
                let value = match xdr::decode::<ScVal>(&host.xdr)? {
                    ScVal::Void => None,
                    value => Some(xdr::from_scval(&value)?),
                };
                let auth = host
                    .auth
                    .iter()
                    .map(|entry| xdr::decode::<SorobanAuthorizationEntry>(entry))
                    .collect::<Result<Vec<_>>>()?;
                (value, auth)
            }
            None => (None, Vec::new()),
        };
        let resources = result
            .transaction_data
            .as_deref()
            .map(xdr::decode::<SorobanTransactionData>)
            .transpose()?;

        Ok(Simulation {
            min_resource_fee,
            result: value,
            latest_ledger: result.latest_ledger,
            resources,
            auth,
        })
    }

    async fn send(&self, envelope: &SignedEnvelope) -> Result<String> {
        let transaction = envelope.to_base64()?;
        let raw = self
            .call_once(
                "sendTransaction",
                json!({ "transaction": transaction, "xdrFormat": "json" }),
            )
            .await?;
        let result: SendResult = serde_json::from_value(raw)?;

        match result.status.as_str() {
            "PENDING" | "DUPLICATE" => Ok(result.hash),
            "TRY_AGAIN_LATER" => Err(GatewayError::Network(format!(
                "network asked to retry {} later",
                result.hash
            ))),
            _ => Err(GatewayError::TransactionFailed {
                detail: result
                    .error_result_json
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| result.status.clone()),
                hash: result.hash,
                code: None,
            }),
        }
    }

    async fn transaction(&self, hash: &str) -> Result<TxLookup> {
        let raw = self
            .call("getTransaction", json!({ "hash": hash, "xdrFormat": "json" }))
            .await?;
        let result: GetTransactionResult = serde_json::from_value(raw)?;

        match result.status.as_str() {
            "SUCCESS" => Ok(TxLookup::Success(Inclusion {
                ledger: result.ledger.unwrap_or_default(),
                closed_at: result.created_at.as_deref().and_then(|s| s.parse().ok()),
                return_value: return_value(&result),
            })),
            "FAILED" => {
                Ok(TxLookup::Failed {
                    ledger: result.ledger.unwrap_or_default(),
                    detail: result
                        .result_json
                        .as_ref()
                        .map(Value::to_string)
                        .unwrap_or_else(|| "FAILED".into()),
                    code: result.diagnostic_events_json.as_ref().and_then(contract_code),
                })
            }
            _ => Ok(TxLookup::Pending),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
