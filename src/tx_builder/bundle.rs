//! Relay bundle client
//!
//! This module provides the [`Bundler`] trait and [`JitoBundler`], which
//! submits pre-signed transactions to the Jito block engine as one
//! all-or-nothing bundle.
//!
//! ## Key Features
//! - Abstract Bundler trait so the orchestrator can run against a mock
//! - Pseudo-random endpoint and tip-account selection over fixed candidate
//!   lists (load distribution only, uniformity is not security critical)
//! - A non-empty `error` in the relay's JSON-RPC answer rejects the whole
//!   bundle; nothing is retried, the caller re-plans with a fresh block
//!   reference

use crate::errors::{EngineError, RelayErrorKind};
use crate::observability::{metric_names, TraceContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{pubkey, pubkey::Pubkey};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Block engine regions
pub const DEFAULT_BLOCK_ENGINE_URLS: [&str; 6] = [
    "https://mainnet.block-engine.jito.wtf",
    "https://amsterdam.mainnet.block-engine.jito.wtf",
    "https://frankfurt.mainnet.block-engine.jito.wtf",
    "https://ny.mainnet.block-engine.jito.wtf",
    "https://tokyo.mainnet.block-engine.jito.wtf",
    "https://slc.mainnet.block-engine.jito.wtf",
];

/// Accounts the block engine accepts tips on
pub const JITO_TIP_ACCOUNTS: [Pubkey; 8] = [
    pubkey!("96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5"),
    pubkey!("HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe"),
    pubkey!("Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY"),
    pubkey!("ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49"),
    pubkey!("DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh"),
    pubkey!("ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt"),
    pubkey!("DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL"),
    pubkey!("3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT"),
];

/// Block engine limit on transactions per bundle
pub const MAX_BUNDLE_TRANSACTIONS: usize = 5;

const BUNDLES_PATH: &str = "/api/v1/bundles";

/// Relay acknowledgement of an accepted bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReceipt {
    pub bundle_id: String,
    pub endpoint: String,
}

#[async_trait]
pub trait Bundler: Send + Sync {
    /// Whether at least one relay endpoint is configured
    fn is_available(&self) -> bool;

    /// Tip destination for one tip instruction
    fn select_tip_account(&self) -> Pubkey;

    /// Submit base64-encoded signed transactions as one atomic bundle
    ///
    /// `endpoint` overrides the pseudo-random endpoint choice.
    async fn submit_bundle(
        &self,
        serialized: Vec<String>,
        endpoint: Option<&str>,
        trace_ctx: &TraceContext,
    ) -> Result<BundleReceipt, EngineError>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

fn is_empty_error(error: &Value) -> bool {
    match error {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Jito block engine client
pub struct JitoBundler {
    http: reqwest::Client,
    endpoints: Vec<String>,
    tip_accounts: Vec<Pubkey>,
}

impl JitoBundler {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::External(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoints,
            tip_accounts: JITO_TIP_ACCOUNTS.to_vec(),
        })
    }

    pub fn with_default_endpoints(timeout: Duration) -> Result<Self, EngineError> {
        Self::new(
            DEFAULT_BLOCK_ENGINE_URLS.iter().map(|s| s.to_string()).collect(),
            timeout,
        )
    }

    /// Replace the tip candidates (an empty list keeps the defaults)
    pub fn with_tip_accounts(mut self, tip_accounts: Vec<Pubkey>) -> Self {
        if !tip_accounts.is_empty() {
            self.tip_accounts = tip_accounts;
        }
        self
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn select_endpoint(&self) -> Option<&str> {
        if self.endpoints.is_empty() {
            return None;
        }
        Some(self.endpoints[fastrand::usize(..self.endpoints.len())].as_str())
    }

    fn bundle_url(base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), BUNDLES_PATH)
    }

    fn interpret_response(status: reqwest::StatusCode, body: &str, endpoint: &str) -> Result<String, EngineError> {
        let parsed: JsonRpcResponse = match serde_json::from_str(body) {
            Ok(parsed) => parsed,
            Err(_) => {
                return Err(EngineError::relay_unreachable(format!(
                    "{} answered HTTP {} with a non JSON-RPC body",
                    endpoint, status
                )))
            }
        };

        if let Some(error) = parsed.error.as_ref().filter(|e| !is_empty_error(e)) {
            return Err(EngineError::bundle_rejected(error_message(error)));
        }

        if !status.is_success() {
            return Err(EngineError::relay_unreachable(format!("{} answered HTTP {}", endpoint, status)));
        }

        match parsed.result {
            Some(Value::String(id)) if !id.is_empty() => Ok(id),
            _ => Err(EngineError::relay_unreachable(format!(
                "{} answered without a bundle id",
                endpoint
            ))),
        }
    }
}

#[async_trait]
impl Bundler for JitoBundler {
    fn is_available(&self) -> bool {
        !self.endpoints.is_empty()
    }

    fn select_tip_account(&self) -> Pubkey {
        self.tip_accounts[fastrand::usize(..self.tip_accounts.len())]
    }

    async fn submit_bundle(
        &self,
        serialized: Vec<String>,
        endpoint: Option<&str>,
        trace_ctx: &TraceContext,
    ) -> Result<BundleReceipt, EngineError> {
        if serialized.is_empty() {
            return Err(EngineError::validation("bundle is empty"));
        }
        if serialized.len() > MAX_BUNDLE_TRANSACTIONS {
            return Err(EngineError::validation(format!(
                "bundle holds {} transactions, relay limit is {}",
                serialized.len(),
                MAX_BUNDLE_TRANSACTIONS
            )));
        }

        let endpoint = match endpoint {
            Some(endpoint) => endpoint,
            None => self
                .select_endpoint()
                .ok_or_else(|| EngineError::relay_unreachable("no relay endpoints configured"))?,
        };

        let tx_count = serialized.len();
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendBundle",
            "params": [serialized, { "encoding": "base64" }],
        });

        debug!(
            endpoint = %endpoint,
            txs = tx_count,
            trace_id = %trace_ctx.trace_id(),
            "Submitting bundle"
        );

        let response = self
            .http
            .post(Self::bundle_url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::timeout(format!("relay {}: {}", endpoint, e))
                } else {
                    EngineError::relay_unreachable(format!("relay {}: {}", endpoint, e))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EngineError::relay_unreachable(format!("relay {}: {}", endpoint, e)))?;

        match Self::interpret_response(status, &text, endpoint) {
            Ok(bundle_id) => {
                info!(
                    endpoint = %endpoint,
                    bundle_id = %bundle_id,
                    txs = tx_count,
                    trace_id = %trace_ctx.trace_id(),
                    "Bundle accepted by relay"
                );
                metrics::counter!(metric_names::RELAY_BUNDLES_TOTAL, "outcome" => "accepted").increment(1);
                Ok(BundleReceipt {
                    bundle_id,
                    endpoint: endpoint.to_string(),
                })
            }
            Err(e) => {
                warn!(
                    endpoint = %endpoint,
                    error = %e,
                    trace_id = %trace_ctx.trace_id(),
                    "Bundle not accepted"
                );
                let outcome = match &e {
                    EngineError::Relay {
                        kind: RelayErrorKind::BundleRejected,
                        ..
                    } => "rejected",
                    _ => "failed",
                };
                metrics::counter!(metric_names::RELAY_BUNDLES_TOTAL, "outcome" => outcome).increment(1);
                Err(e)
            }
        }
    }
}
