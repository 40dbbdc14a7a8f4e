//! Test Utilities Module
//!
//! Deterministic in-memory stand-ins for the ledger node, the relay and the
//! metadata gateway, so orchestration can be tested without any network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::curve::{bonding_curve_pda, global_pda, BondingCurveRecord, GlobalConfigRecord};
use crate::errors::EngineError;
use crate::ledger::{BlockReference, Ledger};
use crate::metadata::{MetadataGateway, MetadataUpload, UploadedMetadata};
use crate::observability::TraceContext;
use crate::tx_builder::bundle::{BundleReceipt, Bundler};
use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::get_associated_token_address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Global configuration with the live program's launch parameters
pub fn sample_global_config() -> GlobalConfigRecord {
    GlobalConfigRecord {
        initialized: true,
        authority: Pubkey::new_from_array([7u8; 32]),
        fee_recipient: Pubkey::new_from_array([9u8; 32]),
        initial_virtual_token_reserves: 1_073_000_000_000_000,
        initial_virtual_sol_reserves: 30_000_000_000,
        initial_real_token_reserves: 793_100_000_000_000,
        token_total_supply: 1_000_000_000_000_000,
        fee_basis_points: 100,
    }
}

/// Curve of a market with no trades yet
pub fn sample_curve() -> BondingCurveRecord {
    BondingCurveRecord::initial(&sample_global_config())
}

/// In-memory ledger
///
/// Submission and confirmation attempts are counted from 0 in call order,
/// failed attempts included. A configured failure index makes that attempt
/// fail with the stored error. `submitted` and `confirmed` only hold the
/// attempts that succeeded.
#[derive(Clone)]
pub struct MockLedger {
    pub accounts: Arc<Mutex<HashMap<Pubkey, Vec<u8>>>>,
    /// Every account read with the commitment it was made at
    pub account_reads: Arc<Mutex<Vec<(Pubkey, CommitmentConfig)>>>,
    pub attempts: Arc<Mutex<Vec<VersionedTransaction>>>,
    pub submitted: Arc<Mutex<Vec<VersionedTransaction>>>,
    pub confirm_attempts: Arc<Mutex<Vec<Signature>>>,
    pub confirmed: Arc<Mutex<Vec<Signature>>>,
    pub submit_failure: Arc<Mutex<Option<(usize, EngineError)>>>,
    pub confirm_failure: Arc<Mutex<Option<(usize, EngineError)>>>,
    pub reference: BlockReference,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            account_reads: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(Vec::new())),
            submitted: Arc::new(Mutex::new(Vec::new())),
            confirm_attempts: Arc::new(Mutex::new(Vec::new())),
            confirmed: Arc::new(Mutex::new(Vec::new())),
            submit_failure: Arc::new(Mutex::new(None)),
            confirm_failure: Arc::new(Mutex::new(None)),
            reference: BlockReference {
                blockhash: Hash::new_from_array([3u8; 32]),
                last_valid_block_height: 1_000,
            },
        }
    }

    /// Ledger holding the global configuration account
    pub async fn with_global(config: &GlobalConfigRecord) -> Self {
        let ledger = Self::new();
        ledger.set_account(global_pda(), config.to_account_bytes()).await;
        ledger
    }

    pub async fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().await.insert(address, data);
    }

    pub async fn set_curve(&self, mint: &Pubkey, curve: &BondingCurveRecord) {
        self.set_account(bonding_curve_pda(mint), curve.to_account_bytes()).await;
    }

    /// Register an (empty) holding account of `owner` for `mint`
    pub async fn set_holding_account(&self, owner: &Pubkey, mint: &Pubkey) {
        self.set_account(get_associated_token_address(owner, mint), vec![0u8; 165])
            .await;
    }

    pub async fn fail_submission_at(&self, index: usize, error: EngineError) {
        *self.submit_failure.lock().await = Some((index, error));
    }

    pub async fn fail_confirmation_at(&self, index: usize, error: EngineError) {
        *self.confirm_failure.lock().await = Some((index, error));
    }

    pub async fn submission_count(&self) -> usize {
        self.submitted.lock().await.len()
    }

    pub async fn submitted_transactions(&self) -> Vec<VersionedTransaction> {
        self.submitted.lock().await.clone()
    }

    /// Every transaction handed to `submit_transaction`, failed or not
    pub async fn attempted_transactions(&self) -> Vec<VersionedTransaction> {
        self.attempts.lock().await.clone()
    }

    pub async fn confirmation_attempts(&self) -> Vec<Signature> {
        self.confirm_attempts.lock().await.clone()
    }

    pub async fn read_commitments(&self) -> Vec<CommitmentConfig> {
        self.account_reads.lock().await.iter().map(|(_, c)| *c).collect()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn get_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        self.account_reads.lock().await.push((*address, commitment));
        Ok(self.accounts.lock().await.get(address).cloned())
    }

    async fn get_latest_block_reference(
        &self,
        _commitment: CommitmentConfig,
    ) -> Result<BlockReference, EngineError> {
        Ok(self.reference)
    }

    async fn submit_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, EngineError> {
        let index = {
            let mut attempts = self.attempts.lock().await;
            attempts.push(tx.clone());
            attempts.len() - 1
        };
        if let Some((at, error)) = self.submit_failure.lock().await.as_ref() {
            if *at == index {
                return Err(error.clone());
            }
        }
        self.submitted.lock().await.push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _reference: &BlockReference,
        _commitment: CommitmentConfig,
    ) -> Result<(), EngineError> {
        let index = {
            let mut attempts = self.confirm_attempts.lock().await;
            attempts.push(*signature);
            attempts.len() - 1
        };
        if let Some((at, error)) = self.confirm_failure.lock().await.as_ref() {
            if *at == index {
                return Err(error.clone());
            }
        }
        self.confirmed.lock().await.push(*signature);
        Ok(())
    }
}

/// In-memory relay
#[derive(Clone)]
pub struct MockBundler {
    pub should_succeed: Arc<Mutex<bool>>,
    pub rejection: EngineError,
    pub bundles: Arc<Mutex<Vec<Vec<String>>>>,
    pub tip_account: Pubkey,
    pub bundle_id: String,
}

impl MockBundler {
    pub fn new() -> Self {
        Self {
            should_succeed: Arc::new(Mutex::new(true)),
            rejection: EngineError::bundle_rejected("bundle simulation failed"),
            bundles: Arc::new(Mutex::new(Vec::new())),
            tip_account: Pubkey::new_from_array([42u8; 32]),
            bundle_id: "mock-bundle-id".to_string(),
        }
    }

    /// Relay that rejects every bundle
    pub fn new_rejecting() -> Self {
        let mut bundler = Self::new();
        bundler.should_succeed = Arc::new(Mutex::new(false));
        bundler
    }

    pub async fn set_should_succeed(&self, should_succeed: bool) {
        *self.should_succeed.lock().await = should_succeed;
    }

    pub async fn bundle_count(&self) -> usize {
        self.bundles.lock().await.len()
    }

    pub async fn submitted_bundles(&self) -> Vec<Vec<String>> {
        self.bundles.lock().await.clone()
    }
}

impl Default for MockBundler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bundler for MockBundler {
    fn is_available(&self) -> bool {
        true
    }

    fn select_tip_account(&self) -> Pubkey {
        self.tip_account
    }

    async fn submit_bundle(
        &self,
        serialized: Vec<String>,
        endpoint: Option<&str>,
        _trace_ctx: &TraceContext,
    ) -> Result<BundleReceipt, EngineError> {
        if !*self.should_succeed.lock().await {
            return Err(self.rejection.clone());
        }
        self.bundles.lock().await.push(serialized);
        Ok(BundleReceipt {
            bundle_id: self.bundle_id.clone(),
            endpoint: endpoint.unwrap_or("mock://relay").to_string(),
        })
    }
}

/// In-memory metadata gateway returning a URI derived from the symbol
#[derive(Clone, Default)]
pub struct MockMetadataGateway {
    pub uploads: Arc<Mutex<Vec<MetadataUpload>>>,
}

impl MockMetadataGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl MetadataGateway for MockMetadataGateway {
    async fn upload(&self, upload: &MetadataUpload) -> Result<UploadedMetadata, EngineError> {
        upload.validate()?;
        self.uploads.lock().await.push(upload.clone());
        Ok(UploadedMetadata {
            metadata_uri: format!("ipfs://mock/{}", upload.symbol),
            name: Some(upload.name.clone()),
            symbol: Some(upload.symbol.clone()),
            image: None,
        })
    }
}

/// Metrics recorder that tallies counter increments by rendered key
///
/// Install with `metrics::with_local_recorder`; keys render as
/// `name{label=value,..}` in label order.
#[derive(Clone, Default)]
pub struct CountingRecorder {
    pub counts: Arc<std::sync::Mutex<HashMap<String, u64>>>,
}

struct TallyCounter {
    key: String,
    counts: Arc<std::sync::Mutex<HashMap<String, u64>>>,
}

impl metrics::CounterFn for TallyCounter {
    fn increment(&self, value: u64) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(self.key.clone()).or_default() += value;
        }
    }

    fn absolute(&self, value: u64) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.insert(self.key.clone(), value);
        }
    }
}

impl CountingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(key: &metrics::Key) -> String {
        let labels: Vec<String> = key
            .labels()
            .map(|label| format!("{}={}", label.key(), label.value()))
            .collect();
        if labels.is_empty() {
            key.name().to_string()
        } else {
            format!("{}{{{}}}", key.name(), labels.join(","))
        }
    }

    /// Total recorded for the rendered key, 0 if never incremented
    pub fn count(&self, rendered: &str) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.get(rendered).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Sum over every key of the metric `name`, whatever its labels
    pub fn total(&self, name: &str) -> u64 {
        self.counts
            .lock()
            .map(|counts| {
                counts
                    .iter()
                    .filter(|(key, _)| key.as_str() == name || key.starts_with(&format!("{}{{", name)))
                    .map(|(_, value)| *value)
                    .sum()
            })
            .unwrap_or(0)
    }
}

impl metrics::Recorder for CountingRecorder {
    fn describe_counter(&self, _key: metrics::KeyName, _unit: Option<metrics::Unit>, _description: metrics::SharedString) {}

    fn describe_gauge(&self, _key: metrics::KeyName, _unit: Option<metrics::Unit>, _description: metrics::SharedString) {}

    fn describe_histogram(
        &self,
        _key: metrics::KeyName,
        _unit: Option<metrics::Unit>,
        _description: metrics::SharedString,
    ) {
    }

    fn register_counter(&self, key: &metrics::Key, _metadata: &metrics::Metadata<'_>) -> metrics::Counter {
        metrics::Counter::from_arc(Arc::new(TallyCounter {
            key: Self::render(key),
            counts: Arc::clone(&self.counts),
        }))
    }

    fn register_gauge(&self, _key: &metrics::Key, _metadata: &metrics::Metadata<'_>) -> metrics::Gauge {
        metrics::Gauge::noop()
    }

    fn register_histogram(&self, _key: &metrics::Key, _metadata: &metrics::Metadata<'_>) -> metrics::Histogram {
        metrics::Histogram::noop()
    }
}
