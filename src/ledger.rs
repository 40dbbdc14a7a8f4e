//! Ledger RPC node interface
//!
//! The engine reaches the chain only through [`Ledger`]: account reads,
//! block-reference fetches, submission and bounded confirmation waits.
//! [`RpcLedger`] implements it on the nonblocking `solana-client` RPC client.
//! Nothing here caches: every call goes to the node.

use crate::errors::EngineError;
use crate::tx_builder::classify::{classify_client_error, classify_execution_failure};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Recent block reference used to sign a batch
///
/// Transactions signed against `blockhash` can land until the chain passes
/// `last_valid_block_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReference {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Account fetch and transaction submit interface of a ledger node
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Raw account data, `None` when the account does not exist
    async fn get_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>, EngineError>;

    async fn get_latest_block_reference(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<BlockReference, EngineError>;

    async fn submit_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, EngineError>;

    /// Wait until `signature` reaches `commitment`
    ///
    /// Fails with `Network(Expired)` once the chain passes the reference's
    /// validity window without the transaction landing, and with
    /// `Program(..)` if it landed and reverted.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        reference: &BlockReference,
        commitment: CommitmentConfig,
    ) -> Result<(), EngineError>;
}

/// [`Ledger`] backed by a JSON-RPC node
pub struct RpcLedger {
    client: Arc<RpcClient>,
    poll_interval: Duration,
    confirm_timeout: Duration,
}

impl RpcLedger {
    pub fn new(endpoint: String, timeout: Duration, poll_interval: Duration, confirm_timeout: Duration) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_timeout(endpoint, timeout)),
            poll_interval,
            confirm_timeout,
        }
    }

    pub fn from_client(client: Arc<RpcClient>, poll_interval: Duration, confirm_timeout: Duration) -> Self {
        Self {
            client,
            poll_interval,
            confirm_timeout,
        }
    }

    /// Execution logs of a landed transaction, empty if unavailable
    async fn fetch_logs(&self, signature: &Signature) -> Vec<String> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        match self.client.get_transaction_with_config(signature, config).await {
            Ok(tx) => tx
                .transaction
                .meta
                .and_then(|meta| Option::<Vec<String>>::from(meta.log_messages))
                .unwrap_or_default(),
            Err(e) => {
                debug!(signature = %signature, error = %e, "Failed to fetch transaction logs");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn get_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let response = self
            .client
            .get_account_with_commitment(address, commitment)
            .await
            .map_err(|e| classify_client_error(&e))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_latest_block_reference(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<BlockReference, EngineError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(commitment)
            .await
            .map_err(|e| classify_client_error(&e))?;
        Ok(BlockReference {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn submit_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, EngineError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.client.commitment().commitment),
            max_retries: Some(0),
            ..Default::default()
        };
        self.client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(|e| classify_client_error(&e))
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        reference: &BlockReference,
        commitment: CommitmentConfig,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        loop {
            let statuses = self
                .client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| classify_client_error(&e))?;

            match statuses.value.into_iter().next().flatten() {
                Some(status) => {
                    if let Some(err) = status.err.as_ref() {
                        let raw = format!("{:?}", err);
                        let logs = self.fetch_logs(signature).await;
                        warn!(signature = %signature, error = %raw, "Transaction reverted");
                        return Err(classify_execution_failure(&logs, &raw));
                    }
                    if status.satisfies_commitment(commitment) {
                        return Ok(());
                    }
                }
                None => {
                    let height = self
                        .client
                        .get_block_height_with_commitment(CommitmentConfig::confirmed())
                        .await
                        .map_err(|e| classify_client_error(&e))?;
                    if height > reference.last_valid_block_height {
                        return Err(EngineError::expired(format!(
                            "block height {} passed last valid height {} for {}",
                            height, reference.last_valid_block_height, signature
                        )));
                    }
                }
            }

            if started.elapsed() >= self.confirm_timeout {
                return Err(EngineError::timeout(format!(
                    "{} not at {:?} after {:?}",
                    signature, commitment.commitment, self.confirm_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
