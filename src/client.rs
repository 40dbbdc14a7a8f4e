//! Public entry point
//!
//! [`PumpClient`] wires a ledger, an optional relay, a metadata gateway and
//! the event subscription registry into the operations callers use:
//! `create_and_buy`, `buy`, `sell`, `get_market_state`, `get_global_config`,
//! `subscribe`, `unsubscribe` and `upload_metadata`.

use crate::config::{parse_commitment, EngineConfig};
use crate::curve::{BondingCurveRecord, GlobalConfigRecord, PUMP_PROGRAM_ID};
use crate::errors::EngineError;
use crate::ledger::{Ledger, RpcLedger};
use crate::metadata::{HttpMetadataGateway, MetadataGateway, MetadataUpload, UploadedMetadata};
use crate::streaming::{EventSubscriptions, SubscriptionHandle};
use crate::tx_builder::{
    BatchOrchestrator, Bundler, BuyRequest, CreateAndBuyRequest, JitoBundler, OrchestratorSettings, PriorityFee,
    SellRequest, SubmitPolicy, TransactionOutcome,
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "ws-stream")]
use crate::{curve::PumpEvent, streaming::EventFilter};
#[cfg(feature = "ws-stream")]
use tokio::sync::mpsc;

pub struct PumpClient {
    orchestrator: BatchOrchestrator,
    gateway: Arc<dyn MetadataGateway>,
    subscriptions: EventSubscriptions,
    default_policy: SubmitPolicy,
    commitment: CommitmentConfig,
}

impl PumpClient {
    /// Assemble a client from already constructed collaborators
    pub fn new(
        ledger: Arc<dyn Ledger>,
        bundler: Option<Arc<dyn Bundler>>,
        gateway: Arc<dyn MetadataGateway>,
        subscriptions: EventSubscriptions,
        settings: OrchestratorSettings,
        default_policy: SubmitPolicy,
        commitment: CommitmentConfig,
    ) -> Self {
        Self {
            orchestrator: BatchOrchestrator::new(ledger, bundler, settings),
            gateway,
            subscriptions,
            default_policy,
            commitment,
        }
    }

    /// Build the production client described by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::validation(format!("invalid configuration: {:#}", e)))?;
        let commitment = parse_commitment(&config.rpc.commitment).map_err(|e| EngineError::validation(e.to_string()))?;

        let ledger: Arc<dyn Ledger> = Arc::new(RpcLedger::new(
            config.rpc.endpoint.clone(),
            config.rpc.timeout(),
            config.rpc.poll_interval(),
            config.rpc.confirm_timeout(),
        ));

        let (bundler, default_policy) = if config.relay.enabled {
            let bundler: Arc<dyn Bundler> = Arc::new(JitoBundler::new(
                config.relay.endpoints.clone(),
                Duration::from_millis(config.relay.timeout_ms),
            )?);
            let policy = SubmitPolicy::Relay {
                tip_lamports: config.relay.tip_lamports,
                endpoint: None,
            };
            (Some(bundler), policy)
        } else {
            (None, SubmitPolicy::Sequential)
        };

        let gateway: Arc<dyn MetadataGateway> = Arc::new(HttpMetadataGateway::new(
            config.metadata.upload_url.clone(),
            Duration::from_secs(config.metadata.timeout_secs),
        )?);

        let priority_fee = (config.trading.compute_unit_price > 0).then_some(PriorityFee {
            unit_limit: config.trading.compute_unit_limit,
            unit_price: config.trading.compute_unit_price,
        });
        let settings = OrchestratorSettings {
            max_buys_per_tx: config.trading.max_buys_per_tx,
            default_slippage_bps: config.trading.default_slippage_bps,
            default_priority_fee: priority_fee,
        };

        info!(
            rpc = %config.rpc.endpoint,
            relay = config.relay.enabled,
            max_buys_per_tx = settings.max_buys_per_tx,
            "Client configured"
        );

        Ok(Self::new(
            ledger,
            bundler,
            gateway,
            EventSubscriptions::new(config.rpc.ws_endpoint.clone(), PUMP_PROGRAM_ID, commitment),
            settings,
            default_policy,
            commitment,
        ))
    }

    /// Policy used by requests built from configuration
    pub fn default_policy(&self) -> &SubmitPolicy {
        &self.default_policy
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    pub async fn create_and_buy(&self, request: CreateAndBuyRequest) -> Result<TransactionOutcome, EngineError> {
        self.orchestrator.create_and_buy(request).await
    }

    pub async fn buy(&self, request: BuyRequest) -> Result<TransactionOutcome, EngineError> {
        self.orchestrator.buy(request).await
    }

    pub async fn sell(&self, request: SellRequest) -> Result<TransactionOutcome, EngineError> {
        self.orchestrator.sell(request).await
    }

    /// Curve snapshot of `mint` at the client's commitment, `None` when no
    /// market exists for it
    pub async fn get_market_state(&self, mint: &Pubkey) -> Result<Option<BondingCurveRecord>, EngineError> {
        self.get_market_state_with_commitment(mint, self.commitment).await
    }

    pub async fn get_market_state_with_commitment(
        &self,
        mint: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<BondingCurveRecord>, EngineError> {
        self.orchestrator.get_market_state(mint, commitment).await
    }

    pub async fn get_global_config(&self) -> Result<GlobalConfigRecord, EngineError> {
        self.get_global_config_with_commitment(self.commitment).await
    }

    pub async fn get_global_config_with_commitment(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<GlobalConfigRecord, EngineError> {
        self.orchestrator.get_global_config(commitment).await
    }

    pub async fn upload_metadata(&self, upload: &MetadataUpload) -> Result<UploadedMetadata, EngineError> {
        self.gateway.upload(upload).await
    }

    #[cfg(feature = "ws-stream")]
    pub async fn subscribe(
        &self,
        filter: impl Into<EventFilter>,
    ) -> Result<(SubscriptionHandle, mpsc::UnboundedReceiver<PumpEvent>), EngineError> {
        self.subscriptions.subscribe(filter).await
    }

    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), EngineError> {
        self.subscriptions.unsubscribe(handle).await
    }

    pub fn subscriptions(&self) -> &EventSubscriptions {
        &self.subscriptions
    }
}
