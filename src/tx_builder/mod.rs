//! Transaction construction and submission
//!
//! ## Architecture
//!
//! - **instructions**: program instruction encoding, compute budget and tip
//!   instructions, ordering checks
//! - **context**: block reference and commitment shared by one batch
//! - **output**: signed transactions with their required signer set
//! - **bundle**: relay bundle client (Jito block engine)
//! - **classify**: mapping of ledger, relay and signer failures onto
//!   [`EngineError`]
//! - **builder**: planning, signing and submission of whole batches
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pump_bundler::tx_builder::{BatchOrchestrator, BuyRequest, OrchestratorSettings, SubmitPolicy};
//! use pump_bundler::ledger::RpcLedger;
//! use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Keypair};
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example() -> Result<(), pump_bundler::errors::EngineError> {
//! let ledger = Arc::new(RpcLedger::new(
//!     "http://127.0.0.1:8899".to_string(),
//!     Duration::from_secs(10),
//!     Duration::from_millis(500),
//!     Duration::from_secs(60),
//! ));
//! let orchestrator = BatchOrchestrator::new(ledger, None, OrchestratorSettings::default());
//!
//! let outcome = orchestrator
//!     .buy(BuyRequest {
//!         buyer: Arc::new(Keypair::new()),
//!         mint: Pubkey::new_unique(),
//!         sol_amount: 100_000_000,
//!         slippage_bps: None,
//!         priority_fee: None,
//!         policy: SubmitPolicy::Sequential,
//!         commitment: CommitmentConfig::confirmed(),
//!     })
//!     .await?;
//! assert!(outcome.success || outcome.error.is_some());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod bundle;
pub mod classify;
pub mod context;
pub mod instructions;
pub mod output;

pub use crate::errors::EngineError;
pub use builder::{
    sign_plan, BatchOrchestrator, BatchPlan, BatchPlanner, BatchState, BundledBuy, BuyRequest,
    CreateAndBuyRequest, OrchestratorSettings, PlannedTransaction, SellRequest, SubmissionId, SubmitPolicy,
    TipPlan, TransactionOutcome,
};
pub use bundle::{BundleReceipt, Bundler, JitoBundler};
pub use classify::{classify_client_error, classify_execution_failure, classify_program_failure};
pub use context::ExecutionContext;
pub use instructions::{sanity_check_ix_order, PriorityFee, TokenMetadata};
pub use output::{SignedTransaction, TxRole, MAX_TRANSACTION_SIZE};
