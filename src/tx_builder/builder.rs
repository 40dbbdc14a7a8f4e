//! Transaction batch orchestrator
//!
//! Turns one logical request (create-and-buy, buy, sell) into a signed batch
//! and submits it. Every request walks the same state machine:
//!
//! ```text
//! Planning -> Signing -> Submitting -> { Succeeded | PartiallyFailed | Failed }
//! ```
//!
//! ## Planning
//!
//! A create-and-buy request with N bundled buyers becomes one primary
//! transaction (market creation, optional relay tip paid by the creator, the
//! creator's own buy) and `ceil(N / K)` secondary transactions of at most K
//! buys each. A secondary transaction is paid for by its first participant,
//! who also funds its relay tip. Buys inside one plan are priced against a
//! projected curve that advances after every buy, so later buyers get the
//! quote they would get on chain.
//!
//! ## Signing
//!
//! All transactions of a batch are compiled against one block reference and
//! signed by exactly the signers their message header requires. A missing
//! signer fails the whole batch before anything is submitted.
//!
//! ## Submitting
//!
//! - **Relay**: the batch goes out as one atomic bundle. A relay rejection
//!   means zero on-chain effect.
//! - **Sequential**: transactions are submitted and confirmed one at a time.
//!   The first failure stops the batch. Transactions confirmed before the
//!   failure are NOT rolled back, and the outcome reported to the caller is
//!   the primary transaction's: a request whose primary transaction landed
//!   reports success even if a later bundled buy failed. Callers needing
//!   all-or-nothing semantics must use the relay.
//!
//! ## Errors
//!
//! Failures before submission (state fetch, pricing, planning, signing) are
//! returned as `Err`. Failures during submission are returned as an outcome
//! with `success == false` and the classified error, because by then some
//! effect may already exist on chain.

use crate::curve::{
    bonding_curve_pda, buy_quote, decode_bonding_curve, decode_global_config, global_pda, sell_quote,
    BondingCurveRecord, GlobalConfigRecord, PriceQuote,
};
use crate::errors::EngineError;
use crate::ledger::Ledger;
use crate::observability::{metric_names, TraceContext};
use crate::tx_builder::bundle::{Bundler, MAX_BUNDLE_TRANSACTIONS};
use crate::tx_builder::classify::classify_signer_error;
use crate::tx_builder::context::ExecutionContext;
use crate::tx_builder::instructions::{
    build_buy, build_sell, compute_budget_instructions, create_instruction, sanity_check_ix_order,
    tip_instruction, PriorityFee, TokenMetadata,
};
use crate::tx_builder::output::{SignedTransaction, TxRole};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use spl_associated_token_account::get_associated_token_address;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a signed batch reaches the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitPolicy {
    /// Atomic bundle through the relay, each transaction carrying a tip
    Relay {
        tip_lamports: u64,
        /// Fixed relay endpoint, pseudo-random when `None`
        endpoint: Option<String>,
    },
    /// One transaction at a time, each confirmed before the next
    Sequential,
}

impl SubmitPolicy {
    fn label(&self) -> &'static str {
        match self {
            SubmitPolicy::Relay { .. } => "relay",
            SubmitPolicy::Sequential => "sequential",
        }
    }
}

/// One additional participant of a create-and-buy request
#[derive(Clone)]
pub struct BundledBuy {
    pub buyer: Arc<Keypair>,
    /// Lamports to spend
    pub sol_amount: u64,
}

#[derive(Clone)]
pub struct CreateAndBuyRequest {
    pub creator: Arc<Keypair>,
    /// Fresh keypair of the mint to create
    pub mint: Arc<Keypair>,
    pub metadata: TokenMetadata,
    /// Creator's own buy in lamports, 0 = create only
    pub buy_amount_sol: u64,
    pub bundled_buys: Vec<BundledBuy>,
    pub slippage_bps: Option<u64>,
    pub priority_fee: Option<PriorityFee>,
    pub policy: SubmitPolicy,
    pub commitment: CommitmentConfig,
}

#[derive(Clone)]
pub struct BuyRequest {
    pub buyer: Arc<Keypair>,
    pub mint: Pubkey,
    pub sol_amount: u64,
    pub slippage_bps: Option<u64>,
    pub priority_fee: Option<PriorityFee>,
    pub policy: SubmitPolicy,
    pub commitment: CommitmentConfig,
}

#[derive(Clone)]
pub struct SellRequest {
    pub seller: Arc<Keypair>,
    pub mint: Pubkey,
    pub token_amount: u64,
    pub slippage_bps: Option<u64>,
    pub priority_fee: Option<PriorityFee>,
    pub policy: SubmitPolicy,
    pub commitment: CommitmentConfig,
}

/// Unsigned transaction skeleton with its signer set
#[derive(Clone)]
pub struct PlannedTransaction {
    pub role: TxRole,
    pub payer: Pubkey,
    pub instructions: Vec<Instruction>,
    pub signers: Vec<Arc<Keypair>>,
    /// Buyers whose buy instruction lives in this transaction
    pub participants: Vec<Pubkey>,
}

impl PlannedTransaction {
    fn new(role: TxRole, payer: Pubkey) -> Self {
        Self {
            role,
            payer,
            instructions: Vec::new(),
            signers: Vec::new(),
            participants: Vec::new(),
        }
    }

    fn add_signer(&mut self, signer: &Arc<Keypair>) {
        if !self.signers.iter().any(|s| s.pubkey() == signer.pubkey()) {
            self.signers.push(Arc::clone(signer));
        }
    }

    pub fn signer_pubkeys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|s| s.pubkey()).collect()
    }
}

/// Ordered transactions of one request, primary first
#[derive(Clone)]
pub struct BatchPlan {
    pub transactions: Vec<PlannedTransaction>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn secondary(&self) -> impl Iterator<Item = &PlannedTransaction> {
        self.transactions
            .iter()
            .filter(|tx| matches!(tx.role, TxRole::Secondary { .. }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Planning,
    Signing,
    Submitting,
    Succeeded,
    PartiallyFailed,
    Failed,
}

/// Identifier of what was submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionId {
    Signature(Signature),
    /// Relay bundle id together with the primary transaction's signature
    Bundle { bundle_id: String, signature: Signature },
}

/// Terminal result of one request
///
/// Check `success` before trusting `id`: a failed outcome may still carry
/// the id of a transaction that reached the ledger and reverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub success: bool,
    pub id: Option<SubmissionId>,
    pub error: Option<EngineError>,
}

impl TransactionOutcome {
    pub fn succeeded(id: SubmissionId) -> Self {
        Self {
            success: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn failed(error: EngineError, id: Option<SubmissionId>) -> Self {
        Self {
            success: false,
            id,
            error: Some(error),
        }
    }

    pub fn signature(&self) -> Option<Signature> {
        match self.id.as_ref()? {
            SubmissionId::Signature(sig) => Some(*sig),
            SubmissionId::Bundle { signature, .. } => Some(*signature),
        }
    }

    pub fn bundle_id(&self) -> Option<&str> {
        match self.id.as_ref()? {
            SubmissionId::Bundle { bundle_id, .. } => Some(bundle_id),
            SubmissionId::Signature(_) => None,
        }
    }
}

/// Relay tip attached to every transaction of a relay plan
pub struct TipPlan<'a> {
    pub lamports: u64,
    pub bundler: &'a dyn Bundler,
}

/// Pure planning over a configuration snapshot
pub struct BatchPlanner<'a> {
    pub global: &'a GlobalConfigRecord,
    pub max_buys_per_tx: usize,
    pub slippage_bps: u64,
    pub priority_fee: Option<PriorityFee>,
    pub tip: Option<TipPlan<'a>>,
}

impl<'a> BatchPlanner<'a> {
    fn open(&self, role: TxRole, payer: &Arc<Keypair>) -> PlannedTransaction {
        let mut planned = PlannedTransaction::new(role, payer.pubkey());
        planned.add_signer(payer);
        planned
            .instructions
            .extend(compute_budget_instructions(self.priority_fee.as_ref()));
        planned
    }

    fn attach_tip(&self, planned: &mut PlannedTransaction) {
        if let Some(tip) = &self.tip {
            let account = tip.bundler.select_tip_account();
            planned
                .instructions
                .push(tip_instruction(&planned.payer, &account, tip.lamports));
        }
    }

    fn check_bundle_size(&self, plan: &BatchPlan) -> Result<(), EngineError> {
        if self.tip.is_some() && plan.len() > MAX_BUNDLE_TRANSACTIONS {
            return Err(EngineError::validation(format!(
                "plan needs {} transactions, a relay bundle holds at most {}",
                plan.len(),
                MAX_BUNDLE_TRANSACTIONS
            )));
        }
        Ok(())
    }

    fn quote_on(&self, curve: &BondingCurveRecord, sol_in: u64) -> Result<PriceQuote, EngineError> {
        buy_quote(curve, self.global, sol_in, self.slippage_bps)
    }

    pub fn plan_create_and_buy(
        &self,
        creator: &Arc<Keypair>,
        mint: &Arc<Keypair>,
        metadata: &TokenMetadata,
        creator_sol: u64,
        bundled_buys: &[BundledBuy],
    ) -> Result<BatchPlan, EngineError> {
        if self.max_buys_per_tx == 0 {
            return Err(EngineError::validation("max_buys_per_tx must be at least 1"));
        }
        if let Some(buy) = bundled_buys.iter().find(|b| b.sol_amount == 0) {
            return Err(EngineError::validation(format!(
                "bundled buy for {} spends 0 lamports",
                buy.buyer.pubkey()
            )));
        }

        let mint_key = mint.pubkey();
        let fee_recipient = self.global.fee_recipient;
        let mut curve = BondingCurveRecord::initial(self.global);
        // Holding accounts created earlier in this plan
        let mut created: HashSet<Pubkey> = HashSet::new();

        let mut primary = self.open(TxRole::Primary, creator);
        primary.add_signer(mint);
        primary
            .instructions
            .push(create_instruction(&mint_key, &creator.pubkey(), metadata)?);
        self.attach_tip(&mut primary);

        if creator_sol > 0 {
            // A fresh curve quotes exactly like `quote_initial_buy`
            let quote = self.quote_on(&curve, creator_sol)?;
            primary
                .instructions
                .extend(build_buy(&creator.pubkey(), &mint_key, &fee_recipient, &quote, false));
            primary.participants.push(creator.pubkey());
            created.insert(creator.pubkey());
            curve = curve.after_buy(creator_sol, quote.output_amount)?;
        }

        let mut transactions = vec![primary];

        for (index, chunk) in bundled_buys.chunks(self.max_buys_per_tx).enumerate() {
            let first = &chunk[0].buyer;
            let mut secondary = self.open(TxRole::Secondary { index }, first);
            self.attach_tip(&mut secondary);

            for buy in chunk {
                let buyer = buy.buyer.pubkey();
                let quote = self.quote_on(&curve, buy.sol_amount)?;
                let exists = !created.insert(buyer);
                secondary
                    .instructions
                    .extend(build_buy(&buyer, &mint_key, &fee_recipient, &quote, exists));
                secondary.add_signer(&buy.buyer);
                secondary.participants.push(buyer);
                curve = curve.after_buy(buy.sol_amount, quote.output_amount)?;
            }
            transactions.push(secondary);
        }

        let plan = BatchPlan { transactions };
        self.check_bundle_size(&plan)?;
        Ok(plan)
    }

    /// Single-transaction plan for a buy or sell on an existing market
    pub fn plan_trade(&self, trader: &Arc<Keypair>, trade: Vec<Instruction>) -> Result<BatchPlan, EngineError> {
        let mut primary = self.open(TxRole::Primary, trader);
        self.attach_tip(&mut primary);
        primary.instructions.extend(trade);
        primary.participants.push(trader.pubkey());
        let plan = BatchPlan {
            transactions: vec![primary],
        };
        self.check_bundle_size(&plan)?;
        Ok(plan)
    }
}

/// Compile and sign every transaction of `plan` against one block reference
pub fn sign_plan(plan: &BatchPlan, ctx: &ExecutionContext) -> Result<Vec<SignedTransaction>, EngineError> {
    let mut signed = Vec::with_capacity(plan.len());

    for planned in &plan.transactions {
        sanity_check_ix_order(&planned.instructions)?;

        let message = MessageV0::try_compile(&planned.payer, &planned.instructions, &[], ctx.blockhash())
            .map_err(|e| EngineError::validation(format!("{} message does not compile: {}", planned.role, e)))?;
        let message = VersionedMessage::V0(message);

        let num_required = message.header().num_required_signatures as usize;
        let required: Vec<Pubkey> = message
            .static_account_keys()
            .iter()
            .take(num_required)
            .copied()
            .collect();

        let available: HashMap<Pubkey, &Keypair> = planned
            .signers
            .iter()
            .map(|k| (k.pubkey(), k.as_ref()))
            .collect();

        let mut keypairs: Vec<&Keypair> = Vec::with_capacity(required.len());
        for key in &required {
            let keypair = available.get(key).ok_or_else(|| {
                EngineError::Signing(format!("{} transaction is missing required signer {}", planned.role, key))
            })?;
            keypairs.push(*keypair);
        }

        let tx = VersionedTransaction::try_new(message, keypairs.as_slice())
            .map_err(|e| classify_signer_error(&e))?;
        let output = SignedTransaction::new(tx, planned.role);
        let size = output.check_size()?;

        debug!(
            role = %planned.role,
            signers = required.len(),
            instructions = planned.instructions.len(),
            size,
            trace_id = %ctx.trace_context.trace_id(),
            "Transaction signed"
        );
        signed.push(output);
    }

    Ok(signed)
}

/// Knobs shared by every request of an orchestrator
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub max_buys_per_tx: usize,
    pub default_slippage_bps: u64,
    pub default_priority_fee: Option<PriorityFee>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_buys_per_tx: 4,
            default_slippage_bps: crate::curve::DEFAULT_SLIPPAGE_BPS,
            default_priority_fee: None,
        }
    }
}

/// Coordinates state fetch, planning, signing and submission
pub struct BatchOrchestrator {
    ledger: Arc<dyn Ledger>,
    bundler: Option<Arc<dyn Bundler>>,
    settings: OrchestratorSettings,
}

impl BatchOrchestrator {
    pub fn new(ledger: Arc<dyn Ledger>, bundler: Option<Arc<dyn Bundler>>, settings: OrchestratorSettings) -> Self {
        Self {
            ledger,
            bundler,
            settings,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn transition(&self, trace_ctx: &TraceContext, from: BatchState, to: BatchState) {
        debug!(
            from = ?from,
            to = ?to,
            operation = %trace_ctx.operation,
            trace_id = %trace_ctx.trace_id(),
            "Batch state transition"
        );
    }

    /// Global configuration, fetched fresh on every call
    pub async fn get_global_config(&self, commitment: CommitmentConfig) -> Result<GlobalConfigRecord, EngineError> {
        let data = self
            .ledger
            .get_account_data(&global_pda(), commitment)
            .await?
            .ok_or_else(EngineError::not_found)?;
        decode_global_config(&data)
    }

    /// Curve snapshot of `mint`, `None` when the market does not exist
    pub async fn get_market_state(
        &self,
        mint: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<BondingCurveRecord>, EngineError> {
        match self.ledger.get_account_data(&bonding_curve_pda(mint), commitment).await? {
            Some(data) => decode_bonding_curve(&data).map(Some),
            None => Ok(None),
        }
    }

    async fn holding_account_exists(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<bool, EngineError> {
        let ata = get_associated_token_address(owner, mint);
        Ok(self.ledger.get_account_data(&ata, commitment).await?.is_some())
    }

    fn tip_plan(&self, policy: &SubmitPolicy) -> Result<Option<TipPlan<'_>>, EngineError> {
        match policy {
            SubmitPolicy::Sequential => Ok(None),
            SubmitPolicy::Relay { tip_lamports, .. } => {
                let bundler = self
                    .bundler
                    .as_ref()
                    .filter(|b| b.is_available())
                    .ok_or_else(|| EngineError::validation("relay policy requested but no relay is configured"))?;
                if *tip_lamports == 0 {
                    return Err(EngineError::validation("relay policy requires a non-zero tip"));
                }
                Ok(Some(TipPlan {
                    lamports: *tip_lamports,
                    bundler: bundler.as_ref(),
                }))
            }
        }
    }

    fn planner<'a>(
        &'a self,
        global: &'a GlobalConfigRecord,
        slippage_bps: Option<u64>,
        priority_fee: Option<PriorityFee>,
        policy: &SubmitPolicy,
    ) -> Result<BatchPlanner<'a>, EngineError> {
        Ok(BatchPlanner {
            global,
            max_buys_per_tx: self.settings.max_buys_per_tx,
            slippage_bps: slippage_bps.unwrap_or(self.settings.default_slippage_bps),
            priority_fee: priority_fee.or(self.settings.default_priority_fee),
            tip: self.tip_plan(policy)?,
        })
    }

    /// Create a market and buy into it, optionally with bundled buyers
    pub async fn create_and_buy(&self, request: CreateAndBuyRequest) -> Result<TransactionOutcome, EngineError> {
        let trace_ctx = TraceContext::new("create_and_buy");
        let mint = request.mint.pubkey();
        info!(
            mint = %mint,
            creator = %request.creator.pubkey(),
            bundled_buys = request.bundled_buys.len(),
            policy = request.policy.label(),
            trace_id = %trace_ctx.trace_id(),
            "Planning create-and-buy"
        );

        if self.get_market_state(&mint, request.commitment).await?.is_some() {
            return Err(EngineError::validation(format!("market for mint {} already exists", mint)));
        }
        let global = self.get_global_config(request.commitment).await?;

        let plan = self
            .planner(&global, request.slippage_bps, request.priority_fee, &request.policy)?
            .plan_create_and_buy(
                &request.creator,
                &request.mint,
                &request.metadata,
                request.buy_amount_sol,
                &request.bundled_buys,
            )?;
        debug!(
            transactions = plan.len(),
            secondary = plan.secondary().count(),
            trace_id = %trace_ctx.trace_id(),
            "Batch planned"
        );

        self.execute(plan, &request.policy, request.commitment, trace_ctx).await
    }

    /// Buy on an existing market
    pub async fn buy(&self, request: BuyRequest) -> Result<TransactionOutcome, EngineError> {
        let trace_ctx = TraceContext::new("buy");
        let buyer = request.buyer.pubkey();
        if request.sol_amount == 0 {
            return Err(EngineError::validation("buy amount is 0 lamports"));
        }

        let global = self.get_global_config(request.commitment).await?;
        let curve = self
            .get_market_state(&request.mint, request.commitment)
            .await?
            .ok_or_else(EngineError::not_found)?;
        let exists = self
            .holding_account_exists(&buyer, &request.mint, request.commitment)
            .await?;

        let planner = self.planner(&global, request.slippage_bps, request.priority_fee, &request.policy)?;
        let quote = buy_quote(&curve, &global, request.sol_amount, planner.slippage_bps)?;
        info!(
            mint = %request.mint,
            buyer = %buyer,
            sol_in = quote.input_amount,
            tokens_out = quote.output_amount,
            max_sol_cost = quote.bounded_amount,
            trace_id = %trace_ctx.trace_id(),
            "Planning buy"
        );

        let plan = planner.plan_trade(
            &request.buyer,
            build_buy(&buyer, &request.mint, &global.fee_recipient, &quote, exists),
        )?;
        self.execute(plan, &request.policy, request.commitment, trace_ctx).await
    }

    /// Sell on an existing market
    pub async fn sell(&self, request: SellRequest) -> Result<TransactionOutcome, EngineError> {
        let trace_ctx = TraceContext::new("sell");
        let seller = request.seller.pubkey();
        if request.token_amount == 0 {
            return Err(EngineError::validation("sell amount is 0 tokens"));
        }

        let global = self.get_global_config(request.commitment).await?;
        let curve = self
            .get_market_state(&request.mint, request.commitment)
            .await?
            .ok_or_else(EngineError::not_found)?;
        if !self
            .holding_account_exists(&seller, &request.mint, request.commitment)
            .await?
        {
            return Err(EngineError::not_found());
        }

        let planner = self.planner(&global, request.slippage_bps, request.priority_fee, &request.policy)?;
        let quote = sell_quote(&curve, &global, request.token_amount, planner.slippage_bps)?;
        info!(
            mint = %request.mint,
            seller = %seller,
            tokens_in = quote.input_amount,
            sol_out = quote.output_amount,
            min_sol_output = quote.bounded_amount,
            trace_id = %trace_ctx.trace_id(),
            "Planning sell"
        );

        let plan = planner.plan_trade(
            &request.seller,
            build_sell(&seller, &request.mint, &global.fee_recipient, &quote),
        )?;
        self.execute(plan, &request.policy, request.commitment, trace_ctx).await
    }

    /// Sign and submit an already planned batch
    pub async fn execute(
        &self,
        plan: BatchPlan,
        policy: &SubmitPolicy,
        commitment: CommitmentConfig,
        trace_ctx: TraceContext,
    ) -> Result<TransactionOutcome, EngineError> {
        if plan.is_empty() {
            return Err(EngineError::validation("plan has no transactions"));
        }
        self.transition(&trace_ctx, BatchState::Planning, BatchState::Signing);

        let reference = self.ledger.get_latest_block_reference(commitment).await?;
        let ctx = ExecutionContext::new(reference, commitment, trace_ctx.child_span("sign_and_submit"));
        let signed = sign_plan(&plan, &ctx)?;

        self.transition(&trace_ctx, BatchState::Signing, BatchState::Submitting);
        let (outcome, state) = match policy {
            SubmitPolicy::Relay { endpoint, .. } => self.submit_relay(&signed, endpoint.as_deref(), &ctx).await?,
            SubmitPolicy::Sequential => self.submit_sequential(&signed, &ctx).await,
        };
        self.transition(&trace_ctx, BatchState::Submitting, state);

        let outcome_label = if outcome.success { "success" } else { "failure" };
        metrics::counter!(
            metric_names::SUBMISSIONS_TOTAL,
            "policy" => policy.label(),
            "outcome" => outcome_label
        )
        .increment(1);
        if let Some(err) = &outcome.error {
            metrics::counter!(metric_names::ERRORS_TOTAL, "category" => err.category()).increment(1);
        }

        match state {
            BatchState::Succeeded => info!(
                signature = ?outcome.signature(),
                bundle_id = ?outcome.bundle_id(),
                trace_id = %trace_ctx.trace_id(),
                "Batch succeeded"
            ),
            _ => warn!(
                state = ?state,
                error = ?outcome.error,
                trace_id = %trace_ctx.trace_id(),
                "Batch did not fully succeed"
            ),
        }

        Ok(outcome)
    }

    async fn confirm(&self, signature: &Signature, ctx: &ExecutionContext) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = self
            .ledger
            .confirm_transaction(signature, &ctx.reference, ctx.commitment)
            .await;
        metrics::histogram!(metric_names::CONFIRM_LATENCY_MS).record(started.elapsed().as_millis() as f64);
        result
    }

    async fn submit_relay(
        &self,
        signed: &[SignedTransaction],
        endpoint: Option<&str>,
        ctx: &ExecutionContext,
    ) -> Result<(TransactionOutcome, BatchState), EngineError> {
        let bundler = self
            .bundler
            .as_ref()
            .ok_or_else(|| EngineError::validation("relay policy requested but no relay is configured"))?;
        let serialized = signed
            .iter()
            .map(SignedTransaction::serialize_base64)
            .collect::<Result<Vec<_>, _>>()?;
        let primary = signed[0].signature();

        let receipt = match bundler.submit_bundle(serialized, endpoint, &ctx.trace_context).await {
            Ok(receipt) => receipt,
            Err(e) => return Ok((TransactionOutcome::failed(e, None), BatchState::Failed)),
        };

        let id = SubmissionId::Bundle {
            bundle_id: receipt.bundle_id,
            signature: primary,
        };
        match self.confirm(&primary, ctx).await {
            Ok(()) => Ok((TransactionOutcome::succeeded(id), BatchState::Succeeded)),
            Err(e) => Ok((TransactionOutcome::failed(e, Some(id)), BatchState::Failed)),
        }
    }

    async fn submit_sequential(
        &self,
        signed: &[SignedTransaction],
        ctx: &ExecutionContext,
    ) -> (TransactionOutcome, BatchState) {
        let mut primary_outcome: Option<TransactionOutcome> = None;

        for tx in signed {
            let failure = match self.ledger.submit_transaction(&tx.tx).await {
                Err(e) => Some((e, None)),
                Ok(signature) => match self.confirm(&signature, ctx).await {
                    Ok(()) => {
                        debug!(role = %tx.role, signature = %signature, "Transaction confirmed");
                        if primary_outcome.is_none() {
                            primary_outcome =
                                Some(TransactionOutcome::succeeded(SubmissionId::Signature(signature)));
                        }
                        None
                    }
                    Err(e) => Some((e, Some(SubmissionId::Signature(signature)))),
                },
            };

            if let Some((error, id)) = failure {
                return match primary_outcome {
                    None => (TransactionOutcome::failed(error, id), BatchState::Failed),
                    Some(outcome) => {
                        // Earlier transactions already landed and stay landed
                        warn!(
                            role = %tx.role,
                            error = %error,
                            trace_id = %ctx.trace_context.trace_id(),
                            "Bundled transaction failed, stopping batch"
                        );
                        (outcome, BatchState::PartiallyFailed)
                    }
                };
            }
        }

        match primary_outcome {
            Some(outcome) => (outcome, BatchState::Succeeded),
            None => (
                TransactionOutcome::failed(EngineError::validation("nothing was submitted"), None),
                BatchState::Failed,
            ),
        }
    }
}
