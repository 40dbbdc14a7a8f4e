//! Crate-internal tests for batch planning and orchestration


use crate::curve::PUMP_PROGRAM_ID;
use crate::tx_builder::instructions::BUY_DISCRIMINATOR;
use crate::tx_builder::{BundledBuy, PlannedTransaction, TokenMetadata};
use solana_sdk::signature::Keypair;
use std::sync::Arc;

pub(crate) fn metadata() -> TokenMetadata {
    TokenMetadata {
        name: "Bundled".to_string(),
        symbol: "BNDL".to_string(),
        uri: "https://ipfs.io/ipfs/QmTestMetadataUri".to_string(),
    }
}

pub(crate) fn bundled_buys(count: usize, sol_amount: u64) -> Vec<BundledBuy> {
    (0..count)
        .map(|_| BundledBuy {
            buyer: Arc::new(Keypair::new()),
            sol_amount,
        })
        .collect()
}

/// Token amounts of the buy instructions in `planned`, in order
pub(crate) fn buy_amounts(planned: &PlannedTransaction) -> Vec<u64> {
    planned
        .instructions
        .iter()
        .filter(|ix| ix.program_id == PUMP_PROGRAM_ID && ix.data[..8] == BUY_DISCRIMINATOR)
        .map(|ix| {
            let mut amount = [0u8; 8];
            amount.copy_from_slice(&ix.data[8..16]);
            u64::from_le_bytes(amount)
        })
        .collect()
}
