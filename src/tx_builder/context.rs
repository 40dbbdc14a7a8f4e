//! Execution context shared by every transaction of one batch
//!
//! A batch is finalized against a single block reference so that all its
//! transactions share one validity window: the relay sees a consistent
//! bundle and the sequential path can report `Expired` for the whole batch
//! once the window closes.

use crate::ledger::BlockReference;
use crate::observability::TraceContext;
use solana_sdk::{commitment_config::CommitmentConfig, hash::Hash};

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub reference: BlockReference,

    /// Durability level every confirmation in this batch waits for
    pub commitment: CommitmentConfig,

    pub trace_context: TraceContext,
}

impl ExecutionContext {
    pub fn new(reference: BlockReference, commitment: CommitmentConfig, trace_context: TraceContext) -> Self {
        Self {
            reference,
            commitment,
            trace_context,
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.reference.blockhash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_exposes_reference_blockhash() {
        let reference = BlockReference {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 150,
        };
        let ctx = ExecutionContext::new(reference, CommitmentConfig::finalized(), TraceContext::new("test"));
        assert_eq!(ctx.blockhash(), reference.blockhash);
        assert_eq!(ctx.reference.last_valid_block_height, 150);
    }
}
