//! Signed transaction output
//!
//! [`SignedTransaction`] holds a fully signed versioned transaction together
//! with the signer set its message header demands, so submission code can
//! assert that nothing is missing before a transaction leaves the process.

use crate::errors::EngineError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};

/// Largest serialized transaction the network accepts
pub const MAX_TRANSACTION_SIZE: usize = 1232;

/// Position of a transaction inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxRole {
    /// Market creation plus the creator's buy, or the single trade of a buy/sell
    Primary,
    /// Bundled buys, `index` counts from 0
    Secondary { index: usize },
}

impl std::fmt::Display for TxRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxRole::Primary => write!(f, "primary"),
            TxRole::Secondary { index } => write!(f, "secondary[{}]", index),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx: VersionedTransaction,
    pub role: TxRole,

    /// Extracted from `message.header.num_required_signatures`
    pub required_signers: Vec<Pubkey>,
}

impl SignedTransaction {
    pub fn new(tx: VersionedTransaction, role: TxRole) -> Self {
        let num_required = tx.message.header().num_required_signatures as usize;
        let required_signers = tx
            .message
            .static_account_keys()
            .iter()
            .take(num_required)
            .copied()
            .collect();

        Self {
            tx,
            role,
            required_signers,
        }
    }

    /// First signature, the transaction id on the ledger
    pub fn signature(&self) -> Signature {
        self.tx.signatures.first().copied().unwrap_or_default()
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.required_signers.first().copied()
    }

    /// Wire bytes as the ledger receives them
    pub fn serialize(&self) -> Result<Vec<u8>, EngineError> {
        bincode::serialize(&self.tx)
            .map_err(|e| EngineError::validation(format!("{} transaction not serializable: {}", self.role, e)))
    }

    pub fn serialize_base64(&self) -> Result<String, EngineError> {
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Reject transactions over the packet limit
    pub fn check_size(&self) -> Result<usize, EngineError> {
        let size = self.serialize()?.len();
        if size > MAX_TRANSACTION_SIZE {
            return Err(EngineError::validation(format!(
                "{} transaction is {} bytes, limit is {}; lower max_buys_per_tx",
                self.role, size, MAX_TRANSACTION_SIZE
            )));
        }
        Ok(size)
    }

    /// Every required signer produced a non-default signature
    pub fn is_fully_signed(&self) -> bool {
        self.tx.signatures.len() == self.required_signers.len()
            && self.tx.signatures.iter().all(|s| *s != Signature::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::{v0::Message as MessageV0, VersionedMessage},
        signature::{Keypair, Signer},
        system_instruction,
    };

    fn transfer_tx(payer: &Keypair, extra_signer: Option<&Keypair>) -> VersionedTransaction {
        let mut ixs = vec![system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1)];
        if let Some(extra) = extra_signer {
            ixs.push(system_instruction::transfer(&extra.pubkey(), &Pubkey::new_unique(), 1));
        }
        let msg = MessageV0::try_compile(&payer.pubkey(), &ixs, &[], Hash::new_unique()).unwrap();
        let mut signers = vec![payer];
        if let Some(extra) = extra_signer {
            signers.push(extra);
        }
        VersionedTransaction::try_new(VersionedMessage::V0(msg), signers.as_slice()).unwrap()
    }

    #[test]
    fn test_required_signers_from_header() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let signed = SignedTransaction::new(transfer_tx(&payer, Some(&other)), TxRole::Primary);

        assert_eq!(signed.required_signers.len(), 2);
        assert_eq!(signed.fee_payer(), Some(payer.pubkey()));
        assert!(signed.required_signers.contains(&other.pubkey()));
        assert!(signed.is_fully_signed());
        assert_eq!(signed.signature(), signed.tx.signatures[0]);
    }

    #[test]
    fn test_size_check_passes_small_tx() {
        let payer = Keypair::new();
        let signed = SignedTransaction::new(transfer_tx(&payer, None), TxRole::Secondary { index: 0 });
        let size = signed.check_size().unwrap();
        assert!(size < MAX_TRANSACTION_SIZE);
        assert!(!signed.serialize_base64().unwrap().is_empty());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(TxRole::Primary.to_string(), "primary");
        assert_eq!(TxRole::Secondary { index: 2 }.to_string(), "secondary[2]");
    }
}
