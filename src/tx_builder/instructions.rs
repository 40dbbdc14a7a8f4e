//! Instruction building and ordering
//!
//! Builds the program instructions for market creation, buy and sell, plus
//! the surrounding instructions every transaction of a batch may carry:
//!
//! 1. Compute budget instructions (CU limit, priority fee)
//! 2. Relay tip transfer (when routed through the relay)
//! 3. Program instructions, each buy optionally preceded by the creation of
//!    the buyer's holding account
//!
//! Amounts come from a [`PriceQuote`]: a buy carries the exact token amount
//! (`output_amount`) and the maximum spend (`bounded_amount`), a sell carries
//! the exact token amount (`input_amount`) and the minimum receive
//! (`bounded_amount`).

use crate::curve::{
    associated_bonding_curve, bonding_curve_pda, global_pda, metadata_pda, mint_authority_pda,
    PriceQuote, EVENT_AUTHORITY, MPL_TOKEN_METADATA_ID, PUMP_PROGRAM_ID,
};
use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction, system_program, sysvar,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};

pub const CREATE_DISCRIMINATOR: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];
pub const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
pub const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];

// Metaplex metadata limits
const MAX_NAME_LEN: usize = 32;
const MAX_SYMBOL_LEN: usize = 10;
const MAX_URI_LEN: usize = 200;

/// Name, symbol and metadata reference of a new market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

impl TokenMetadata {
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, value, max) in [
            ("name", &self.name, MAX_NAME_LEN),
            ("symbol", &self.symbol, MAX_SYMBOL_LEN),
            ("uri", &self.uri, MAX_URI_LEN),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::validation(format!("token {} is empty", field)));
            }
            if value.len() > max {
                return Err(EngineError::validation(format!(
                    "token {} is {} bytes, limit is {}",
                    field,
                    value.len(),
                    max
                )));
            }
        }
        Ok(())
    }
}

/// Compute budget attached to every transaction of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriorityFee {
    /// 0 = leave the limit to the runtime
    pub unit_limit: u32,
    /// Micro-lamports per compute unit, 0 = no priority fee
    pub unit_price: u64,
}

pub fn compute_budget_instructions(fee: Option<&PriorityFee>) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(2);
    if let Some(fee) = fee {
        if fee.unit_limit > 0 {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(fee.unit_limit));
        }
        if fee.unit_price > 0 {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_price(fee.unit_price));
        }
    }
    instructions
}

/// Lamport transfer to a relay tip account
pub fn tip_instruction(payer: &Pubkey, tip_account: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::transfer(payer, tip_account, lamports)
}

fn push_borsh_string(data: &mut Vec<u8>, value: &str) {
    data.extend_from_slice(&(value.len() as u32).to_le_bytes());
    data.extend_from_slice(value.as_bytes());
}

/// Market initialization for `mint`, created and signed by `creator`
///
/// The mint keypair must sign the transaction alongside the creator.
pub fn create_instruction(
    mint: &Pubkey,
    creator: &Pubkey,
    metadata: &TokenMetadata,
) -> Result<Instruction, EngineError> {
    metadata.validate()?;

    let mut data = Vec::with_capacity(
        8 + 12 + metadata.name.len() + metadata.symbol.len() + metadata.uri.len(),
    );
    data.extend_from_slice(&CREATE_DISCRIMINATOR);
    push_borsh_string(&mut data, &metadata.name);
    push_borsh_string(&mut data, &metadata.symbol);
    push_borsh_string(&mut data, &metadata.uri);

    Ok(Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*mint, true),
            AccountMeta::new_readonly(mint_authority_pda(), false),
            AccountMeta::new(bonding_curve_pda(mint), false),
            AccountMeta::new(associated_bonding_curve(mint), false),
            AccountMeta::new_readonly(global_pda(), false),
            AccountMeta::new_readonly(MPL_TOKEN_METADATA_ID, false),
            AccountMeta::new(metadata_pda(mint), false),
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_PROGRAM_ID, false),
        ],
        data,
    })
}

fn amount_data(discriminator: &[u8; 8], amount: u64, bound: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(discriminator);
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&bound.to_le_bytes());
    data
}

/// `buy(amount, max_sol_cost)` for `buyer` on `mint`
pub fn buy_instruction(buyer: &Pubkey, mint: &Pubkey, fee_recipient: &Pubkey, quote: &PriceQuote) -> Instruction {
    Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(global_pda(), false),
            AccountMeta::new(*fee_recipient, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(bonding_curve_pda(mint), false),
            AccountMeta::new(associated_bonding_curve(mint), false),
            AccountMeta::new(get_associated_token_address(buyer, mint), false),
            AccountMeta::new(*buyer, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_PROGRAM_ID, false),
        ],
        data: amount_data(&BUY_DISCRIMINATOR, quote.output_amount, quote.bounded_amount),
    }
}

/// `sell(amount, min_sol_output)` for `seller` on `mint`
pub fn sell_instruction(seller: &Pubkey, mint: &Pubkey, fee_recipient: &Pubkey, quote: &PriceQuote) -> Instruction {
    Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(global_pda(), false),
            AccountMeta::new(*fee_recipient, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(bonding_curve_pda(mint), false),
            AccountMeta::new(associated_bonding_curve(mint), false),
            AccountMeta::new(get_associated_token_address(seller, mint), false),
            AccountMeta::new(*seller, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_PROGRAM_ID, false),
        ],
        data: amount_data(&SELL_DISCRIMINATOR, quote.input_amount, quote.bounded_amount),
    }
}

/// Buy sequence for one participant
///
/// Prepends creation of the participant's holding account when the lookup
/// reported none; a missing account is never an error.
pub fn build_buy(
    buyer: &Pubkey,
    mint: &Pubkey,
    fee_recipient: &Pubkey,
    quote: &PriceQuote,
    holding_account_exists: bool,
) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(2);
    if !holding_account_exists {
        instructions.push(create_associated_token_account(buyer, buyer, mint, &spl_token::id()));
    }
    instructions.push(buy_instruction(buyer, mint, fee_recipient, quote));
    instructions
}

pub fn build_sell(seller: &Pubkey, mint: &Pubkey, fee_recipient: &Pubkey, quote: &PriceQuote) -> Vec<Instruction> {
    vec![sell_instruction(seller, mint, fee_recipient, quote)]
}

/// Check that compute budget instructions lead and nothing is empty
///
/// Compute budget instructions after a program instruction still apply on
/// chain, but a misplaced one almost always means a batch was assembled in
/// the wrong order.
pub fn sanity_check_ix_order(instructions: &[Instruction]) -> Result<(), EngineError> {
    if instructions.is_empty() {
        return Err(EngineError::validation("instruction list is empty"));
    }

    let mut seen_program_ix = false;
    for (idx, ix) in instructions.iter().enumerate() {
        if ix.program_id == compute_budget::id() {
            if seen_program_ix {
                return Err(EngineError::validation(format!(
                    "compute budget instruction at position {} follows a program instruction",
                    idx
                )));
            }
        } else {
            if ix.accounts.is_empty() {
                return Err(EngineError::validation(format!(
                    "instruction at position {} (program {}) has no accounts",
                    idx, ix.program_id
                )));
            }
            seen_program_ix = true;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(tokens: u64, sol: u64, bound: u64) -> PriceQuote {
        PriceQuote {
            input_amount: sol,
            output_amount: tokens,
            fee_amount: 0,
            bounded_amount: bound,
        }
    }

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            name: "Test Token".to_string(),
            symbol: "TEST".to_string(),
            uri: "https://ipfs.io/ipfs/QmTest".to_string(),
        }
    }

    #[test]
    fn test_compute_budget_ordering() {
        let fee = PriorityFee {
            unit_limit: 200_000,
            unit_price: 10_000,
        };
        let ixs = compute_budget_instructions(Some(&fee));
        assert_eq!(ixs.len(), 2);
        assert!(ixs.iter().all(|ix| ix.program_id == compute_budget::id()));

        assert!(compute_budget_instructions(None).is_empty());
        assert_eq!(
            compute_budget_instructions(Some(&PriorityFee {
                unit_limit: 0,
                unit_price: 5
            }))
            .len(),
            1
        );
    }

    #[test]
    fn test_buy_instruction_layout() {
        let buyer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let fee_recipient = Pubkey::new_unique();
        let ix = buy_instruction(&buyer, &mint, &fee_recipient, &quote(1_000, 50, 55));

        assert_eq!(ix.program_id, PUMP_PROGRAM_ID);
        assert_eq!(ix.accounts.len(), 12);
        assert_eq!(&ix.data[..8], &BUY_DISCRIMINATOR);
        assert_eq!(u64::from_le_bytes(ix.data[8..16].try_into().unwrap()), 1_000);
        assert_eq!(u64::from_le_bytes(ix.data[16..24].try_into().unwrap()), 55);

        assert_eq!(ix.accounts[1].pubkey, fee_recipient);
        assert!(ix.accounts[1].is_writable);
        assert_eq!(ix.accounts[5].pubkey, get_associated_token_address(&buyer, &mint));
        assert_eq!(ix.accounts[6].pubkey, buyer);
        assert!(ix.accounts[6].is_signer);
        assert_eq!(ix.accounts.iter().filter(|m| m.is_signer).count(), 1);
    }

    #[test]
    fn test_sell_instruction_layout() {
        let seller = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = sell_instruction(&seller, &mint, &Pubkey::new_unique(), &quote(0, 7_000, 6_650));

        assert_eq!(&ix.data[..8], &SELL_DISCRIMINATOR);
        assert_eq!(u64::from_le_bytes(ix.data[8..16].try_into().unwrap()), 7_000);
        assert_eq!(u64::from_le_bytes(ix.data[16..24].try_into().unwrap()), 6_650);
        assert_eq!(ix.accounts[8].pubkey, spl_associated_token_account::id());
        assert_eq!(ix.accounts[9].pubkey, spl_token::id());
    }

    #[test]
    fn test_build_buy_conditionally_creates_holding_account() {
        let buyer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let fee_recipient = Pubkey::new_unique();
        let q = quote(1, 1, 1);

        let fresh = build_buy(&buyer, &mint, &fee_recipient, &q, false);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].program_id, spl_associated_token_account::id());
        assert_eq!(fresh[1].program_id, PUMP_PROGRAM_ID);

        let existing = build_buy(&buyer, &mint, &fee_recipient, &q, true);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].program_id, PUMP_PROGRAM_ID);
    }

    #[test]
    fn test_create_instruction() {
        let mint = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let ix = create_instruction(&mint, &creator, &metadata()).unwrap();

        assert_eq!(&ix.data[..8], &CREATE_DISCRIMINATOR);
        assert_eq!(u32::from_le_bytes(ix.data[8..12].try_into().unwrap()), 10);
        assert_eq!(&ix.data[12..22], b"Test Token");
        assert_eq!(ix.accounts.len(), 14);

        let signers: Vec<Pubkey> = ix.accounts.iter().filter(|m| m.is_signer).map(|m| m.pubkey).collect();
        assert_eq!(signers, vec![mint, creator]);
        assert_eq!(ix.accounts[2].pubkey, bonding_curve_pda(&mint));
    }

    #[test]
    fn test_create_instruction_rejects_bad_metadata() {
        let mut meta = metadata();
        meta.symbol = "   ".to_string();
        assert!(matches!(
            create_instruction(&Pubkey::new_unique(), &Pubkey::new_unique(), &meta),
            Err(EngineError::Validation(_))
        ));

        let mut meta = metadata();
        meta.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(create_instruction(&Pubkey::new_unique(), &Pubkey::new_unique(), &meta).is_err());
    }

    #[test]
    fn test_sanity_check_ix_order() {
        let buyer = Pubkey::new_unique();
        let buy = buy_instruction(&buyer, &Pubkey::new_unique(), &Pubkey::new_unique(), &quote(1, 1, 1));
        let fee = PriorityFee {
            unit_limit: 100_000,
            unit_price: 1,
        };

        let mut good = compute_budget_instructions(Some(&fee));
        good.push(tip_instruction(&buyer, &Pubkey::new_unique(), 1_000));
        good.push(buy.clone());
        assert!(sanity_check_ix_order(&good).is_ok());

        let mut bad = vec![buy.clone()];
        bad.extend(compute_budget_instructions(Some(&fee)));
        assert!(sanity_check_ix_order(&bad).is_err());

        assert!(sanity_check_ix_order(&[]).is_err());

        let empty_accounts = Instruction::new_with_bytes(PUMP_PROGRAM_ID, &[1], vec![]);
        assert!(sanity_check_ix_order(&[empty_accounts]).is_err());
    }
}
