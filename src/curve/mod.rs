//! On-chain model of the bonding-curve program
//!
//! - **accounts**: fixed-layout decoding of the `BondingCurve` and `Global` records
//! - **pricing**: pure constant-product quoting over decoded snapshots
//! - **events**: typed decoding of the four events the program emits
//!
//! Addresses are derived here so that every instruction and lookup agrees on
//! the same seeds.

pub mod accounts;
pub mod events;
pub mod pricing;

pub use accounts::{decode_bonding_curve, decode_global_config, BondingCurveRecord, GlobalConfigRecord};
pub use events::{EventKind, PumpEvent};
pub use pricing::{
    apply_buy_slippage, apply_sell_slippage, buy_quote, quote_buy, quote_initial_buy, quote_sell,
    sell_quote, PriceQuote, DEFAULT_SLIPPAGE_BPS,
};

use solana_sdk::{pubkey, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;

/// Bonding-curve program
pub const PUMP_PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");

/// Metaplex token metadata program, owner of the metadata PDA created with each market
pub const MPL_TOKEN_METADATA_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Anchor event-CPI authority of the program (`["__event_authority"]`)
pub const EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");

pub const GLOBAL_SEED: &[u8] = b"global";
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint-authority";
pub const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";
pub const METADATA_SEED: &[u8] = b"metadata";

/// Mints created by the program always use 6 decimals
pub const TOKEN_DECIMALS: u8 = 6;

pub fn global_pda() -> Pubkey {
    Pubkey::find_program_address(&[GLOBAL_SEED], &PUMP_PROGRAM_ID).0
}

pub fn mint_authority_pda() -> Pubkey {
    Pubkey::find_program_address(&[MINT_AUTHORITY_SEED], &PUMP_PROGRAM_ID).0
}

pub fn bonding_curve_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[BONDING_CURVE_SEED, mint.as_ref()], &PUMP_PROGRAM_ID).0
}

pub fn metadata_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_SEED, MPL_TOKEN_METADATA_ID.as_ref(), mint.as_ref()],
        &MPL_TOKEN_METADATA_ID,
    )
    .0
}

/// Token account of the bonding curve that holds the unsold supply
pub fn associated_bonding_curve(mint: &Pubkey) -> Pubkey {
    get_associated_token_address(&bonding_curve_pda(mint), mint)
}
