//! Bonding-curve pricing engine
//!
//! Pure, deterministic functions over decoded snapshots. The global
//! configuration is always passed in explicitly, never read from ambient
//! state, so every function here can be tested without a ledger.
//!
//! ## Rounding
//!
//! All products are computed in `u128` and floored. Slippage bounds are
//! rounded in the direction that protects the caller's counterparty:
//! the maximum spend of a buy rounds up relative to the exact tolerance
//! (`amount + floor(amount * bps / 10_000)`), the minimum receive of a sell
//! rounds down (`amount - floor(amount * bps / 10_000)`). With these
//! directions selling tokens and immediately buying back with the proceeds
//! never yields more tokens than were sold.

use crate::curve::accounts::{BondingCurveRecord, GlobalConfigRecord, MAX_BASIS_POINTS};
use crate::errors::{ArithmeticKind, EngineError};
use serde::{Deserialize, Serialize};

/// Slippage tolerance used when the caller supplies none (5%)
pub const DEFAULT_SLIPPAGE_BPS: u64 = 500;

/// Result of pricing one trade
///
/// `bounded_amount` is the worst case the caller accepts: the maximum SOL
/// spend for a buy, the minimum SOL receive for a sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub input_amount: u64,
    pub output_amount: u64,
    pub fee_amount: u64,
    pub bounded_amount: u64,
}

fn narrow(value: u128) -> Result<u64, EngineError> {
    u64::try_from(value).map_err(|_| EngineError::overflow())
}

/// `floor(reserve_out * amount_in / (reserve_in + amount_in))`
fn constant_product_out(reserve_out: u64, reserve_in: u64, amount_in: u64) -> Result<u64, EngineError> {
    let denominator = reserve_in as u128 + amount_in as u128;
    if denominator == 0 {
        return Err(EngineError::Arithmetic(ArithmeticKind::DivisionByZero));
    }
    narrow(reserve_out as u128 * amount_in as u128 / denominator)
}

fn basis_points_of(amount: u64, basis_points: u64) -> u64 {
    // bps <= 10_000 keeps the result <= amount
    (amount as u128 * basis_points as u128 / MAX_BASIS_POINTS as u128) as u64
}

fn check_basis_points(basis_points: u64) -> Result<(), EngineError> {
    if basis_points > MAX_BASIS_POINTS {
        return Err(EngineError::validation(format!(
            "slippage of {} bps exceeds {}",
            basis_points, MAX_BASIS_POINTS
        )));
    }
    Ok(())
}

/// Tokens received for the very first buy of a market that does not exist yet
pub fn quote_initial_buy(config: &GlobalConfigRecord, sol_in: u64) -> Result<u64, EngineError> {
    let tokens = constant_product_out(
        config.initial_virtual_token_reserves,
        config.initial_virtual_sol_reserves,
        sol_in,
    )?;
    Ok(tokens.min(config.initial_real_token_reserves))
}

/// Tokens received for `sol_in` lamports against a live curve
pub fn quote_buy(curve: &BondingCurveRecord, sol_in: u64) -> Result<u64, EngineError> {
    if curve.complete {
        return Err(EngineError::completed());
    }
    let tokens = constant_product_out(curve.virtual_token_reserves, curve.virtual_sol_reserves, sol_in)?;
    Ok(tokens.min(curve.real_token_reserves))
}

/// Lamports received for selling `tokens_in`, net of the protocol fee
pub fn quote_sell(
    curve: &BondingCurveRecord,
    config: &GlobalConfigRecord,
    tokens_in: u64,
) -> Result<u64, EngineError> {
    if curve.complete {
        return Err(EngineError::completed());
    }
    let gross = constant_product_out(curve.virtual_sol_reserves, curve.virtual_token_reserves, tokens_in)?;
    let fee = basis_points_of(gross, config.fee_basis_points);
    gross.checked_sub(fee).ok_or_else(EngineError::underflow)
}

/// Maximum spend a buyer accepts: `amount + floor(amount * bps / 10_000)`
pub fn apply_buy_slippage(amount: u64, basis_points: u64) -> Result<u64, EngineError> {
    check_basis_points(basis_points)?;
    amount
        .checked_add(basis_points_of(amount, basis_points))
        .ok_or_else(EngineError::overflow)
}

/// Minimum receive a seller accepts: `amount - floor(amount * bps / 10_000)`
pub fn apply_sell_slippage(amount: u64, basis_points: u64) -> Result<u64, EngineError> {
    check_basis_points(basis_points)?;
    amount
        .checked_sub(basis_points_of(amount, basis_points))
        .ok_or_else(EngineError::underflow)
}

/// Full quote for spending `sol_in` on a live curve
pub fn buy_quote(
    curve: &BondingCurveRecord,
    config: &GlobalConfigRecord,
    sol_in: u64,
    slippage_bps: u64,
) -> Result<PriceQuote, EngineError> {
    let tokens = quote_buy(curve, sol_in)?;
    Ok(PriceQuote {
        input_amount: sol_in,
        output_amount: tokens,
        fee_amount: basis_points_of(sol_in, config.fee_basis_points),
        bounded_amount: apply_buy_slippage(sol_in, slippage_bps)?,
    })
}

/// Full quote for selling `tokens_in` on a live curve
pub fn sell_quote(
    curve: &BondingCurveRecord,
    config: &GlobalConfigRecord,
    tokens_in: u64,
    slippage_bps: u64,
) -> Result<PriceQuote, EngineError> {
    if curve.complete {
        return Err(EngineError::completed());
    }
    let gross = constant_product_out(curve.virtual_sol_reserves, curve.virtual_token_reserves, tokens_in)?;
    let fee = basis_points_of(gross, config.fee_basis_points);
    let net = gross.checked_sub(fee).ok_or_else(EngineError::underflow)?;
    Ok(PriceQuote {
        input_amount: tokens_in,
        output_amount: net,
        fee_amount: fee,
        bounded_amount: apply_sell_slippage(net, slippage_bps)?,
    })
}

/// Market capitalisation in lamports at the current virtual price
pub fn market_cap_sol(curve: &BondingCurveRecord) -> Result<u64, EngineError> {
    if curve.virtual_token_reserves == 0 {
        return Err(EngineError::Arithmetic(ArithmeticKind::DivisionByZero));
    }
    narrow(
        curve.virtual_sol_reserves as u128 * curve.token_total_supply as u128
            / curve.virtual_token_reserves as u128,
    )
}

impl BondingCurveRecord {
    /// Curve state of a market right after creation, before any trade
    pub fn initial(config: &GlobalConfigRecord) -> Self {
        Self {
            virtual_token_reserves: config.initial_virtual_token_reserves,
            virtual_sol_reserves: config.initial_virtual_sol_reserves,
            real_token_reserves: config.initial_real_token_reserves,
            real_sol_reserves: 0,
            token_total_supply: config.token_total_supply,
            complete: false,
        }
    }

    /// Projected state after a buy of `tokens` for `sol_in` lamports lands
    pub fn after_buy(&self, sol_in: u64, tokens: u64) -> Result<Self, EngineError> {
        Ok(Self {
            virtual_token_reserves: self
                .virtual_token_reserves
                .checked_sub(tokens)
                .ok_or_else(EngineError::underflow)?,
            virtual_sol_reserves: self
                .virtual_sol_reserves
                .checked_add(sol_in)
                .ok_or_else(EngineError::overflow)?,
            real_token_reserves: self
                .real_token_reserves
                .checked_sub(tokens)
                .ok_or_else(EngineError::underflow)?,
            real_sol_reserves: self
                .real_sol_reserves
                .checked_add(sol_in)
                .ok_or_else(EngineError::overflow)?,
            ..*self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InvalidStateKind;
    use solana_sdk::pubkey::Pubkey;

    const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

    fn config(fee_basis_points: u64) -> GlobalConfigRecord {
        GlobalConfigRecord {
            initialized: true,
            authority: Pubkey::new_unique(),
            fee_recipient: Pubkey::new_unique(),
            initial_virtual_token_reserves: 1_073_000_000_000_000,
            initial_virtual_sol_reserves: 30 * LAMPORTS_PER_SOL,
            initial_real_token_reserves: 793_100_000_000_000,
            token_total_supply: 1_000_000_000_000_000,
            fee_basis_points,
        }
    }

    #[test]
    fn test_quote_initial_buy_one_sol() {
        // 1.073e15 * 1e9 / 31e9
        let tokens = quote_initial_buy(&config(100), LAMPORTS_PER_SOL).unwrap();
        assert_eq!(tokens, 34_612_903_225_806);
    }

    #[test]
    fn test_initial_buy_matches_buy_on_initial_curve() {
        let cfg = config(100);
        let curve = BondingCurveRecord::initial(&cfg);
        for sol in [1, 1_000, LAMPORTS_PER_SOL, 7 * LAMPORTS_PER_SOL] {
            assert_eq!(quote_initial_buy(&cfg, sol).unwrap(), quote_buy(&curve, sol).unwrap());
        }
    }

    #[test]
    fn test_quote_buy_capped_by_real_reserves() {
        let mut curve = BondingCurveRecord::initial(&config(100));
        curve.real_token_reserves = 10;
        assert_eq!(quote_buy(&curve, LAMPORTS_PER_SOL).unwrap(), 10);
    }

    #[test]
    fn test_quote_on_completed_curve() {
        let mut curve = BondingCurveRecord::initial(&config(100));
        curve.complete = true;
        assert_eq!(
            quote_buy(&curve, 1).unwrap_err(),
            EngineError::InvalidState(InvalidStateKind::Completed)
        );
        assert_eq!(
            quote_sell(&curve, &config(100), 1).unwrap_err(),
            EngineError::InvalidState(InvalidStateKind::Completed)
        );
    }

    #[test]
    fn test_quote_sell_subtracts_fee() {
        let cfg = config(100);
        let curve = BondingCurveRecord::initial(&cfg);
        let tokens = 34_612_903_225_806;
        let gross = (curve.virtual_sol_reserves as u128 * tokens as u128
            / (curve.virtual_token_reserves as u128 + tokens as u128)) as u64;
        let net = quote_sell(&curve, &cfg, tokens).unwrap();
        assert_eq!(net, gross - gross / 100);

        let free = quote_sell(&curve, &config(0), tokens).unwrap();
        assert_eq!(free, gross);
    }

    #[test]
    fn test_degenerate_reserves() {
        let mut curve = BondingCurveRecord::initial(&config(100));
        curve.virtual_sol_reserves = 0;
        assert_eq!(
            quote_buy(&curve, 0).unwrap_err(),
            EngineError::Arithmetic(ArithmeticKind::DivisionByZero)
        );
    }

    #[test]
    fn test_slippage_identity_and_direction() {
        assert_eq!(apply_buy_slippage(12_345, 0).unwrap(), 12_345);
        assert_eq!(apply_sell_slippage(12_345, 0).unwrap(), 12_345);

        // 5% of 12_345 = 617.25 -> 617
        assert_eq!(apply_buy_slippage(12_345, DEFAULT_SLIPPAGE_BPS).unwrap(), 12_962);
        assert_eq!(apply_sell_slippage(12_345, DEFAULT_SLIPPAGE_BPS).unwrap(), 11_728);

        assert_eq!(apply_sell_slippage(12_345, 10_000).unwrap(), 0);
        assert!(matches!(
            apply_buy_slippage(1, 10_001).unwrap_err(),
            EngineError::Validation(_)
        ));
    }

    #[test]
    fn test_buy_slippage_overflow() {
        assert_eq!(
            apply_buy_slippage(u64::MAX, 1).unwrap_err(),
            EngineError::Arithmetic(ArithmeticKind::Overflow)
        );
    }

    #[test]
    fn test_buy_quote_fields() {
        let cfg = config(100);
        let curve = BondingCurveRecord::initial(&cfg);
        let quote = buy_quote(&curve, &cfg, LAMPORTS_PER_SOL, 500).unwrap();
        assert_eq!(quote.input_amount, LAMPORTS_PER_SOL);
        assert_eq!(quote.output_amount, 34_612_903_225_806);
        assert_eq!(quote.fee_amount, LAMPORTS_PER_SOL / 100);
        assert_eq!(quote.bounded_amount, 1_050_000_000);
    }

    #[test]
    fn test_sell_quote_bounded_below_output() {
        let cfg = config(100);
        let curve = BondingCurveRecord::initial(&cfg);
        let quote = sell_quote(&curve, &cfg, 1_000_000_000_000, 500).unwrap();
        assert!(quote.bounded_amount < quote.output_amount);
        assert_eq!(quote.output_amount + quote.fee_amount, {
            (curve.virtual_sol_reserves as u128 * 1_000_000_000_000u128
                / (curve.virtual_token_reserves as u128 + 1_000_000_000_000u128)) as u64
        });
    }

    #[test]
    fn test_after_buy_advances_reserves() {
        let cfg = config(100);
        let curve = BondingCurveRecord::initial(&cfg);
        let tokens = quote_buy(&curve, LAMPORTS_PER_SOL).unwrap();
        let next = curve.after_buy(LAMPORTS_PER_SOL, tokens).unwrap();
        assert_eq!(next.virtual_sol_reserves, 31 * LAMPORTS_PER_SOL);
        assert_eq!(next.virtual_token_reserves, curve.virtual_token_reserves - tokens);
        assert_eq!(next.real_sol_reserves, LAMPORTS_PER_SOL);

        // Price moves against later buyers
        let second = quote_buy(&next, LAMPORTS_PER_SOL).unwrap();
        assert!(second < tokens);
    }

    #[test]
    fn test_market_cap() {
        let cfg = config(100);
        let curve = BondingCurveRecord::initial(&cfg);
        // 30 SOL * 1e15 / 1.073e15
        assert_eq!(market_cap_sol(&curve).unwrap(), 27_958_993_476);
    }
}
