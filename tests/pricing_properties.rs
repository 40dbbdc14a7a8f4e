//! Property tests for bonding-curve pricing

use proptest::prelude::*;
use pump_bundler::curve::{
    apply_buy_slippage, apply_sell_slippage, quote_buy, sell_quote, BondingCurveRecord, GlobalConfigRecord,
};
use solana_sdk::pubkey::Pubkey;

fn curve(virtual_token: u64, virtual_sol: u64) -> BondingCurveRecord {
    BondingCurveRecord {
        virtual_token_reserves: virtual_token,
        virtual_sol_reserves: virtual_sol,
        real_token_reserves: virtual_token,
        real_sol_reserves: virtual_sol,
        token_total_supply: virtual_token,
        complete: false,
    }
}

fn config(fee_basis_points: u64) -> GlobalConfigRecord {
    GlobalConfigRecord {
        initialized: true,
        authority: Pubkey::default(),
        fee_recipient: Pubkey::default(),
        initial_virtual_token_reserves: 1_073_000_000_000_000,
        initial_virtual_sol_reserves: 30_000_000_000,
        initial_real_token_reserves: 793_100_000_000_000,
        token_total_supply: 1_000_000_000_000_000,
        fee_basis_points,
    }
}

proptest! {
    #[test]
    fn buy_never_drains_reserve(
        virtual_token in 1_000_000u64..10_000_000_000_000_000,
        virtual_sol in 1_000u64..1_000_000_000_000,
        sol_in in 1u64..1_000_000_000_000,
    ) {
        let tokens = quote_buy(&curve(virtual_token, virtual_sol), sol_in).unwrap();
        prop_assert!(tokens < virtual_token);
    }

    #[test]
    fn buy_is_monotonic_in_sol(
        virtual_token in 1_000_000u64..10_000_000_000_000_000,
        virtual_sol in 1_000u64..1_000_000_000_000,
        sol_in in 1u64..1_000_000_000_000,
        extra in 1u64..1_000_000_000,
    ) {
        let curve = curve(virtual_token, virtual_sol);
        let smaller = quote_buy(&curve, sol_in).unwrap();
        let larger = quote_buy(&curve, sol_in + extra).unwrap();
        prop_assert!(larger >= smaller);
    }

    #[test]
    fn zero_slippage_is_identity(amount in any::<u64>()) {
        prop_assert_eq!(apply_buy_slippage(amount, 0).unwrap(), amount);
        prop_assert_eq!(apply_sell_slippage(amount, 0).unwrap(), amount);
    }

    #[test]
    fn slippage_bounds_bracket_amount(amount in 0u64..u64::MAX / 2, bps in 0u64..=10_000) {
        prop_assert!(apply_buy_slippage(amount, bps).unwrap() >= amount);
        prop_assert!(apply_sell_slippage(amount, bps).unwrap() <= amount);
    }

    #[test]
    fn sell_then_buy_is_not_profitable(
        virtual_token in 1_000_000u64..10_000_000_000_000_000,
        virtual_sol in 1_000u64..1_000_000_000_000,
        tokens_in in 1u64..1_000_000_000_000_000,
        fee in 0u64..=10_000,
    ) {
        let before = curve(virtual_token, virtual_sol);
        let quote = sell_quote(&before, &config(fee), tokens_in, 0).unwrap();
        let gross = quote.output_amount + quote.fee_amount;

        // State right after the sell lands
        let after = curve(virtual_token + tokens_in, virtual_sol - gross);
        let bought_back = quote_buy(&after, quote.output_amount).unwrap();
        prop_assert!(bought_back <= tokens_in);
    }
}
