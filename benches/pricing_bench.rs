//! Benchmark for quoting and account decoding

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pump_bundler::curve::accounts::BONDING_CURVE_DISCRIMINATOR;
use pump_bundler::curve::{buy_quote, decode_bonding_curve, sell_quote, BondingCurveRecord, GlobalConfigRecord};
use solana_sdk::pubkey::Pubkey;

fn config() -> GlobalConfigRecord {
    GlobalConfigRecord {
        initialized: true,
        authority: Pubkey::new_unique(),
        fee_recipient: Pubkey::new_unique(),
        initial_virtual_token_reserves: 1_073_000_000_000_000,
        initial_virtual_sol_reserves: 30_000_000_000,
        initial_real_token_reserves: 793_100_000_000_000,
        token_total_supply: 1_000_000_000_000_000,
        fee_basis_points: 100,
    }
}

fn curve_account() -> Vec<u8> {
    let mut data = BONDING_CURVE_DISCRIMINATOR.to_vec();
    for value in [
        1_000_000_000_000_000u64,
        32_000_000_000,
        720_000_000_000_000,
        2_000_000_000,
        1_000_000_000_000_000,
    ] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.push(0);
    data
}

fn bench_quotes(c: &mut Criterion) {
    let config = config();
    let curve = BondingCurveRecord::initial(&config);
    let mut group = c.benchmark_group("quote");

    for sol in [10_000_000u64, 1_000_000_000, 50_000_000_000].iter() {
        group.bench_with_input(BenchmarkId::new("buy", sol), sol, |b, sol| {
            b.iter(|| black_box(buy_quote(black_box(&curve), &config, *sol, 500)))
        });
    }
    group.bench_function("sell", |b| {
        b.iter(|| black_box(sell_quote(black_box(&curve), &config, 1_000_000_000_000, 500)))
    });

    group.finish();
}

fn bench_projected_batch(c: &mut Criterion) {
    let config = config();

    // 16 bundled buys priced against an advancing curve
    c.bench_function("project_16_buys", |b| {
        b.iter(|| {
            let mut curve = BondingCurveRecord::initial(&config);
            for _ in 0..16 {
                if let Ok(quote) = buy_quote(&curve, &config, black_box(250_000_000), 500) {
                    if let Ok(next) = curve.after_buy(quote.input_amount, quote.output_amount) {
                        curve = next;
                    }
                }
            }
            black_box(curve)
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let data = curve_account();
    c.bench_function("decode_bonding_curve", |b| {
        b.iter(|| black_box(decode_bonding_curve(black_box(&data))))
    });
}

criterion_group!(benches, bench_quotes, bench_projected_batch, bench_decode);
criterion_main!(benches);
