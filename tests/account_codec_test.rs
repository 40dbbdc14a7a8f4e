//! Account and event decoding against the program's published layout

use pump_bundler::curve::accounts::{BONDING_CURVE_DISCRIMINATOR, GLOBAL_DISCRIMINATOR};
use pump_bundler::curve::events::{
    decode_log_line, events_from_logs, EventKind, PumpEvent, CREATE_EVENT_DISCRIMINATOR,
};
use pump_bundler::curve::{decode_bonding_curve, decode_global_config, BondingCurveRecord, GlobalConfigRecord};
use pump_bundler::errors::{DecodeErrorKind, EngineError};
use pump_bundler::tx_builder::instructions::{BUY_DISCRIMINATOR, CREATE_DISCRIMINATOR, SELL_DISCRIMINATOR};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

fn anchor_discriminator(preimage: &str) -> [u8; 8] {
    let hash = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

fn curve_bytes(values: [u64; 5], complete: u8) -> Vec<u8> {
    let mut data = BONDING_CURVE_DISCRIMINATOR.to_vec();
    for value in values {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.push(complete);
    data
}

fn global_bytes(fee_basis_points: u64) -> (Vec<u8>, Pubkey, Pubkey) {
    let authority = Pubkey::new_unique();
    let fee_recipient = Pubkey::new_unique();
    let mut data = GLOBAL_DISCRIMINATOR.to_vec();
    data.push(1);
    data.extend_from_slice(authority.as_ref());
    data.extend_from_slice(fee_recipient.as_ref());
    for value in [
        1_073_000_000_000_000u64,
        30_000_000_000,
        793_100_000_000_000,
        1_000_000_000_000_000,
        fee_basis_points,
    ] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    (data, authority, fee_recipient)
}

fn is_malformed_account(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::Decode {
            kind: DecodeErrorKind::MalformedAccount,
            ..
        }
    )
}

#[test]
fn test_discriminators_match_anchor_hashes() {
    assert_eq!(BONDING_CURVE_DISCRIMINATOR, anchor_discriminator("account:BondingCurve"));
    assert_eq!(GLOBAL_DISCRIMINATOR, anchor_discriminator("account:Global"));
    assert_eq!(CREATE_DISCRIMINATOR, anchor_discriminator("global:create"));
    assert_eq!(BUY_DISCRIMINATOR, anchor_discriminator("global:buy"));
    assert_eq!(SELL_DISCRIMINATOR, anchor_discriminator("global:sell"));

    for (kind, name) in [
        (EventKind::Create, "CreateEvent"),
        (EventKind::Trade, "TradeEvent"),
        (EventKind::Complete, "CompleteEvent"),
        (EventKind::SetParams, "SetParamsEvent"),
    ] {
        assert_eq!(kind.discriminator(), anchor_discriminator(&format!("event:{}", name)));
    }
}

#[test]
fn test_decode_bonding_curve() {
    let data = curve_bytes(
        [1_000_000_000_000_000, 32_000_000_000, 700_000_000_000_000, 2_000_000_000, 1_000_000_000_000_000],
        0,
    );
    let curve = decode_bonding_curve(&data).unwrap();
    assert_eq!(
        curve,
        BondingCurveRecord {
            virtual_token_reserves: 1_000_000_000_000_000,
            virtual_sol_reserves: 32_000_000_000,
            real_token_reserves: 700_000_000_000_000,
            real_sol_reserves: 2_000_000_000,
            token_total_supply: 1_000_000_000_000_000,
            complete: false,
        }
    );
}

#[test]
fn test_over_allocated_account_decodes() {
    let mut data = curve_bytes([1, 2, 3, 4, 5], 1);
    data.extend_from_slice(&[0u8; 32]);
    assert!(decode_bonding_curve(&data).unwrap().complete);
}

#[test]
fn test_every_truncation_is_malformed() {
    let data = curve_bytes([1, 2, 3, 4, 5], 0);
    for len in 0..data.len() {
        let err = decode_bonding_curve(&data[..len]).unwrap_err();
        assert!(is_malformed_account(&err), "length {} gave {:?}", len, err);
    }

    let (global, _, _) = global_bytes(100);
    for len in 0..global.len() {
        assert!(is_malformed_account(&decode_global_config(&global[..len]).unwrap_err()));
    }
}

#[test]
fn test_wrong_tag_and_bad_flag_are_malformed() {
    let mut wrong_tag = curve_bytes([1, 2, 3, 4, 5], 0);
    wrong_tag[0] ^= 0xff;
    assert!(is_malformed_account(&decode_bonding_curve(&wrong_tag).unwrap_err()));

    let bad_flag = curve_bytes([1, 2, 3, 4, 5], 2);
    assert!(is_malformed_account(&decode_bonding_curve(&bad_flag).unwrap_err()));

    // A global record is not a curve record
    let (global, _, _) = global_bytes(100);
    assert!(is_malformed_account(&decode_bonding_curve(&global).unwrap_err()));
}

#[test]
fn test_decode_global_config() {
    let (data, authority, fee_recipient) = global_bytes(100);
    let config = decode_global_config(&data).unwrap();
    assert_eq!(
        config,
        GlobalConfigRecord {
            initialized: true,
            authority,
            fee_recipient,
            initial_virtual_token_reserves: 1_073_000_000_000_000,
            initial_virtual_sol_reserves: 30_000_000_000,
            initial_real_token_reserves: 793_100_000_000_000,
            token_total_supply: 1_000_000_000_000_000,
            fee_basis_points: 100,
        }
    );

    let (excessive_fee, _, _) = global_bytes(10_001);
    assert!(is_malformed_account(&decode_global_config(&excessive_fee).unwrap_err()));
}

#[test]
fn test_create_event_from_log_line() {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let mint = Pubkey::new_unique();
    let bonding_curve = Pubkey::new_unique();
    let user = Pubkey::new_unique();
    let mut payload = CREATE_EVENT_DISCRIMINATOR.to_vec();
    for text in ["Bundled", "BNDL", "https://ipfs.io/ipfs/Qm"] {
        payload.extend_from_slice(&(text.len() as u32).to_le_bytes());
        payload.extend_from_slice(text.as_bytes());
    }
    payload.extend_from_slice(mint.as_ref());
    payload.extend_from_slice(bonding_curve.as_ref());
    payload.extend_from_slice(user.as_ref());

    let line = format!("Program data: {}", STANDARD.encode(&payload));
    let event = decode_log_line(&line).unwrap().unwrap();
    match &event {
        PumpEvent::Create(create) => {
            assert_eq!(create.symbol, "BNDL");
            assert_eq!(create.mint, mint);
            assert_eq!(create.user, user);
        }
        other => panic!("expected create event, got {:?}", other),
    }

    // Truncated string length prefix
    let truncated = format!("Program data: {}", STANDARD.encode(&payload[..14]));
    assert_eq!(events_from_logs(&[truncated, line]), vec![event]);
}
