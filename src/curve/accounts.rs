//! Account codec for the `BondingCurve` and `Global` records
//!
//! Both records are Anchor accounts: an 8-byte discriminator followed by
//! little-endian fixed-width fields. Decoding is total over any byte slice,
//! short or mismatched input fails with
//! [`DecodeErrorKind::MalformedAccount`](crate::errors::DecodeErrorKind::MalformedAccount)
//! and never panics. Bytes past the fixed layout are ignored because the
//! program over-allocates its accounts.

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

pub const BONDING_CURVE_DISCRIMINATOR: [u8; 8] = [23, 183, 248, 55, 96, 216, 172, 96];
pub const GLOBAL_DISCRIMINATOR: [u8; 8] = [167, 232, 232, 177, 200, 108, 114, 127];

/// Upper bound of any basis-point quantity
pub const MAX_BASIS_POINTS: u64 = 10_000;

/// Per-market curve state, an immutable snapshot of one account read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondingCurveRecord {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub token_total_supply: u64,
    /// Set once the curve migrated; trading against it is invalid afterwards
    pub complete: bool,
}

impl BondingCurveRecord {
    pub const LEN: usize = 8 + 8 * 5 + 1;
}

/// Program-wide configuration singleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfigRecord {
    pub initialized: bool,
    pub authority: Pubkey,
    pub fee_recipient: Pubkey,
    pub initial_virtual_token_reserves: u64,
    pub initial_virtual_sol_reserves: u64,
    pub initial_real_token_reserves: u64,
    pub token_total_supply: u64,
    /// Always within `0..=10_000`
    pub fee_basis_points: u64,
}

impl GlobalConfigRecord {
    pub const LEN: usize = 8 + 1 + 32 + 32 + 8 * 5;
}

/// Bounds-checked little-endian cursor over a borrowed buffer
///
/// Every read reports the field name so decode errors point at the first
/// field that did not fit.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
    record: &'static str,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8], record: &'static str) -> Self {
        Self {
            data,
            offset: 0,
            record,
        }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], EngineError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                EngineError::malformed_account(format!(
                    "{}: buffer too short for `{}` at offset {} (len {})",
                    self.record,
                    field,
                    self.offset,
                    self.data.len()
                ))
            })?;
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    pub(crate) fn discriminator(&mut self, expected: &[u8; 8]) -> Result<(), EngineError> {
        let tag = self.take(8, "discriminator")?;
        if tag != expected {
            return Err(EngineError::malformed_account(format!(
                "{}: discriminator mismatch",
                self.record
            )));
        }
        Ok(())
    }

    pub(crate) fn u64(&mut self, field: &str) -> Result<u64, EngineError> {
        let bytes = self.take(8, field)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    pub(crate) fn i64(&mut self, field: &str) -> Result<i64, EngineError> {
        self.u64(field).map(|v| v as i64)
    }

    pub(crate) fn bool(&mut self, field: &str) -> Result<bool, EngineError> {
        match self.take(1, field)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(EngineError::malformed_account(format!(
                "{}: `{}` is not a boolean byte ({})",
                self.record, field, other
            ))),
        }
    }

    pub(crate) fn pubkey(&mut self, field: &str) -> Result<Pubkey, EngineError> {
        let bytes = self.take(32, field)?;
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        Ok(Pubkey::new_from_array(buf))
    }

    /// Borsh string: u32 length prefix followed by UTF-8 bytes
    pub(crate) fn string(&mut self, field: &str) -> Result<String, EngineError> {
        let raw_len = self.take(4, field)?;
        let len = u32::from_le_bytes([raw_len[0], raw_len[1], raw_len[2], raw_len[3]]) as usize;
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            EngineError::malformed_account(format!("{}: `{}` is not UTF-8", self.record, field))
        })
    }
}

/// Decode a `BondingCurve` account
pub fn decode_bonding_curve(data: &[u8]) -> Result<BondingCurveRecord, EngineError> {
    let mut reader = ByteReader::new(data, "BondingCurve");
    reader.discriminator(&BONDING_CURVE_DISCRIMINATOR)?;

    Ok(BondingCurveRecord {
        virtual_token_reserves: reader.u64("virtual_token_reserves")?,
        virtual_sol_reserves: reader.u64("virtual_sol_reserves")?,
        real_token_reserves: reader.u64("real_token_reserves")?,
        real_sol_reserves: reader.u64("real_sol_reserves")?,
        token_total_supply: reader.u64("token_total_supply")?,
        complete: reader.bool("complete")?,
    })
}

/// Decode the `Global` account
pub fn decode_global_config(data: &[u8]) -> Result<GlobalConfigRecord, EngineError> {
    let mut reader = ByteReader::new(data, "Global");
    reader.discriminator(&GLOBAL_DISCRIMINATOR)?;

    let record = GlobalConfigRecord {
        initialized: reader.bool("initialized")?,
        authority: reader.pubkey("authority")?,
        fee_recipient: reader.pubkey("fee_recipient")?,
        initial_virtual_token_reserves: reader.u64("initial_virtual_token_reserves")?,
        initial_virtual_sol_reserves: reader.u64("initial_virtual_sol_reserves")?,
        initial_real_token_reserves: reader.u64("initial_real_token_reserves")?,
        token_total_supply: reader.u64("token_total_supply")?,
        fee_basis_points: reader.u64("fee_basis_points")?,
    };

    if record.fee_basis_points > MAX_BASIS_POINTS {
        return Err(EngineError::malformed_account(format!(
            "Global: fee_basis_points {} exceeds {}",
            record.fee_basis_points, MAX_BASIS_POINTS
        )));
    }

    Ok(record)
}

#[cfg(any(test, feature = "test_utils"))]
impl BondingCurveRecord {
    /// Serialize back into account bytes, for fixtures
    pub fn to_account_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::LEN);
        data.extend_from_slice(&BONDING_CURVE_DISCRIMINATOR);
        for v in [
            self.virtual_token_reserves,
            self.virtual_sol_reserves,
            self.real_token_reserves,
            self.real_sol_reserves,
            self.token_total_supply,
        ] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.push(self.complete as u8);
        data
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl GlobalConfigRecord {
    /// Serialize back into account bytes, for fixtures
    pub fn to_account_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::LEN);
        data.extend_from_slice(&GLOBAL_DISCRIMINATOR);
        data.push(self.initialized as u8);
        data.extend_from_slice(self.authority.as_ref());
        data.extend_from_slice(self.fee_recipient.as_ref());
        for v in [
            self.initial_virtual_token_reserves,
            self.initial_virtual_sol_reserves,
            self.initial_real_token_reserves,
            self.token_total_supply,
            self.fee_basis_points,
        ] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DecodeErrorKind;

    fn sample_curve() -> BondingCurveRecord {
        BondingCurveRecord {
            virtual_token_reserves: 1_073_000_000_000_000,
            virtual_sol_reserves: 30_000_000_000,
            real_token_reserves: 793_100_000_000_000,
            real_sol_reserves: 0,
            token_total_supply: 1_000_000_000_000_000,
            complete: false,
        }
    }

    fn is_malformed(err: &EngineError) -> bool {
        matches!(
            err,
            EngineError::Decode {
                kind: DecodeErrorKind::MalformedAccount,
                ..
            }
        )
    }

    #[test]
    fn test_decode_bonding_curve() {
        let curve = sample_curve();
        let decoded = decode_bonding_curve(&curve.to_account_bytes()).unwrap();
        assert_eq!(decoded, curve);
    }

    #[test]
    fn test_decode_bonding_curve_ignores_trailing_bytes() {
        let mut data = sample_curve().to_account_bytes();
        data.extend_from_slice(&[0xAA; 32]);
        assert_eq!(decode_bonding_curve(&data).unwrap(), sample_curve());
    }

    #[test]
    fn test_every_truncation_is_malformed() {
        let data = sample_curve().to_account_bytes();
        for len in 0..data.len() {
            let err = decode_bonding_curve(&data[..len]).unwrap_err();
            assert!(is_malformed(&err), "len {} gave {:?}", len, err);
        }
    }

    #[test]
    fn test_discriminator_mismatch() {
        let mut data = sample_curve().to_account_bytes();
        data[0] ^= 0xFF;
        assert!(is_malformed(&decode_bonding_curve(&data).unwrap_err()));

        // A Global record is not a curve even when long enough
        let global = GlobalConfigRecord {
            initialized: true,
            authority: Pubkey::new_unique(),
            fee_recipient: Pubkey::new_unique(),
            initial_virtual_token_reserves: 1,
            initial_virtual_sol_reserves: 1,
            initial_real_token_reserves: 1,
            token_total_supply: 1,
            fee_basis_points: 100,
        };
        assert!(is_malformed(&decode_bonding_curve(&global.to_account_bytes()).unwrap_err()));
    }

    #[test]
    fn test_invalid_bool_byte() {
        let mut data = sample_curve().to_account_bytes();
        let last = data.len() - 1;
        data[last] = 2;
        assert!(is_malformed(&decode_bonding_curve(&data).unwrap_err()));
    }

    #[test]
    fn test_decode_global_config() {
        let global = GlobalConfigRecord {
            initialized: true,
            authority: Pubkey::new_unique(),
            fee_recipient: Pubkey::new_unique(),
            initial_virtual_token_reserves: 1_073_000_000_000_000,
            initial_virtual_sol_reserves: 30_000_000_000,
            initial_real_token_reserves: 793_100_000_000_000,
            token_total_supply: 1_000_000_000_000_000,
            fee_basis_points: 100,
        };
        let data = global.to_account_bytes();
        assert_eq!(data.len(), GlobalConfigRecord::LEN);
        assert_eq!(decode_global_config(&data).unwrap(), global);
    }

    #[test]
    fn test_global_fee_out_of_range() {
        let global = GlobalConfigRecord {
            initialized: true,
            authority: Pubkey::new_unique(),
            fee_recipient: Pubkey::new_unique(),
            initial_virtual_token_reserves: 1,
            initial_virtual_sol_reserves: 1,
            initial_real_token_reserves: 1,
            token_total_supply: 1,
            fee_basis_points: 10_001,
        };
        assert!(is_malformed(&decode_global_config(&global.to_account_bytes()).unwrap_err()));
    }

    #[test]
    fn test_reader_string() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(b"hello");
        let mut reader = ByteReader::new(&data, "test");
        assert_eq!(reader.string("s").unwrap(), "hello");

        // Declared length past the end of the buffer
        let mut data = Vec::new();
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        let mut reader = ByteReader::new(&data, "test");
        assert!(reader.string("s").is_err());
    }
}
