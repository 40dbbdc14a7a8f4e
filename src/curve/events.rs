//! Typed decoding of program events
//!
//! The program emits events as `Program data: <base64>` log lines whose
//! payload starts with an 8-byte event discriminator. [`PumpEvent`] is a
//! closed union: the discriminator selects an [`EventKind`], and an exhaustive
//! match over the kind picks the one decoder for that variant.

use crate::curve::accounts::ByteReader;
use crate::errors::EngineError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

pub const CREATE_EVENT_DISCRIMINATOR: [u8; 8] = [27, 114, 169, 77, 222, 235, 99, 118];
pub const TRADE_EVENT_DISCRIMINATOR: [u8; 8] = [189, 219, 127, 211, 78, 230, 97, 238];
pub const COMPLETE_EVENT_DISCRIMINATOR: [u8; 8] = [95, 114, 97, 156, 212, 46, 152, 8];
pub const SET_PARAMS_EVENT_DISCRIMINATOR: [u8; 8] = [223, 195, 159, 246, 62, 48, 143, 131];

pub const PROGRAM_DATA_PREFIX: &str = "Program data: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Create,
    Trade,
    Complete,
    SetParams,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Create,
        EventKind::Trade,
        EventKind::Complete,
        EventKind::SetParams,
    ];

    pub fn discriminator(self) -> [u8; 8] {
        match self {
            EventKind::Create => CREATE_EVENT_DISCRIMINATOR,
            EventKind::Trade => TRADE_EVENT_DISCRIMINATOR,
            EventKind::Complete => COMPLETE_EVENT_DISCRIMINATOR,
            EventKind::SetParams => SET_PARAMS_EVENT_DISCRIMINATOR,
        }
    }

    pub fn from_discriminator(tag: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.discriminator() == tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Trade => "trade",
            EventKind::Complete => "complete",
            EventKind::SetParams => "set_params",
        }
    }
}

/// A new market was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEvent {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub user: Pubkey,
}

/// A buy or sell executed against a curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub mint: Pubkey,
    pub sol_amount: u64,
    pub token_amount: u64,
    pub is_buy: bool,
    pub user: Pubkey,
    pub timestamp: i64,
    pub virtual_sol_reserves: u64,
    pub virtual_token_reserves: u64,
}

/// A curve reached its target and migrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteEvent {
    pub user: Pubkey,
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub timestamp: i64,
}

/// The global configuration changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetParamsEvent {
    pub fee_recipient: Pubkey,
    pub initial_virtual_token_reserves: u64,
    pub initial_virtual_sol_reserves: u64,
    pub initial_real_token_reserves: u64,
    pub token_total_supply: u64,
    pub fee_basis_points: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpEvent {
    Create(CreateEvent),
    Trade(TradeEvent),
    Complete(CompleteEvent),
    SetParams(SetParamsEvent),
}

impl PumpEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PumpEvent::Create(_) => EventKind::Create,
            PumpEvent::Trade(_) => EventKind::Trade,
            PumpEvent::Complete(_) => EventKind::Complete,
            PumpEvent::SetParams(_) => EventKind::SetParams,
        }
    }

    /// Decode a raw event payload (discriminator included)
    pub fn decode(data: &[u8]) -> Result<Self, EngineError> {
        let tag = data
            .get(..8)
            .ok_or_else(|| EngineError::malformed_event("payload shorter than discriminator"))?;
        let kind = EventKind::from_discriminator(tag)
            .ok_or_else(|| EngineError::malformed_event("unknown event discriminator"))?;

        let mut reader = ByteReader::new(&data[8..], kind.as_str());
        let event = match kind {
            EventKind::Create => decode_create(&mut reader).map(PumpEvent::Create),
            EventKind::Trade => decode_trade(&mut reader).map(PumpEvent::Trade),
            EventKind::Complete => decode_complete(&mut reader).map(PumpEvent::Complete),
            EventKind::SetParams => decode_set_params(&mut reader).map(PumpEvent::SetParams),
        };

        event.map_err(|err| match err {
            EngineError::Decode { detail, .. } => EngineError::malformed_event(detail),
            other => other,
        })
    }
}

fn decode_create(reader: &mut ByteReader<'_>) -> Result<CreateEvent, EngineError> {
    Ok(CreateEvent {
        name: reader.string("name")?,
        symbol: reader.string("symbol")?,
        uri: reader.string("uri")?,
        mint: reader.pubkey("mint")?,
        bonding_curve: reader.pubkey("bonding_curve")?,
        user: reader.pubkey("user")?,
    })
}

fn decode_trade(reader: &mut ByteReader<'_>) -> Result<TradeEvent, EngineError> {
    Ok(TradeEvent {
        mint: reader.pubkey("mint")?,
        sol_amount: reader.u64("sol_amount")?,
        token_amount: reader.u64("token_amount")?,
        is_buy: reader.bool("is_buy")?,
        user: reader.pubkey("user")?,
        timestamp: reader.i64("timestamp")?,
        virtual_sol_reserves: reader.u64("virtual_sol_reserves")?,
        virtual_token_reserves: reader.u64("virtual_token_reserves")?,
    })
}

fn decode_complete(reader: &mut ByteReader<'_>) -> Result<CompleteEvent, EngineError> {
    Ok(CompleteEvent {
        user: reader.pubkey("user")?,
        mint: reader.pubkey("mint")?,
        bonding_curve: reader.pubkey("bonding_curve")?,
        timestamp: reader.i64("timestamp")?,
    })
}

fn decode_set_params(reader: &mut ByteReader<'_>) -> Result<SetParamsEvent, EngineError> {
    Ok(SetParamsEvent {
        fee_recipient: reader.pubkey("fee_recipient")?,
        initial_virtual_token_reserves: reader.u64("initial_virtual_token_reserves")?,
        initial_virtual_sol_reserves: reader.u64("initial_virtual_sol_reserves")?,
        initial_real_token_reserves: reader.u64("initial_real_token_reserves")?,
        token_total_supply: reader.u64("token_total_supply")?,
        fee_basis_points: reader.u64("fee_basis_points")?,
    })
}

/// Decode one log line
///
/// Returns `None` for lines that are not `Program data:` payloads.
pub fn decode_log_line(line: &str) -> Option<Result<PumpEvent, EngineError>> {
    let payload = line.strip_prefix(PROGRAM_DATA_PREFIX)?;
    Some(
        STANDARD
            .decode(payload.trim())
            .map_err(|e| EngineError::malformed_event(format!("invalid base64: {}", e)))
            .and_then(|bytes| PumpEvent::decode(&bytes)),
    )
}

/// All decodable events in a transaction's logs, in log order
///
/// Payloads from other programs share the `Program data:` prefix, so
/// undecodable lines are skipped rather than failing the whole batch.
pub fn events_from_logs(logs: &[String]) -> Vec<PumpEvent> {
    logs.iter()
        .filter_map(|line| match decode_log_line(line)? {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(error = %e, "Skipping undecodable program data");
                None
            }
        })
        .collect()
}

#[cfg(any(test, feature = "test_utils"))]
impl TradeEvent {
    /// Raw payload as the program emits it
    pub fn to_event_bytes(&self) -> Vec<u8> {
        let mut data = TRADE_EVENT_DISCRIMINATOR.to_vec();
        data.extend_from_slice(self.mint.as_ref());
        data.extend_from_slice(&self.sol_amount.to_le_bytes());
        data.extend_from_slice(&self.token_amount.to_le_bytes());
        data.push(self.is_buy as u8);
        data.extend_from_slice(self.user.as_ref());
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data.extend_from_slice(&self.virtual_sol_reserves.to_le_bytes());
        data.extend_from_slice(&self.virtual_token_reserves.to_le_bytes());
        data
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl CompleteEvent {
    pub fn to_event_bytes(&self) -> Vec<u8> {
        let mut data = COMPLETE_EVENT_DISCRIMINATOR.to_vec();
        data.extend_from_slice(self.user.as_ref());
        data.extend_from_slice(self.mint.as_ref());
        data.extend_from_slice(self.bonding_curve.as_ref());
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data
    }
}

/// Log line carrying `payload`
#[cfg(any(test, feature = "test_utils"))]
pub fn program_data_line(payload: &[u8]) -> String {
    format!("{}{}", PROGRAM_DATA_PREFIX, STANDARD.encode(payload))
}
