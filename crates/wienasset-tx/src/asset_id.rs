//! Asset identifier derivation
//!
//! The identifier is bound to the first input of the issuance:
//! `base58check(tag(2) || hash160("<txid>:<vout>" || script) || divisibility(2))`.
//! The tag encodes lock status and aggregation policy, which is what gives
//! mainnet identifiers their `La`/`Ua` prefixes.

use bitcoin::hashes::{hash160, Hash};
use wienasset_core::constants::MAX_DIVISIBILITY;
use wienasset_core::{AggregationPolicy, AssetId};

const TAG_LOCKED_AGGREGATABLE: u16 = 0x20ce;
const TAG_LOCKED_NON_AGGREGATABLE: u16 = 0x20e4;
const TAG_UNLOCKED_AGGREGATABLE: u16 = 0x2e37;
const TAG_UNLOCKED_NON_AGGREGATABLE: u16 = 0x2e4e;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetIdError {
    #[error("Invalid script hex: {0}")]
    InvalidScript(String),

    #[error("Divisibility must be between 0 and 7, got {0}")]
    InvalidDivisibility(u8),
}

/// Issuance input the identifier is derived from
#[derive(Debug, Clone, Copy)]
pub struct AssetIdInput<'a> {
    pub txid: &'a str,
    pub vout: u32,
    pub script_hex: &'a str,
    pub lock_status: bool,
    pub divisibility: u8,
    pub aggregation_policy: AggregationPolicy,
}

fn tag(lock_status: bool, policy: AggregationPolicy) -> u16 {
    match (lock_status, policy) {
        (true, AggregationPolicy::Aggregatable) => TAG_LOCKED_AGGREGATABLE,
        (true, AggregationPolicy::NonAggregatable) => TAG_LOCKED_NON_AGGREGATABLE,
        (false, AggregationPolicy::Aggregatable) => TAG_UNLOCKED_AGGREGATABLE,
        (false, AggregationPolicy::NonAggregatable) => TAG_UNLOCKED_NON_AGGREGATABLE,
    }
}

pub fn derive_asset_id(input: &AssetIdInput<'_>) -> Result<AssetId, AssetIdError> {
    if input.divisibility > MAX_DIVISIBILITY {
        return Err(AssetIdError::InvalidDivisibility(input.divisibility));
    }
    let script = hex::decode(input.script_hex)
        .map_err(|e| AssetIdError::InvalidScript(format!("{}: {}", input.script_hex, e)))?;

    let mut preimage = format!("{}:{}", input.txid, input.vout).into_bytes();
    preimage.extend_from_slice(&script);
    let digest = hash160::Hash::hash(&preimage);

    let mut payload = Vec::with_capacity(24);
    payload.extend_from_slice(&tag(input.lock_status, input.aggregation_policy).to_be_bytes());
    payload.extend_from_slice(digest.as_byte_array());
    payload.extend_from_slice(&u16::from(input.divisibility).to_be_bytes());

    let asset_id = AssetId::new(bs58::encode(payload).with_check().into_string());
    tracing::debug!(
        txid = input.txid,
        vout = input.vout,
        asset_id = %asset_id,
        "derived asset id"
    );
    Ok(asset_id)
}
