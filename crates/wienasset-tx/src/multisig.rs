//! Bare m-of-n multisig destinations
//!
//! The redeem script is `OP_m <key_1> .. <key_n> OP_n OP_CHECKMULTISIG` with
//! keys in caller order. Assets are paid to its pay-to-script-hash address and
//! the script is handed back so the recipients can spend later.

use std::str::FromStr;

use bitcoin::blockdata::opcodes::all::OP_CHECKMULTISIG;
use bitcoin::script::Builder;
use bitcoin::{PublicKey, ScriptBuf};
use serde::{Deserialize, Serialize};
use wienasset_core::Network;

use crate::address::script_hash_address;

/// Largest key count a standard multisig script allows
pub const MAX_KEYS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultisigError {
    #[error("Multisig needs at least one public key")]
    NoKeys,

    #[error("Multisig threshold must be at least 1")]
    ZeroThreshold,

    #[error("Multisig threshold {m} exceeds key count {n}")]
    ThresholdTooHigh { m: usize, n: usize },

    #[error("Multisig supports at most 16 keys, got {0}")]
    TooManyKeys(usize),

    #[error("Invalid public key {key}: {reason}")]
    InvalidKey { key: String, reason: String },
}

/// Redeem script and the address that pays it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigDestination {
    pub redeem_script: String,
    pub address: String,
}

pub fn multisig_script(pub_keys: &[String], m: usize) -> Result<ScriptBuf, MultisigError> {
    let n = pub_keys.len();
    if n == 0 {
        return Err(MultisigError::NoKeys);
    }
    if m == 0 {
        return Err(MultisigError::ZeroThreshold);
    }
    if m > n {
        return Err(MultisigError::ThresholdTooHigh { m, n });
    }
    if n > MAX_KEYS {
        return Err(MultisigError::TooManyKeys(n));
    }

    let mut builder = Builder::new().push_int(m as i64);
    for key in pub_keys {
        let key = PublicKey::from_str(key).map_err(|e| MultisigError::InvalidKey {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        builder = builder.push_key(&key);
    }
    Ok(builder
        .push_int(n as i64)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script())
}

pub fn multisig_destination(
    pub_keys: &[String],
    m: usize,
    network: Network,
) -> Result<MultisigDestination, MultisigError> {
    let script = multisig_script(pub_keys, m)?;
    Ok(MultisigDestination {
        address: script_hash_address(&script, network),
        redeem_script: hex::encode(script.as_bytes()),
    })
}
