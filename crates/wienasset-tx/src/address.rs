//! WienChain address utilities
//!
//! Addresses are base58check strings of `version(1) || hash160(20)`. The
//! version byte selects pay-to-pubkey-hash or pay-to-script-hash per network.

use bitcoin::hashes::Hash;
use bitcoin::{PubkeyHash, Script, ScriptBuf, ScriptHash};
use wienasset_core::Network;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Address {address} has version byte 0x{version:02x}, not valid on {network}")]
    WrongNetwork {
        address: String,
        version: u8,
        network: Network,
    },
}

/// Convert an address to the locking script that pays it.
pub fn address_to_script(address: &str, network: Network) -> Result<ScriptBuf, AddressError> {
    let invalid = |reason: String| AddressError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let data = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| invalid(e.to_string()))?;
    let (&version, hash) = data
        .split_first()
        .ok_or_else(|| invalid("empty payload".to_string()))?;
    let hash: [u8; 20] = hash
        .try_into()
        .map_err(|_| invalid(format!("expected 20 byte hash, got {}", hash.len())))?;

    let params = network.params();
    if version == params.pub_key_hash {
        Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)))
    } else if version == params.script_hash {
        Ok(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)))
    } else {
        Err(AddressError::WrongNetwork {
            address: address.to_string(),
            version,
            network,
        })
    }
}

/// Base58check encoding of `version || hash`
pub fn encode_address(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}

/// Pay-to-script-hash address of a redeem script
pub fn script_hash_address(redeem_script: &Script, network: Network) -> String {
    encode_address(
        network.params().script_hash,
        &redeem_script.script_hash().to_byte_array(),
    )
}
