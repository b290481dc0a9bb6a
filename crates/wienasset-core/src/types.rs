//! Core type definitions for WienChain asset transactions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset identifier (base58check string derived at issuance)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// Address and key version bytes for this network
    pub fn params(&self) -> &'static NetworkParams {
        match self {
            Self::Mainnet => &MAINNET_PARAMS,
            Self::Testnet => &TESTNET_PARAMS,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Version bytes and prefixes fixed by the network selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    pub message_prefix: &'static str,
    pub bip32_public: u32,
    pub bip32_private: u32,
    pub pub_key_hash: u8,
    pub script_hash: u8,
    pub wif: u8,
    pub dust_threshold: u64,
}

pub const MAINNET_PARAMS: NetworkParams = NetworkParams {
    message_prefix: "\x18WienChain Signed Message:\n",
    bip32_public: 0x0488_b21e,
    bip32_private: 0x0488_ade4,
    pub_key_hash: 0x49,
    script_hash: 0x12,
    wif: 0xa1,
    dust_threshold: 546,
};

pub const TESTNET_PARAMS: NetworkParams = NetworkParams {
    message_prefix: "\x18WienChain Signed Message:\n",
    bip32_public: 0x0435_87cf,
    bip32_private: 0x0435_8394,
    pub_key_hash: 0x87,
    script_hash: 0x13,
    wif: 0xef,
    dust_threshold: 546,
};

/// Whether asset units may be merged across outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationPolicy {
    #[default]
    Aggregatable,
    #[serde(alias = "dispersed")]
    NonAggregatable,
}

impl AggregationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregatable => "aggregatable",
            Self::NonAggregatable => "nonAggregatable",
        }
    }

    pub fn is_aggregatable(&self) -> bool {
        matches!(self, Self::Aggregatable)
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Asset units held by an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetHolding {
    pub asset_id: AssetId,
    pub amount: u64,
    #[serde(default)]
    pub divisibility: u8,
    #[serde(default)]
    pub aggregation_policy: AggregationPolicy,
    #[serde(default = "default_locked")]
    pub lock_status: bool,
    /// Transaction that issued the asset
    #[serde(default, alias = "issueTxid")]
    pub issuance_txid: Option<String>,
}

fn default_locked() -> bool {
    true
}

/// Locking script of an output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptPubKey {
    pub hex: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Spendable output as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: String,
    /// Output index in the creating transaction
    #[serde(alias = "n")]
    pub index: u32,
    pub value: Satoshi,
    pub script_pub_key: ScriptPubKey,
    #[serde(default)]
    pub assets: Vec<AssetHolding>,
    /// Set by the caller once the output has been spent elsewhere
    #[serde(default)]
    pub used: bool,
}

impl Utxo {
    pub fn has_assets(&self) -> bool {
        !self.assets.is_empty()
    }

    /// Units of one asset held by this output, `None` on overflow
    pub fn asset_amount(&self, asset_id: &AssetId) -> Option<u64> {
        self.assets
            .iter()
            .filter(|a| &a.asset_id == asset_id)
            .try_fold(0u64, |acc, a| acc.checked_add(a.amount))
    }

    pub fn holds(&self, asset_id: &AssetId) -> bool {
        self.assets.iter().any(|a| &a.asset_id == asset_id)
    }

    pub fn first_address(&self) -> Option<&str> {
        self.script_pub_key.addresses.first().map(String::as_str)
    }

    pub fn outpoint(&self) -> String {
        format!("{}:{}", self.txid, self.index)
    }
}

/// Base-currency amount in the smallest unit
pub type Satoshi = u64;

/// Constants
pub mod constants {
    use super::Satoshi;

    /// Protocol marker at the start of every commitment payload ("WA")
    pub const PROTOCOL_MARKER: u16 = 0x5741;

    /// Payload format version
    pub const PROTOCOL_VERSION: u8 = 0x03;

    /// Commitment output value for aggregatable issuances
    pub const AGGREGATABLE_ISSUANCE_VALUE: Satoshi = 500_000_000_000;

    /// Commitment output value for non-aggregatable issuances
    pub const NON_AGGREGATABLE_ISSUANCE_VALUE: Satoshi = 100_000_000;

    /// Highest divisibility an asset may declare
    pub const MAX_DIVISIBILITY: u8 = 7;

    /// Fixed first key of the overflow output template
    pub const OVERFLOW_TEMPLATE_KEY: &str =
        "023cce9dee67e1c52da20b5b8dc68482a264c98b864ce5cd5a355f7608131aae9b";

    /// Prefix byte written before the overflow bytes in the template
    pub const OVERFLOW_SLOT_PREFIX: u8 = 0x03;
}
