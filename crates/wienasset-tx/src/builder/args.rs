//! Request arguments
//!
//! Every field is optional on the wire so that a missing required value
//! surfaces as [`BuildError::MissingArgument`](crate::BuildError) naming the
//! field, rather than as a deserialization failure.

use serde::{Deserialize, Serialize};
use wienasset_core::{AggregationPolicy, AssetId, Satoshi, Utxo};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildFlags {
    /// Copy each spent output's script into the new input's script field
    pub inject_previous_output: bool,
}

/// Recipient of newly issued units
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueRecipient {
    pub address: Option<String>,
    pub pub_keys: Option<Vec<String>>,
    pub m: Option<usize>,
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueArgs {
    pub utxos: Vec<Utxo>,
    pub issue_address: Option<String>,
    pub amount: Option<u64>,
    pub fee: Option<Satoshi>,
    pub divisibility: u8,
    pub aggregation_policy: Option<AggregationPolicy>,
    pub lock_status: Option<bool>,
    #[serde(alias = "reissueable")]
    pub reissuable: Option<bool>,
    /// Hex-encoded content hash (32 to 40 bytes)
    pub content_hash: Option<String>,
    pub transfer: Vec<IssueRecipient>,
    /// Funding output used as the sole input
    pub finance_output: Option<Utxo>,
    pub finance_change_address: Option<String>,
    pub flags: BuildFlags,
}

/// Recipient of existing units
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferRecipient {
    pub asset_id: Option<AssetId>,
    pub amount: Option<u64>,
    pub address: Option<String>,
    pub pub_keys: Option<Vec<String>>,
    pub m: Option<usize>,
    pub burn: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferArgs {
    pub utxos: Vec<Utxo>,
    pub to: Vec<TransferRecipient>,
    pub fee: Option<Satoshi>,
    /// Fallback for both change outputs; defaults to the first UTXO's address
    pub from: Option<String>,
    /// Preferred funding output for fee top-up
    pub finance_output: Option<Utxo>,
    pub finance_change_address: Option<String>,
    pub colored_change_address: Option<String>,
    pub content_hash: Option<String>,
    pub flags: BuildFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BurnRequest {
    pub asset_id: Option<AssetId>,
    pub amount: Option<u64>,
}

impl From<&BurnRequest> for TransferRecipient {
    fn from(request: &BurnRequest) -> Self {
        Self {
            asset_id: request.asset_id.clone(),
            amount: request.amount,
            burn: true,
            ..Self::default()
        }
    }
}

/// Transfer arguments plus a list of burns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BurnArgs {
    #[serde(flatten)]
    pub transfer: TransferArgs,
    pub burn: Vec<BurnRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativePayment {
    pub address: Option<String>,
    pub amount: Option<Satoshi>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendNativeArgs {
    pub utxos: Vec<Utxo>,
    pub to: Vec<NativePayment>,
    pub fee: Option<Satoshi>,
    pub from: Option<String>,
    pub finance_change_address: Option<String>,
    pub flags: BuildFlags,
}
