//! Shared test data for the builder tests

use wienasset_core::{AggregationPolicy, AssetHolding, AssetId, BuilderConfig, ScriptPubKey, Utxo};

use super::AssetTxBuilder;

pub const ISSUE_ADDRESS: &str = "WUDUjWsfAuXc96uXGEwqHSafnB7LiGpc3j";
pub const HOLDER_ADDRESS: &str = "WjsNcfayUrmPTXCpGanSc1ruQt9ftUPgw2";
pub const ASSET: &str = "La4Su8sucHfTj4ggGF1NQeBKwF3hUiJG1NU9GP";
pub const HELD_UNITS: u64 = 75_987_900_000_000;
pub const ISSUED_UNITS: u64 = 1_500_000_000_000_000;

pub const KEY_G: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
pub const KEY_2G: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

pub const CONTENT_HASH: &str = "46b7e2e6fbc7d6e0b2e16b4b7c5a4ec8d3f3e45c2c79b0e1f34b8c5a1a2b3c4d";

pub fn builder() -> AssetTxBuilder {
    AssetTxBuilder::new(BuilderConfig::default()).unwrap()
}

pub fn mock_utxo(txid: &str, index: u32, value: u64, script_hex: &str, address: &str) -> Utxo {
    Utxo {
        txid: txid.to_string(),
        index,
        value,
        script_pub_key: ScriptPubKey {
            hex: script_hex.to_string(),
            addresses: vec![address.to_string()],
        },
        assets: vec![],
        used: false,
    }
}

/// Funding output for issuance
pub fn issue_utxo() -> Utxo {
    mock_utxo(
        "471ac770c53a85ba6ef15d5cfff7a597bfab2c1ed015cc929e35fcd42c9b90df",
        1,
        1_000_100_000_000,
        "76a9143ccb1b3b68065b3617679db3727fce5f46dff22088ac",
        ISSUE_ADDRESS,
    )
}

/// Output holding `units` of [`ASSET`]
pub fn asset_utxo(units: u64) -> Utxo {
    let mut utxo = mock_utxo(
        "72505974f4ef005a902bca4db19025219ef4baa5b5d0ec2268a91b0336e00802",
        0,
        5741,
        "76a914e87fb14ac8daef9a1b98c81f109fa5ac138e439b88ac",
        HOLDER_ADDRESS,
    );
    utxo.assets.push(AssetHolding {
        asset_id: AssetId::new(ASSET),
        amount: units,
        divisibility: 5,
        aggregation_policy: AggregationPolicy::Aggregatable,
        lock_status: true,
        issuance_txid: Some(
            "06c4a5fc6b3de7de5dffd3c90424eb17aa435e8ce31bc983acfd019d08232e6c".to_string(),
        ),
    });
    utxo
}

/// Plain currency output
pub fn currency_utxo() -> Utxo {
    mock_utxo(
        "1ef1d5fe9a9f499358e92d5f3912fac0f224ef3e1b7e6d5450e2d18d001fe3ad",
        1,
        100_000_000,
        "76a914e87fb14ac8daef9a1b98c81f109fa5ac138e439b88ac",
        HOLDER_ADDRESS,
    )
}

pub fn value_in(utxos: &[&Utxo]) -> u64 {
    utxos.iter().map(|u| u.value).sum()
}

pub fn value_out(tx: &bitcoin::Transaction) -> u64 {
    tx.output.iter().map(|o| o.value.to_sat()).sum()
}
