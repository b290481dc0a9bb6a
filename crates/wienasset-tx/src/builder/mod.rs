//! Colored transaction assembly
//!
//! [`AssetTxBuilder`] turns a request into an unsigned transaction:
//! 1. Select inputs (issuance funding, asset holdings, fee top-up)
//! 2. Create destination outputs in request order
//! 3. Encode the payload, moving metadata into an overflow output at index 0
//!    when it does not fit, and append the commitment output
//! 4. Settle currency change and colored change
//!
//! The builder holds only configuration, so one instance can serve
//! concurrent callers.

mod args;
mod issue;
mod native;
mod transfer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use args::{
    BuildFlags, BurnArgs, BurnRequest, IssueArgs, IssueRecipient, NativePayment, SendNativeArgs,
    TransferArgs, TransferRecipient,
};

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use serde::Serialize;
use wienasset_core::{AssetId, BuilderConfig, Satoshi};

use crate::address::address_to_script;
use crate::codec::{EncodeError, Payload, Payment};
use crate::commitment::{commitment_script, overflow_script};
use crate::error::BuildError;
use crate::multisig::multisig_destination;
use crate::selector::{InputSet, SelectedInput, SelectionError};

/// Output paying a multisig redeem script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigOutput {
    pub index: u32,
    pub redeem_script: String,
    pub address: String,
}

/// Unsigned transaction plus what the caller needs to track it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyResult {
    pub tx: Transaction,
    pub tx_hex: String,
    /// Set for issuances
    pub asset_id: Option<AssetId>,
    pub multisig_outputs: Vec<MultisigOutput>,
    /// Outputs that receive asset units, in payment order without duplicates
    pub colored_output_indexes: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct AssetTxBuilder {
    config: BuilderConfig,
}

impl AssetTxBuilder {
    pub fn new(config: BuilderConfig) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    fn dust(&self) -> Satoshi {
        self.config.min_dust_value
    }

    /// Currency locked in the overflow output, reserved up front whenever a
    /// content hash might need it
    fn overflow_reserve(&self, has_hash: bool) -> Satoshi {
        if has_hash && self.config.write_multisig {
            self.config.min_dust_value_multisig
        } else {
            0
        }
    }

    fn script_for(&self, address: &str) -> Result<ScriptBuf, BuildError> {
        Ok(address_to_script(address, self.config.network)?)
    }

    fn dust_output(&self, address: &str) -> Result<TxOut, BuildError> {
        self.value_output(address, self.dust())
    }

    fn value_output(&self, address: &str, value: Satoshi) -> Result<TxOut, BuildError> {
        Ok(TxOut {
            value: Amount::from_sat(value),
            script_pubkey: self.script_for(address)?,
        })
    }

    /// Resolve a recipient to `(address, redeem_script)`. An explicit address
    /// wins over a key list.
    fn resolve_recipient(
        &self,
        address: Option<&str>,
        pub_keys: Option<&[String]>,
        m: Option<usize>,
    ) -> Result<(String, Option<String>), BuildError> {
        match (address, pub_keys, m) {
            (Some(address), _, _) => Ok((address.to_string(), None)),
            (None, Some(keys), Some(m)) => {
                let dest = multisig_destination(keys, m, self.config.network)?;
                Ok((dest.address, Some(dest.redeem_script)))
            }
            _ => Err(BuildError::MissingArgument("address")),
        }
    }

    /// Encode the payload and append the commitment output.
    ///
    /// If the content hash does not fit, every payment and multisig record
    /// moves one output later and the hash goes into an overflow output
    /// inserted at index 0. Only one such retry is made.
    fn attach_commitment(
        &self,
        payload: &mut Payload,
        outputs: &mut Vec<TxOut>,
        multisig: &mut [MultisigOutput],
        commitment_value: Satoshi,
    ) -> Result<(), BuildError> {
        let max = self.config.max_payload_size;
        let encoded = payload.encode(max)?;

        let (code, overflow) = if encoded.leftover.is_empty() {
            (encoded.code, None)
        } else {
            if !self.config.write_multisig {
                return Err(BuildError::OverflowDisabled);
            }
            tracing::debug!(
                payments = payload.payments.len(),
                "payload overflows, shifting outputs for overflow output"
            );
            payload.shift_outputs();
            for record in multisig.iter_mut() {
                record.index += 1;
            }
            let mut retry = match payload.encode(max) {
                Ok(retry) => retry,
                Err(EncodeError::PayloadTooLarge { .. }) => {
                    return Err(BuildError::OverflowAfterShift)
                }
                Err(e) => return Err(e.into()),
            };
            if retry.leftover.len() != 1 {
                return Err(BuildError::OverflowAfterShift);
            }
            (retry.code, retry.leftover.pop())
        };

        outputs.push(TxOut {
            value: Amount::from_sat(commitment_value),
            script_pubkey: commitment_script(&code)?,
        });
        if let Some(chunk) = overflow {
            outputs.insert(
                0,
                TxOut {
                    value: Amount::from_sat(self.config.min_dust_value_multisig),
                    script_pubkey: overflow_script(&chunk)?,
                },
            );
        }
        tracing::debug!(payload_len = code.len(), "attached commitment output");
        Ok(())
    }

    /// Currency left after outputs and fee, which must cover one dust output
    fn settle_change(
        &self,
        inputs: &InputSet,
        outputs: &[TxOut],
        fee: Satoshi,
    ) -> Result<Satoshi, BuildError> {
        let required = required_for(outputs, fee, self.dust())?;
        if inputs.total_value < required {
            return Err(BuildError::InsufficientFee {
                required,
                missing: required - inputs.total_value,
            });
        }
        Ok(inputs.total_value - required + self.dust())
    }

    fn finish(
        &self,
        inputs: &InputSet,
        outputs: Vec<TxOut>,
        flags: &BuildFlags,
        asset_id: Option<AssetId>,
        multisig_outputs: Vec<MultisigOutput>,
        colored_output_indexes: Vec<u32>,
    ) -> Result<AssemblyResult, BuildError> {
        let input = inputs
            .inputs
            .iter()
            .map(|i| tx_input(i, flags.inject_previous_output))
            .collect::<Result<Vec<_>, _>>()?;
        let tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input,
            output: outputs,
        };
        let tx_hex = serialize_hex(&tx);
        tracing::info!(
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            colored = ?colored_output_indexes,
            "assembled transaction"
        );
        Ok(AssemblyResult {
            tx,
            tx_hex,
            asset_id,
            multisig_outputs,
            colored_output_indexes,
        })
    }
}

fn tx_input(input: &SelectedInput, inject_previous_output: bool) -> Result<TxIn, BuildError> {
    let txid = Txid::from_str(&input.txid).map_err(|e| BuildError::InvalidArgument {
        name: "utxos",
        reason: format!("txid {}: {}", input.txid, e),
    })?;
    let script_sig = if inject_previous_output {
        ScriptBuf::from_hex(&input.script_hex).map_err(|e| BuildError::InvalidArgument {
            name: "utxos",
            reason: format!("script {}: {}", input.script_hex, e),
        })?
    } else {
        ScriptBuf::new()
    };
    Ok(TxIn {
        previous_output: OutPoint {
            txid,
            vout: input.index,
        },
        script_sig,
        sequence: Sequence::MAX,
        witness: Witness::new(),
    })
}

fn output_total(outputs: &[TxOut]) -> Result<Satoshi, BuildError> {
    outputs.iter().try_fold(0u64, |acc, out| {
        acc.checked_add(out.value.to_sat())
            .ok_or(BuildError::AmountOverflow)
    })
}

/// Inputs needed for `outputs`, `fee` and one more output of `extra`
fn required_for(outputs: &[TxOut], fee: Satoshi, extra: Satoshi) -> Result<Satoshi, BuildError> {
    output_total(outputs)?
        .checked_add(fee)
        .and_then(|v| v.checked_add(extra))
        .ok_or(BuildError::AmountOverflow)
}

fn checked_sum<I: IntoIterator<Item = u64>>(values: I) -> Result<u64, BuildError> {
    values.into_iter().try_fold(0u64, |acc, v| {
        acc.checked_add(v).ok_or(BuildError::AmountOverflow)
    })
}

/// Output indexes named by payments, deduplicated in order
fn colored_outputs(payments: &[Payment]) -> Vec<u32> {
    let mut indexes: Vec<u32> = Vec::new();
    for output in payments.iter().filter_map(|p| p.output) {
        let output = output as u32;
        if !indexes.contains(&output) {
            indexes.push(output);
        }
    }
    indexes
}

fn parse_content_hash(content_hash: Option<&str>) -> Result<Option<Vec<u8>>, BuildError> {
    content_hash
        .map(|h| {
            hex::decode(h).map_err(|e| BuildError::InvalidArgument {
                name: "contentHash",
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Map a currency shortfall during fee top-up to the fee error
fn fee_error(err: SelectionError, required: Satoshi, missing: Satoshi) -> BuildError {
    match err {
        SelectionError::InsufficientCurrency { .. } => {
            BuildError::InsufficientFee { required, missing }
        }
        other => other.into(),
    }
}

fn require_positive(name: &'static str, amount: u64) -> Result<u64, BuildError> {
    if amount == 0 {
        return Err(BuildError::InvalidArgument {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::*;

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = BuilderConfig {
            min_dust_value: 10,
            ..BuilderConfig::default()
        };
        let err = AssetTxBuilder::new(config).unwrap_err();
        match err {
            BuildError::Config(_) => {}
            _ => panic!("Expected Config error, got {:?}", err),
        }
    }

    #[test]
    fn test_builder_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AssetTxBuilder>();
    }

    #[test]
    fn test_resolve_recipient_priority() {
        let builder = builder();
        let keys = vec![KEY_G.to_string()];
        let (address, redeem) = builder
            .resolve_recipient(Some(ISSUE_ADDRESS), Some(&keys), Some(1))
            .unwrap();
        assert_eq!(address, ISSUE_ADDRESS);
        assert!(redeem.is_none());

        let (address, redeem) = builder.resolve_recipient(None, Some(&keys), Some(1)).unwrap();
        assert!(address.starts_with('8'));
        assert!(redeem.is_some());

        let err = builder.resolve_recipient(None, Some(&keys), None).unwrap_err();
        assert!(matches!(err, BuildError::MissingArgument("address")));
    }

    #[test]
    fn test_colored_outputs_dedup() {
        let payments = vec![
            Payment::to_output(2, 1),
            Payment::burning(4),
            Payment::to_output(0, 1),
            Payment::to_output(2, 9),
        ];
        assert_eq!(colored_outputs(&payments), vec![2, 0]);
    }

    #[test]
    fn test_tx_input_rejects_bad_txid() {
        let input = SelectedInput {
            txid: "nothex".to_string(),
            index: 0,
            value: 1,
            script_hex: String::new(),
            asset_ids: vec![],
        };
        let err = tx_input(&input, false).unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgument { name: "utxos", .. }));
    }

    #[test]
    fn test_parse_content_hash() {
        assert_eq!(parse_content_hash(None).unwrap(), None);
        assert_eq!(parse_content_hash(Some("0a0b")).unwrap(), Some(vec![0x0a, 0x0b]));
        assert!(parse_content_hash(Some("xyz")).is_err());
    }
}
