//! Asset issuance

use bitcoin::{Amount, TxOut};
use wienasset_core::constants::{
    AGGREGATABLE_ISSUANCE_VALUE, MAX_DIVISIBILITY, NON_AGGREGATABLE_ISSUANCE_VALUE,
};
use wienasset_core::Satoshi;

use super::{
    checked_sum, colored_outputs, parse_content_hash, require_positive, AssemblyResult,
    AssetTxBuilder, IssueArgs, MultisigOutput,
};
use crate::asset_id::{derive_asset_id, AssetIdInput};
use crate::codec::{IssuanceHeader, Payload, Payment};
use crate::error::BuildError;
use crate::selector::{select_issuance_inputs, InputSet, SelectionError};

impl AssetTxBuilder {
    /// Build an issuance transaction.
    ///
    /// Output layout: `[overflow?] transfers.. commitment [currency change] issued`.
    /// Units not sent to a transfer recipient land on the last output, which
    /// pays `issue_address`.
    pub fn build_issue(&self, args: &IssueArgs) -> Result<AssemblyResult, BuildError> {
        let issue_address = args
            .issue_address
            .as_deref()
            .ok_or(BuildError::MissingArgument("issueAddress"))?;
        let amount = require_positive(
            "amount",
            args.amount.ok_or(BuildError::MissingArgument("amount"))?,
        )?;
        if args.utxos.is_empty() && args.finance_output.is_none() {
            return Err(BuildError::MissingArgument("utxos"));
        }

        let policy = args.aggregation_policy.unwrap_or_default();
        let divisibility = if policy.is_aggregatable() {
            args.divisibility
        } else {
            0
        };
        if divisibility > MAX_DIVISIBILITY {
            return Err(BuildError::InvalidArgument {
                name: "divisibility",
                reason: format!("{} exceeds {}", divisibility, MAX_DIVISIBILITY),
            });
        }
        let lock_status = args
            .lock_status
            .or(args.reissuable.map(|r| !r))
            .unwrap_or(true);
        let fee = args.fee.unwrap_or(self.config.default_fee);
        let content_hash = parse_content_hash(args.content_hash.as_deref())?;
        let commitment_value = if policy.is_aggregatable() {
            AGGREGATABLE_ISSUANCE_VALUE
        } else {
            NON_AGGREGATABLE_ISSUANCE_VALUE
        };

        let transfer_amounts = args
            .transfer
            .iter()
            .map(|t| {
                t.amount
                    .ok_or(BuildError::MissingArgument("amount"))
                    .and_then(|a| require_positive("amount", a))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let transferred = checked_sum(transfer_amounts.iter().copied())?;
        if transferred > amount {
            return Err(BuildError::ExceedsIssuedAmount {
                requested: transferred,
                issued: amount,
            });
        }
        let remaining = amount - transferred;

        let cost = self.issuance_cost(
            fee,
            commitment_value,
            args.transfer.len(),
            content_hash.is_some(),
        )?;

        // Inputs; the first one binds the asset id
        let mut inputs = InputSet::new();
        let first = match &args.finance_output {
            Some(finance) => {
                if finance.used {
                    return Err(BuildError::AlreadySpent {
                        txid: finance.txid.clone(),
                        index: finance.index,
                    });
                }
                if finance.has_assets() {
                    return Err(BuildError::ColoredFunding(finance.outpoint()));
                }
                if finance.value < cost {
                    return Err(BuildError::InsufficientIssuanceFunds {
                        required: cost,
                        available: finance.value,
                    });
                }
                let position = inputs.push(finance)?;
                inputs.inputs[position].clone()
            }
            None => select_issuance_inputs(&args.utxos, cost, &mut inputs).map_err(|e| match e {
                SelectionError::InsufficientCurrency {
                    required,
                    available,
                } => BuildError::InsufficientIssuanceFunds {
                    required,
                    available,
                },
                other => other.into(),
            })?,
        };

        let asset_id = derive_asset_id(&AssetIdInput {
            txid: &first.txid,
            vout: first.index,
            script_hex: &first.script_hex,
            lock_status,
            divisibility,
            aggregation_policy: policy,
        })?;

        // Transfers, all paid from the issuance itself
        let mut outputs: Vec<TxOut> = Vec::new();
        let mut payments = Vec::with_capacity(args.transfer.len());
        let mut multisig = Vec::new();
        for (recipient, units) in args.transfer.iter().zip(transfer_amounts) {
            let (address, redeem_script) = self.resolve_recipient(
                recipient.address.as_deref(),
                recipient.pub_keys.as_deref(),
                recipient.m,
            )?;
            let index = outputs.len();
            payments.push(Payment::to_output(index as i32, units));
            outputs.push(self.dust_output(&address)?);
            if let Some(redeem_script) = redeem_script {
                multisig.push(MultisigOutput {
                    index: index as u32,
                    redeem_script,
                    address,
                });
            }
        }

        // Non-aggregatable issuances still carry the full supply here rather
        // than a placeholder; their divisibility was forced to 0 above.
        let header = IssuanceHeader {
            amount,
            divisibility,
            lock_status,
            aggregation_policy: policy,
        };
        let mut payload = Payload::issuance(header, payments).with_content_hash(content_hash);
        self.attach_commitment(&mut payload, &mut outputs, &mut multisig, commitment_value)?;
        let mut colored = colored_outputs(&payload.payments);

        let change = self.settle_change(&inputs, &outputs, fee)?;
        let dust = self.dust();
        let mut last_value = change;
        if remaining > 0 && change >= 2 * dust {
            let change_address = args
                .finance_change_address
                .as_deref()
                .unwrap_or(issue_address);
            outputs.push(self.value_output(change_address, change - dust)?);
            last_value = dust;
        }
        if remaining > 0 {
            colored.push(outputs.len() as u32);
        }
        outputs.push(TxOut {
            value: Amount::from_sat(last_value),
            script_pubkey: self.script_for(issue_address)?,
        });

        tracing::debug!(
            asset_id = %asset_id,
            amount,
            remaining,
            change,
            "built issuance"
        );
        self.finish(
            &inputs,
            outputs,
            &args.flags,
            Some(asset_id),
            multisig,
            colored,
        )
    }

    /// Currency an issuance must gather before outputs are known
    fn issuance_cost(
        &self,
        fee: Satoshi,
        commitment_value: Satoshi,
        transfers: usize,
        has_hash: bool,
    ) -> Result<Satoshi, BuildError> {
        let dust = self.dust();
        (transfers as u64)
            .checked_mul(dust)
            .and_then(|v| v.checked_add(fee))
            .and_then(|v| v.checked_add(commitment_value))
            .and_then(|v| v.checked_add(self.overflow_reserve(has_hash)))
            .and_then(|v| v.checked_add(dust))
            .ok_or(BuildError::AmountOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::*;
    use crate::builder::IssueRecipient;
    use crate::commitment::decode_commitment;
    use crate::codec::PayloadKind;
    use wienasset_core::{AggregationPolicy, ErrorClass};

    fn issue_args() -> IssueArgs {
        IssueArgs {
            utxos: vec![issue_utxo()],
            issue_address: Some(ISSUE_ADDRESS.to_string()),
            amount: Some(ISSUED_UNITS),
            divisibility: 3,
            ..IssueArgs::default()
        }
    }

    fn to_address(address: &str, amount: u64) -> IssueRecipient {
        IssueRecipient {
            address: Some(address.to_string()),
            amount: Some(amount),
            ..IssueRecipient::default()
        }
    }

    #[test]
    fn test_issue_default() {
        let result = builder().build_issue(&issue_args()).unwrap();
        let tx = &result.tx;
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.output.len(), 3);
        assert_eq!(result.colored_output_indexes, vec![2]);
        assert_eq!(tx.output[0].value.to_sat(), AGGREGATABLE_ISSUANCE_VALUE);
        assert!(tx.output[0].script_pubkey.is_op_return());
        assert_eq!(tx.output[2].value.to_sat(), 5741);
        assert_eq!(value_in(&[&issue_utxo()]) - value_out(tx), 10_000);
        assert_eq!(
            result.asset_id.as_ref().map(|a| a.as_str()),
            Some("La9uU4CVujao5D92axjiuFVgBFuKFiriYJjdjo")
        );
        assert!(result.tx_hex.starts_with("01000000"));
        assert!(result.multisig_outputs.is_empty());
    }

    #[test]
    fn test_issue_payload_header() {
        let result = builder().build_issue(&issue_args()).unwrap();
        let payload = decode_commitment(&result.tx).unwrap().unwrap();
        match payload.kind {
            PayloadKind::Issuance(header) => {
                assert_eq!(header.amount, ISSUED_UNITS);
                assert_eq!(header.divisibility, 3);
                assert!(header.lock_status);
                assert_eq!(header.aggregation_policy, AggregationPolicy::Aggregatable);
            }
            _ => panic!("Expected issuance payload, got {:?}", payload.kind),
        }
        assert!(payload.payments.is_empty());
    }

    #[test]
    fn test_issue_without_split() {
        let mut args = issue_args();
        args.utxos[0].value = AGGREGATABLE_ISSUANCE_VALUE + 10_000 + 5741;
        let result = builder().build_issue(&args).unwrap();
        assert_eq!(result.tx.output.len(), 2);
        assert_eq!(result.colored_output_indexes, vec![1]);
        assert_eq!(result.tx.output[1].value.to_sat(), 5741);
    }

    #[test]
    fn test_issue_insufficient_funds() {
        let mut args = issue_args();
        args.utxos[0].value = AGGREGATABLE_ISSUANCE_VALUE + 10_000 + 5740;
        let err = builder().build_issue(&args).unwrap_err();
        match err {
            BuildError::InsufficientIssuanceFunds {
                required,
                available,
            } => {
                assert_eq!(required, AGGREGATABLE_ISSUANCE_VALUE + 15_741);
                assert_eq!(available, AGGREGATABLE_ISSUANCE_VALUE + 15_740);
            }
            _ => panic!("Expected InsufficientIssuanceFunds, got {:?}", err),
        }
        assert_eq!(err.class(), ErrorClass::Funding);
    }

    #[test]
    fn test_issue_missing_arguments() {
        let mut args = issue_args();
        args.issue_address = None;
        let err = builder().build_issue(&args).unwrap_err();
        assert_eq!(err.to_string(), "Must have \"issueAddress\"");

        let mut args = issue_args();
        args.amount = None;
        assert!(matches!(
            builder().build_issue(&args),
            Err(BuildError::MissingArgument("amount"))
        ));

        let mut args = issue_args();
        args.utxos.clear();
        assert!(matches!(
            builder().build_issue(&args),
            Err(BuildError::MissingArgument("utxos"))
        ));
    }

    #[test]
    fn test_issue_with_transfers() {
        let mut args = issue_args();
        args.transfer = vec![to_address(HOLDER_ADDRESS, 20), to_address(ISSUE_ADDRESS, 30)];
        let result = builder().build_issue(&args).unwrap();
        let tx = &result.tx;
        // two transfers, commitment, currency change, issued remainder
        assert_eq!(tx.output.len(), 5);
        assert_eq!(result.colored_output_indexes, vec![0, 1, 4]);
        assert_eq!(tx.output[2].value.to_sat(), AGGREGATABLE_ISSUANCE_VALUE);

        let payload = decode_commitment(tx).unwrap().unwrap();
        assert_eq!(
            payload.payments,
            vec![Payment::to_output(0, 20), Payment::to_output(1, 30)]
        );
        assert_eq!(value_in(&[&issue_utxo()]) - value_out(tx), 10_000);
    }

    #[test]
    fn test_issue_transfer_everything() {
        let mut args = issue_args();
        args.transfer = vec![to_address(HOLDER_ADDRESS, ISSUED_UNITS)];
        let result = builder().build_issue(&args).unwrap();
        // no remainder: currency change is not split off
        assert_eq!(result.tx.output.len(), 3);
        assert_eq!(result.colored_output_indexes, vec![0]);
    }

    #[test]
    fn test_issue_exceeds_amount() {
        let mut args = issue_args();
        args.transfer = vec![to_address(HOLDER_ADDRESS, ISSUED_UNITS), to_address(HOLDER_ADDRESS, 1)];
        let err = builder().build_issue(&args).unwrap_err();
        match err {
            BuildError::ExceedsIssuedAmount { requested, issued } => {
                assert_eq!(requested, ISSUED_UNITS + 1);
                assert_eq!(issued, ISSUED_UNITS);
            }
            _ => panic!("Expected ExceedsIssuedAmount, got {:?}", err),
        }
        assert_eq!(err.class(), ErrorClass::Capacity);
    }

    #[test]
    fn test_issue_multisig_transfer() {
        let mut args = issue_args();
        args.transfer = vec![IssueRecipient {
            pub_keys: Some(vec![KEY_G.to_string(), KEY_2G.to_string()]),
            m: Some(1),
            amount: Some(10),
            ..IssueRecipient::default()
        }];
        let result = builder().build_issue(&args).unwrap();
        assert_eq!(result.multisig_outputs.len(), 1);
        let record = &result.multisig_outputs[0];
        assert_eq!(record.index, 0);
        assert!(record.redeem_script.starts_with("5121"));
        assert!(result.tx.output[0].script_pubkey.is_p2sh());
    }

    #[test]
    fn test_issue_non_aggregatable_forces_divisibility() {
        let mut args = issue_args();
        args.aggregation_policy = Some(AggregationPolicy::NonAggregatable);
        args.utxos[0].value = 1_000_000_000;
        let result = builder().build_issue(&args).unwrap();
        assert_eq!(result.tx.output[0].value.to_sat(), NON_AGGREGATABLE_ISSUANCE_VALUE);
        let payload = decode_commitment(&result.tx).unwrap().unwrap();
        match payload.kind {
            PayloadKind::Issuance(header) => {
                assert_eq!(header.divisibility, 0);
                assert_eq!(header.amount, ISSUED_UNITS);
                assert_eq!(header.aggregation_policy, AggregationPolicy::NonAggregatable);
            }
            _ => panic!("Expected issuance payload, got {:?}", payload.kind),
        }
        assert!(result.asset_id.unwrap().as_str().starts_with("Ld"));
    }

    #[test]
    fn test_issue_lock_status_aliases() {
        let mut args = issue_args();
        args.reissuable = Some(true);
        let unlocked = builder().build_issue(&args).unwrap();
        assert!(unlocked.asset_id.unwrap().as_str().starts_with("Ua"));

        args.lock_status = Some(true);
        let locked = builder().build_issue(&args).unwrap();
        assert!(locked.asset_id.unwrap().as_str().starts_with("La"));
    }

    #[test]
    fn test_issue_finance_output() {
        let mut args = issue_args();
        args.utxos = vec![currency_utxo()];
        args.finance_output = Some(issue_utxo());
        args.finance_change_address = Some(HOLDER_ADDRESS.to_string());
        let result = builder().build_issue(&args).unwrap();
        assert_eq!(result.tx.input.len(), 1);
        assert_eq!(
            result.tx.input[0].previous_output.txid.to_string(),
            issue_utxo().txid
        );
        // same outpoint as the default case, so the same asset id
        assert_eq!(
            result.asset_id.unwrap().as_str(),
            "La9uU4CVujao5D92axjiuFVgBFuKFiriYJjdjo"
        );
        let change_script = crate::address::address_to_script(HOLDER_ADDRESS, Default::default()).unwrap();
        assert_eq!(result.tx.output[1].script_pubkey, change_script);
    }

    #[test]
    fn test_issue_rejects_colored_finance_output() {
        let mut args = issue_args();
        args.finance_output = Some(asset_utxo(5));
        let err = builder().build_issue(&args).unwrap_err();
        assert!(matches!(err, BuildError::ColoredFunding(_)));
        assert_eq!(err.class(), ErrorClass::Integrity);
    }

    #[test]
    fn test_issue_skips_colored_utxos() {
        let mut args = issue_args();
        args.utxos = vec![asset_utxo(5), issue_utxo()];
        let result = builder().build_issue(&args).unwrap();
        assert_eq!(result.tx.input.len(), 1);
        assert_eq!(result.tx.input[0].previous_output.vout, 1);
    }

    #[test]
    fn test_issue_content_hash_inline() {
        let mut args = issue_args();
        args.content_hash = Some(CONTENT_HASH.to_string());
        let result = builder().build_issue(&args).unwrap();
        // reserve for the overflow output stays in change when unused
        assert_eq!(result.tx.output.len(), 3);
        let payload = decode_commitment(&result.tx).unwrap().unwrap();
        assert_eq!(payload.content_hash, Some(hex::decode(CONTENT_HASH).unwrap()));
    }

    #[test]
    fn test_issue_content_hash_overflow() {
        let mut args = issue_args();
        args.content_hash = Some(CONTENT_HASH.to_string());
        args.transfer = (0..21).map(|_| to_address(HOLDER_ADDRESS, 1)).collect();
        let result = builder().build_issue(&args).unwrap();
        let tx = &result.tx;

        // overflow output first, then 21 transfers, commitment, change, remainder
        assert_eq!(tx.output.len(), 25);
        assert_eq!(tx.output[0].value.to_sat(), 5741);
        assert_eq!(tx.output[22].value.to_sat(), AGGREGATABLE_ISSUANCE_VALUE);
        assert_eq!(result.colored_output_indexes.first(), Some(&1));
        assert_eq!(result.colored_output_indexes.last(), Some(&24));

        let payload = decode_commitment(tx).unwrap().unwrap();
        assert_eq!(payload.content_hash, Some(hex::decode(CONTENT_HASH).unwrap()));
        assert_eq!(payload.payments[0].output, Some(1));
        assert_eq!(payload.payments[20].output, Some(21));
        assert_eq!(value_in(&[&issue_utxo()]) - value_out(tx), 10_000);
    }

    #[test]
    fn test_issue_overflow_disabled() {
        let config = wienasset_core::BuilderConfig {
            write_multisig: false,
            ..Default::default()
        };
        let builder = AssetTxBuilder::new(config).unwrap();
        let mut args = issue_args();
        args.content_hash = Some(CONTENT_HASH.to_string());
        args.transfer = (0..21).map(|_| to_address(HOLDER_ADDRESS, 1)).collect();
        let err = builder.build_issue(&args).unwrap_err();
        assert!(matches!(err, BuildError::OverflowDisabled));
    }

    #[test]
    fn test_issue_is_deterministic() {
        let a = builder().build_issue(&issue_args()).unwrap();
        let b = builder().build_issue(&issue_args()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_issue_inject_previous_output() {
        let mut args = issue_args();
        args.flags.inject_previous_output = true;
        let result = builder().build_issue(&args).unwrap();
        assert_eq!(
            hex::encode(result.tx.input[0].script_sig.as_bytes()),
            issue_utxo().script_pub_key.hex
        );

        let plain = builder().build_issue(&issue_args()).unwrap();
        assert!(plain.tx.input[0].script_sig.is_empty());
    }
}
