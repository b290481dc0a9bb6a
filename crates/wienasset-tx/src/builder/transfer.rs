//! Asset transfer and burn

use bitcoin::TxOut;
use wienasset_core::AssetId;

use super::{
    colored_outputs, fee_error, parse_content_hash, require_positive, required_for,
    AssemblyResult, AssetTxBuilder, BurnArgs, MultisigOutput, TransferArgs, TransferRecipient,
};
use crate::codec::{Payload, Payment};
use crate::error::BuildError;
use crate::selector::{
    select_asset_inputs, select_fee_inputs, AssetAllocation, Destination, InputSet, Target,
};

impl AssetTxBuilder {
    /// Build a transfer of existing units.
    ///
    /// Output layout: `[overflow?] destinations.. commitment [currency change] last`.
    /// Units left on the spent inputs follow the protocol's default and land
    /// on the last output, which then pays the colored change address.
    pub fn build_transfer(&self, args: &TransferArgs) -> Result<AssemblyResult, BuildError> {
        if args.to.is_empty() {
            return Err(BuildError::MissingArgument("to"));
        }
        self.assemble_transfer(args, &args.to)
    }

    /// Build a transfer that destroys units. Plain `to` recipients are kept
    /// and the burns follow them.
    pub fn build_burn(&self, args: &BurnArgs) -> Result<AssemblyResult, BuildError> {
        if args.burn.is_empty() {
            return Err(BuildError::MissingArgument("burn"));
        }
        let mut to = args.transfer.to.clone();
        to.extend(args.burn.iter().map(TransferRecipient::from));
        self.assemble_transfer(&args.transfer, &to)
    }

    fn assemble_transfer(
        &self,
        args: &TransferArgs,
        to: &[TransferRecipient],
    ) -> Result<AssemblyResult, BuildError> {
        if args.utxos.is_empty() {
            return Err(BuildError::MissingArgument("utxos"));
        }
        let fee = args.fee.unwrap_or(self.config.default_fee);
        let content_hash = parse_content_hash(args.content_hash.as_deref())?;
        let from = args
            .from
            .clone()
            .or_else(|| args.utxos.first().and_then(|u| u.first_address()).map(str::to_string));

        // Group destinations per asset, creating outputs in request order
        let mut allocations: Vec<AssetAllocation> = Vec::new();
        let mut slots: Vec<Vec<Option<u32>>> = Vec::new();
        let mut outputs: Vec<TxOut> = Vec::new();
        let mut multisig = Vec::new();
        for recipient in to {
            let asset_id = recipient
                .asset_id
                .clone()
                .ok_or(BuildError::MissingArgument("assetId"))?;
            let amount = require_positive(
                "amount",
                recipient.amount.ok_or(BuildError::MissingArgument("amount"))?,
            )?;

            let (destination, slot) = if recipient.burn {
                let destination = Destination {
                    target: Target::Burn,
                    amount,
                    redeem_script: None,
                };
                (destination, None)
            } else {
                let (address, redeem_script) = self.resolve_recipient(
                    recipient.address.as_deref(),
                    recipient.pub_keys.as_deref(),
                    recipient.m,
                )?;
                let index = outputs.len() as u32;
                outputs.push(self.dust_output(&address)?);
                if let Some(redeem_script) = &redeem_script {
                    multisig.push(MultisigOutput {
                        index,
                        redeem_script: redeem_script.clone(),
                        address: address.clone(),
                    });
                }
                let destination = Destination {
                    target: Target::Address(address),
                    amount,
                    redeem_script,
                };
                (destination, Some(index))
            };

            let position = match allocations.iter().position(|a| a.asset_id == asset_id) {
                Some(position) => position,
                None => {
                    allocations.push(AssetAllocation::new(asset_id));
                    slots.push(Vec::new());
                    allocations.len() - 1
                }
            };
            allocations[position].add_destination(destination)?;
            slots[position].push(slot);
        }

        let mut inputs = InputSet::new();
        for allocation in allocations.iter_mut() {
            select_asset_inputs(&args.utxos, allocation, &mut inputs)?;
        }

        let mut sourced = Vec::new();
        for (position, (allocation, slots)) in allocations.iter_mut().zip(&slots).enumerate() {
            pay_allocation(position, allocation, slots, &mut sourced)?;
        }
        let payments = chain_payments(sourced, &allocations);
        let colored_change = has_colored_change(&allocations, &inputs);

        let mut payload = Payload::transfer(payments).with_content_hash(content_hash);
        self.attach_commitment(&mut payload, &mut outputs, &mut multisig, 0)?;
        let mut colored = colored_outputs(&payload.payments);

        // Fee top-up once every output but the last is known
        let dust = self.dust();
        let required = required_for(&outputs, fee, dust)?;
        if inputs.total_value < required {
            let shortfall = required - inputs.total_value;
            tracing::debug!(required, shortfall, "topping up currency for fee");
            select_fee_inputs(
                &args.utxos,
                args.finance_output.as_ref(),
                shortfall,
                &mut inputs,
            )
            .map_err(|e| fee_error(e, required, shortfall))?;
        }
        let change = self.settle_change(&inputs, &outputs, fee)?;

        let currency_address = args.finance_change_address.as_deref().or(from.as_deref());
        if colored_change {
            let colored_address = args
                .colored_change_address
                .as_deref()
                .or(from.as_deref())
                .ok_or(BuildError::MissingArgument("from"))?;
            let mut last_value = change;
            if change >= 2 * dust {
                let currency_address =
                    currency_address.ok_or(BuildError::MissingArgument("from"))?;
                outputs.push(self.value_output(currency_address, change - dust)?);
                last_value = dust;
            }
            colored.push(outputs.len() as u32);
            outputs.push(self.value_output(colored_address, last_value)?);
        } else {
            let currency_address = currency_address.ok_or(BuildError::MissingArgument("from"))?;
            outputs.push(self.value_output(currency_address, change)?);
        }

        tracing::debug!(
            assets = allocations.len(),
            change,
            colored_change,
            "built transfer"
        );
        self.finish(&inputs, outputs, &args.flags, None, multisig, colored)
    }
}

/// A payment and the input whose units it spends
#[derive(Debug, Clone, Copy)]
struct SourcedPayment {
    input_index: usize,
    allocation: usize,
    payment: Payment,
}

/// Walk an allocation's destinations against its inputs in selection order,
/// splitting a destination across inputs where one does not cover it.
fn pay_allocation(
    position: usize,
    allocation: &mut AssetAllocation,
    slots: &[Option<u32>],
    sourced: &mut Vec<SourcedPayment>,
) -> Result<(), BuildError> {
    let mut cursor = 0;
    let mut paid: u64 = 0;
    for (destination, slot) in allocation.destinations.iter().zip(slots) {
        let mut owed = destination.amount;
        while owed > 0 {
            let share = allocation
                .inputs
                .get_mut(cursor)
                .ok_or_else(|| BuildError::InsufficientAsset {
                    asset_id: allocation.asset_id.clone(),
                    required: allocation.amount,
                    available: paid,
                })?;
            if share.remaining == 0 {
                cursor += 1;
                continue;
            }
            let take = owed.min(share.remaining);
            share.remaining -= take;
            owed -= take;
            paid += take;
            sourced.push(SourcedPayment {
                input_index: share.input_index,
                allocation: position,
                payment: match slot {
                    Some(index) => Payment::to_output(*index as i32, take),
                    None => Payment::burning(take),
                },
            });
            tracing::trace!(
                asset_id = %allocation.asset_id,
                input = share.input_index,
                take,
                "payment"
            );
        }
    }
    Ok(())
}

/// Order payments by the input they spend and mark `skip` wherever the next
/// payment moves to a later input while the current one still holds units of
/// the asset just paid. Those units stay for the last output.
fn chain_payments(
    mut sourced: Vec<SourcedPayment>,
    allocations: &[AssetAllocation],
) -> Vec<Payment> {
    // stable, so a destination split across inputs keeps its order
    sourced.sort_by_key(|p| p.input_index);
    for i in 1..sourced.len() {
        let current = sourced[i - 1];
        let left = allocations[current.allocation]
            .inputs
            .iter()
            .filter(|share| share.input_index == current.input_index)
            .any(|share| share.remaining > 0);
        if sourced[i].input_index > current.input_index && left {
            sourced[i - 1].payment.skip = true;
        }
    }
    sourced.into_iter().map(|p| p.payment).collect()
}

/// Units left behind on the inputs: unspent remainder of a requested asset,
/// or any asset on an input that no allocation drew from.
fn has_colored_change(allocations: &[AssetAllocation], inputs: &InputSet) -> bool {
    if allocations.iter().any(|a| a.change > 0) {
        return true;
    }
    inputs.inputs.iter().enumerate().any(|(position, input)| {
        input
            .asset_ids
            .iter()
            .any(|asset_id| !draws_from(allocations, asset_id, position))
    })
}

fn draws_from(allocations: &[AssetAllocation], asset_id: &AssetId, position: usize) -> bool {
    allocations
        .iter()
        .filter(|a| &a.asset_id == asset_id)
        .any(|a| a.inputs.iter().any(|share| share.input_index == position))
}
