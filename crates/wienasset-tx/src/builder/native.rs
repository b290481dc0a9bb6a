//! Plain currency send

use bitcoin::TxOut;

use super::{
    checked_sum, output_total, require_positive, AssemblyResult, AssetTxBuilder, SendNativeArgs,
};
use crate::error::BuildError;
use crate::selector::{select_currency_inputs, InputSet};

impl AssetTxBuilder {
    /// Build a currency-only transaction. Asset-bearing outputs are never
    /// spent, so no units can be lost.
    pub fn build_send_native(&self, args: &SendNativeArgs) -> Result<AssemblyResult, BuildError> {
        if args.utxos.is_empty() {
            return Err(BuildError::MissingArgument("utxos"));
        }
        if args.to.is_empty() {
            return Err(BuildError::MissingArgument("to"));
        }
        let fee = args.fee.unwrap_or(self.config.default_fee);

        let mut outputs: Vec<TxOut> = Vec::with_capacity(args.to.len() + 1);
        for payment in &args.to {
            let address = payment
                .address
                .as_deref()
                .ok_or(BuildError::MissingArgument("address"))?;
            let amount = require_positive(
                "amount",
                payment.amount.ok_or(BuildError::MissingArgument("amount"))?,
            )?;
            outputs.push(self.value_output(address, amount)?);
        }

        let needed = checked_sum([output_total(&outputs)?, fee])?;
        let mut inputs = InputSet::new();
        select_currency_inputs(&args.utxos, needed, &mut inputs)?;

        let change = inputs.total_value - needed;
        if change > 0 {
            let change_address = args
                .finance_change_address
                .as_deref()
                .or(args.from.as_deref())
                .or_else(|| args.utxos.first().and_then(|u| u.first_address()))
                .ok_or(BuildError::MissingArgument("from"))?;
            outputs.push(self.value_output(change_address, change)?);
        }

        tracing::debug!(needed, change, "built currency send");
        self.finish(&inputs, outputs, &args.flags, None, Vec::new(), Vec::new())
    }
}
