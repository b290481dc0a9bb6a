//! UTXO selection
//!
//! Greedy, caller-order selection of inputs for issuance funding, asset
//! transfers and fee top-ups. Candidates are never reordered so identical
//! requests select identical inputs.

use std::fmt;

use wienasset_core::{AssetId, Satoshi, Utxo};

// =============================================================================
// Error type
// =============================================================================

/// Error returned when selection cannot satisfy a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    InsufficientCurrency {
        required: Satoshi,
        available: Satoshi,
    },
    AssetNotFound(AssetId),
    InsufficientAsset {
        asset_id: AssetId,
        required: u64,
        available: u64,
    },
    AlreadySpent {
        txid: String,
        index: u32,
    },
    AmountOverflow,
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::InsufficientCurrency {
                required,
                available,
            } => write!(
                f,
                "Not enough currency: need {} satoshi, found {}",
                required, available
            ),
            SelectionError::AssetNotFound(asset_id) => {
                write!(f, "No output with the requested asset: {}", asset_id)
            }
            SelectionError::InsufficientAsset {
                asset_id,
                required,
                available,
            } => write!(
                f,
                "Not enough units of asset {} to cover transfer: need {}, have {}",
                asset_id, required, available
            ),
            SelectionError::AlreadySpent { txid, index } => {
                write!(f, "Output {}:{} is already spent", txid, index)
            }
            SelectionError::AmountOverflow => write!(f, "Amount overflows 64 bits"),
        }
    }
}

impl std::error::Error for SelectionError {}

// =============================================================================
// Selected inputs
// =============================================================================

/// One selected input, in transaction order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedInput {
    pub txid: String,
    pub index: u32,
    pub value: Satoshi,
    pub script_hex: String,
    /// Assets carried by the spent output
    pub asset_ids: Vec<AssetId>,
}

impl From<&Utxo> for SelectedInput {
    fn from(utxo: &Utxo) -> Self {
        Self {
            txid: utxo.txid.clone(),
            index: utxo.index,
            value: utxo.value,
            script_hex: utxo.script_pub_key.hex.clone(),
            asset_ids: utxo.assets.iter().map(|a| a.asset_id.clone()).collect(),
        }
    }
}

/// Inputs chosen so far and their total value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSet {
    pub inputs: Vec<SelectedInput>,
    pub total_value: Satoshi,
}

impl InputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn position(&self, txid: &str, index: u32) -> Option<usize> {
        self.inputs
            .iter()
            .position(|i| i.txid == txid && i.index == index)
    }

    pub fn contains(&self, txid: &str, index: u32) -> bool {
        self.position(txid, index).is_some()
    }

    /// Append an output as the next input and return its position
    pub fn push(&mut self, utxo: &Utxo) -> Result<usize, SelectionError> {
        self.total_value = self
            .total_value
            .checked_add(utxo.value)
            .ok_or(SelectionError::AmountOverflow)?;
        self.inputs.push(SelectedInput::from(utxo));
        Ok(self.inputs.len() - 1)
    }
}

// =============================================================================
// Asset allocation state
// =============================================================================

/// Where a quantity of asset units goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Address(String),
    Burn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub target: Target,
    pub amount: u64,
    /// Set when the address pays a multisig redeem script
    pub redeem_script: Option<String>,
}

/// Units of the asset an input still has to hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShare {
    pub input_index: usize,
    pub remaining: u64,
}

/// Per-asset bookkeeping for a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAllocation {
    pub asset_id: AssetId,
    pub amount: u64,
    pub destinations: Vec<Destination>,
    pub inputs: Vec<InputShare>,
    pub done: bool,
    pub change: u64,
}

impl AssetAllocation {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            amount: 0,
            destinations: Vec::new(),
            inputs: Vec::new(),
            done: false,
            change: 0,
        }
    }

    pub fn add_destination(&mut self, destination: Destination) -> Result<(), SelectionError> {
        self.amount = self
            .amount
            .checked_add(destination.amount)
            .ok_or(SelectionError::AmountOverflow)?;
        self.destinations.push(destination);
        Ok(())
    }
}

// =============================================================================
// Selection functions
// =============================================================================

fn is_free_currency(utxo: &Utxo, inputs: &InputSet) -> bool {
    !utxo.used && !utxo.has_assets() && !inputs.contains(&utxo.txid, utxo.index)
}

/// Add asset-free outputs, in order, until they contribute at least `amount`.
///
/// Returns the value added.
pub fn select_currency_inputs(
    utxos: &[Utxo],
    amount: Satoshi,
    inputs: &mut InputSet,
) -> Result<Satoshi, SelectionError> {
    let mut added: Satoshi = 0;
    for utxo in utxos {
        if added >= amount {
            break;
        }
        if !is_free_currency(utxo, inputs) {
            tracing::trace!(outpoint = %utxo.outpoint(), "skipping output for currency");
            continue;
        }
        inputs.push(utxo)?;
        added = added
            .checked_add(utxo.value)
            .ok_or(SelectionError::AmountOverflow)?;
    }

    if added < amount {
        return Err(SelectionError::InsufficientCurrency {
            required: amount,
            available: added,
        });
    }
    tracing::debug!(amount, added, inputs = inputs.len(), "selected currency inputs");
    Ok(added)
}

/// Fund an issuance; the first input chosen is returned because it binds the
/// asset identifier.
pub fn select_issuance_inputs(
    utxos: &[Utxo],
    cost: Satoshi,
    inputs: &mut InputSet,
) -> Result<SelectedInput, SelectionError> {
    let start = inputs.len();
    select_currency_inputs(utxos, cost, inputs)?;
    inputs
        .inputs
        .get(start)
        .cloned()
        .ok_or(SelectionError::InsufficientCurrency {
            required: cost,
            available: 0,
        })
}

/// Select inputs holding `allocation.asset_id` until its destinations are
/// covered, recording how many units each input contributes.
pub fn select_asset_inputs(
    utxos: &[Utxo],
    allocation: &mut AssetAllocation,
    inputs: &mut InputSet,
) -> Result<(), SelectionError> {
    let candidates: Vec<&Utxo> = utxos
        .iter()
        .filter(|u| u.holds(&allocation.asset_id))
        .collect();
    if candidates.is_empty() {
        return Err(SelectionError::AssetNotFound(allocation.asset_id.clone()));
    }
    if let Some(spent) = candidates.iter().find(|u| u.used) {
        return Err(SelectionError::AlreadySpent {
            txid: spent.txid.clone(),
            index: spent.index,
        });
    }

    let mut gathered: u64 = 0;
    for utxo in candidates {
        if gathered >= allocation.amount {
            break;
        }
        let existing = inputs.position(&utxo.txid, utxo.index);
        // same outpoint listed twice
        if let Some(position) = existing {
            if allocation.inputs.iter().any(|s| s.input_index == position) {
                tracing::trace!(outpoint = %utxo.outpoint(), "skipping duplicate outpoint");
                continue;
            }
        }
        let units = utxo
            .asset_amount(&allocation.asset_id)
            .ok_or(SelectionError::AmountOverflow)?;
        let input_index = match existing {
            Some(position) => position,
            None => inputs.push(utxo)?,
        };
        allocation.inputs.push(InputShare {
            input_index,
            remaining: units,
        });
        gathered = gathered
            .checked_add(units)
            .ok_or(SelectionError::AmountOverflow)?;
    }

    if gathered < allocation.amount {
        return Err(SelectionError::InsufficientAsset {
            asset_id: allocation.asset_id.clone(),
            required: allocation.amount,
            available: gathered,
        });
    }

    allocation.done = true;
    allocation.change = gathered - allocation.amount;
    tracing::debug!(
        asset_id = %allocation.asset_id,
        required = allocation.amount,
        gathered,
        change = allocation.change,
        "selected asset inputs"
    );
    Ok(())
}

/// Cover a currency shortfall, preferring the caller's finance output.
pub fn select_fee_inputs(
    utxos: &[Utxo],
    finance: Option<&Utxo>,
    shortfall: Satoshi,
    inputs: &mut InputSet,
) -> Result<(), SelectionError> {
    if shortfall == 0 {
        return Ok(());
    }
    if let Some(finance) = finance {
        if is_free_currency(finance, inputs) && finance.value >= shortfall {
            tracing::debug!(outpoint = %finance.outpoint(), shortfall, "funding from finance output");
            inputs.push(finance)?;
            return Ok(());
        }
        tracing::debug!(
            outpoint = %finance.outpoint(),
            value = finance.value,
            shortfall,
            "finance output not usable"
        );
    }
    select_currency_inputs(utxos, shortfall, inputs).map(|_| ())
}
