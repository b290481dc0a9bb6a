//! Transaction assembly errors

use wienasset_core::{AssetId, ErrorClass, Satoshi};

use crate::address::AddressError;
use crate::asset_id::AssetIdError;
use crate::codec::EncodeError;
use crate::commitment::CommitmentError;
use crate::multisig::MultisigError;
use crate::selector::SelectionError;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Must have \"{0}\"")]
    MissingArgument(&'static str),

    #[error("Invalid \"{name}\": {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Attempting to transfer {requested} units, more than the {issued} issued")]
    ExceedsIssuedAmount { requested: u64, issued: u64 },

    #[error("Payload still overflows after shifting outputs")]
    OverflowAfterShift,

    #[error("Payload needs an overflow output but multisig writing is disabled")]
    OverflowDisabled,

    #[error("Not enough currency to cover asset issuance: need {required}, have {available}")]
    InsufficientIssuanceFunds {
        required: Satoshi,
        available: Satoshi,
    },

    #[error("Not enough currency to cover the transaction fee: need {required}, missing {missing}")]
    InsufficientFee { required: Satoshi, missing: Satoshi },

    #[error("No output with the requested asset: {0}")]
    AssetNotFound(AssetId),

    #[error("Not enough units of asset {asset_id} to cover transfer: need {required}, have {available}")]
    InsufficientAsset {
        asset_id: AssetId,
        required: u64,
        available: u64,
    },

    #[error("Output {txid}:{index} is already spent")]
    AlreadySpent { txid: String, index: u32 },

    #[error("Output {0} carries assets and cannot fund plain currency")]
    ColoredFunding(String),

    #[error("Amount overflows 64 bits")]
    AmountOverflow,

    #[error(transparent)]
    Config(#[from] wienasset_core::Error),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Multisig(#[from] MultisigError),

    #[error(transparent)]
    AssetId(#[from] AssetIdError),
}

impl From<SelectionError> for BuildError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::InsufficientCurrency {
                required,
                available,
            } => Self::InsufficientFee {
                required,
                missing: required.saturating_sub(available),
            },
            SelectionError::AssetNotFound(asset_id) => Self::AssetNotFound(asset_id),
            SelectionError::InsufficientAsset {
                asset_id,
                required,
                available,
            } => Self::InsufficientAsset {
                asset_id,
                required,
                available,
            },
            SelectionError::AlreadySpent { txid, index } => Self::AlreadySpent { txid, index },
            SelectionError::AmountOverflow => Self::AmountOverflow,
        }
    }
}

impl BuildError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingArgument(_)
            | Self::InvalidArgument { .. }
            | Self::Config(_)
            | Self::Address(_)
            | Self::Multisig(_)
            | Self::AssetId(_) => ErrorClass::Validation,
            Self::ExceedsIssuedAmount { .. }
            | Self::OverflowAfterShift
            | Self::OverflowDisabled
            | Self::AmountOverflow
            | Self::Commitment(_) => ErrorClass::Capacity,
            Self::Encode(err) => match err {
                EncodeError::PayloadTooLarge { .. } | EncodeError::AmountTooLarge(_) => {
                    ErrorClass::Capacity
                }
                _ => ErrorClass::Validation,
            },
            Self::InsufficientIssuanceFunds { .. }
            | Self::InsufficientFee { .. }
            | Self::AssetNotFound(_)
            | Self::InsufficientAsset { .. } => ErrorClass::Funding,
            Self::AlreadySpent { .. } | Self::ColoredFunding(_) => ErrorClass::Integrity,
        }
    }
}
