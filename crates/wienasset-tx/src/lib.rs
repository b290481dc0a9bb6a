//! wienasset-tx: Colored-coin transaction assembly for WienChain
//!
//! Builds unsigned issuance, transfer, burn and plain currency transactions.
//! Asset movements are committed in an `OP_RETURN` payload; metadata that
//! does not fit is carried by a 1-of-2 multisig overflow output.

pub mod address;
pub mod asset_id;
pub mod builder;
pub mod codec;
pub mod commitment;
pub mod error;
pub mod multisig;
pub mod selector;

pub use address::{address_to_script, AddressError};
pub use asset_id::{derive_asset_id, AssetIdError, AssetIdInput};
pub use builder::{
    AssemblyResult, AssetTxBuilder, BuildFlags, BurnArgs, BurnRequest, IssueArgs, IssueRecipient,
    MultisigOutput, NativePayment, SendNativeArgs, TransferArgs, TransferRecipient,
};
pub use codec::{DecodeError, EncodeError, Payload, PayloadKind, Payment};
pub use commitment::{decode_commitment, CommitmentError};
pub use error::BuildError;
pub use multisig::{multisig_destination, MultisigDestination, MultisigError};
pub use selector::SelectionError;
