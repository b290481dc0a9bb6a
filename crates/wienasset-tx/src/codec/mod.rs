//! Commitment payload codec
//!
//! The commitment output carries a compact binary payload:
//! - protocol marker, version and opcode
//! - issuance header (amount, divisibility, lock status, aggregation policy)
//! - payment descriptors packed back-to-back with no length prefix
//!
//! Decoders share a [`ByteReader`] so each piece consumes exactly the bytes it
//! occupies.

pub mod amount;
pub mod payload;
pub mod payment;

pub use amount::{decode_amount, encode_amount};
pub use payload::{
    Decoded, Encoded, IssuanceHeader, Payload, PayloadKind, MAX_HASH_LEN, MIN_HASH_LEN,
};
pub use payment::{
    decode_payment, decode_payments, decode_payments_to_end, encode_payment, encode_payments,
    Payment, BURN_OUTPUT, MAX_OUTPUT, MAX_SHORT_OUTPUT,
};

/// Errors raised while encoding descriptors or payloads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("Needs amount value")]
    MissingAmount,

    #[error("Needs output value")]
    MissingOutput,

    #[error("Received both burn and output")]
    BurnWithOutput,

    #[error("Received both burn and range")]
    BurnWithRange,

    #[error("Received range and output values reserved to represent burn (to indicate burn use burn flag)")]
    ReservedBurnOutput,

    #[error("Output can't be negative: {0}")]
    NegativeOutput(i32),

    #[error("Output value is out of bounds: {0}")]
    OutputOutOfBounds(i32),

    #[error("Amount {0} cannot be represented in the amount code")]
    AmountTooLarge(u64),

    #[error("Content hash must be 32 to 40 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("Divisibility must be between 0 and 7, got {0}")]
    InvalidDivisibility(u8),

    #[error("Burn payments are not allowed in an issuance")]
    BurnInIssuance,

    #[error("Payload of {size} bytes exceeds the {max} byte commitment capacity")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Errors raised while decoding descriptors or payloads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Unexpected end of payload: need {needed} bytes, have {available}")]
    UnexpectedEnd { needed: usize, available: usize },

    #[error("Unknown protocol marker 0x{0:04x}")]
    BadProtocolMarker(u16),

    #[error("Unsupported payload version 0x{0:02x}")]
    UnsupportedVersion(u8),

    #[error("Unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("Decoded amount overflows 64 bits")]
    AmountOverflow,

    #[error("Invalid issuance flags byte 0x{0:02x}")]
    InvalidFlags(u8),

    #[error("Invalid content hash length {0}")]
    InvalidHashLength(usize),
}

/// Forward-only cursor over an encoded payload
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Result<u8, DecodeError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEnd {
                needed: 1,
                available: 0,
            })
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Consume exactly `len` bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEnd {
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}
