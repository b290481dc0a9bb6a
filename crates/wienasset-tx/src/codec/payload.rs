//! Commitment payload
//!
//! ```text
//! marker(2) version(1) opcode(1) [hash_len(1) hash] [amount flags] payments...
//! ```
//!
//! The opcode high nibble is the transaction type, the low nibble says where
//! the content hash lives. When the inline form does not fit, the hash moves
//! out into the overflow output and is returned as a leftover chunk.

use wienasset_core::constants::{MAX_DIVISIBILITY, PROTOCOL_MARKER, PROTOCOL_VERSION};
use wienasset_core::AggregationPolicy;

use super::amount::{decode_amount, encode_amount};
use super::payment::{decode_payments_to_end, encode_payments, Payment};
use super::{ByteReader, DecodeError, EncodeError};

const TYPE_ISSUANCE: u8 = 0x00;
const TYPE_TRANSFER: u8 = 0x10;
const TYPE_BURN: u8 = 0x20;

const HASH_INLINE: u8 = 0x01;
const HASH_OVERFLOW: u8 = 0x02;
const HASH_ABSENT: u8 = 0x05;

pub const MIN_HASH_LEN: usize = 32;
pub const MAX_HASH_LEN: usize = 40;

const POLICY_AGGREGATABLE: u8 = 0b00;
const POLICY_NON_AGGREGATABLE: u8 = 0b10;

/// Issuance-only header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuanceHeader {
    pub amount: u64,
    pub divisibility: u8,
    pub lock_status: bool,
    pub aggregation_policy: AggregationPolicy,
}

impl IssuanceHeader {
    fn flags(&self) -> u8 {
        let policy = match self.aggregation_policy {
            AggregationPolicy::Aggregatable => POLICY_AGGREGATABLE,
            AggregationPolicy::NonAggregatable => POLICY_NON_AGGREGATABLE,
        };
        (self.divisibility << 5) | (u8::from(self.lock_status) << 4) | (policy << 2)
    }

    fn from_flags(amount: u64, flags: u8) -> Result<Self, DecodeError> {
        let aggregation_policy = match (flags >> 2) & 0b11 {
            POLICY_AGGREGATABLE => AggregationPolicy::Aggregatable,
            POLICY_NON_AGGREGATABLE => AggregationPolicy::NonAggregatable,
            _ => return Err(DecodeError::InvalidFlags(flags)),
        };
        Ok(Self {
            amount,
            divisibility: flags >> 5,
            lock_status: flags & 0x10 != 0,
            aggregation_policy,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Issuance(IssuanceHeader),
    Transfer,
    Burn,
}

impl PayloadKind {
    fn type_code(&self) -> u8 {
        match self {
            Self::Issuance(_) => TYPE_ISSUANCE,
            Self::Transfer => TYPE_TRANSFER,
            Self::Burn => TYPE_BURN,
        }
    }
}

/// Logical content of a commitment output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub kind: PayloadKind,
    pub content_hash: Option<Vec<u8>>,
    pub payments: Vec<Payment>,
}

/// Encoder output: the commitment bytes plus chunks that go to the overflow
/// output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub code: Vec<u8>,
    pub leftover: Vec<Vec<u8>>,
}

/// Decoder output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub payload: Payload,
    /// The opcode says the content hash sits in the overflow output
    pub hash_in_overflow: bool,
}

impl Payload {
    pub fn issuance(header: IssuanceHeader, payments: Vec<Payment>) -> Self {
        Self {
            kind: PayloadKind::Issuance(header),
            content_hash: None,
            payments,
        }
    }

    /// Transfer payload, typed as a burn when any payment burns
    pub fn transfer(payments: Vec<Payment>) -> Self {
        let kind = if payments.iter().any(|p| p.burn) {
            PayloadKind::Burn
        } else {
            PayloadKind::Transfer
        };
        Self {
            kind,
            content_hash: None,
            payments,
        }
    }

    pub fn with_content_hash(mut self, hash: Option<Vec<u8>>) -> Self {
        self.content_hash = hash;
        self
    }

    /// Advance every output index by one, used when an output is inserted at
    /// the front of the transaction.
    pub fn shift_outputs(&mut self) {
        self.payments.iter_mut().for_each(Payment::shift);
    }

    fn validate(&self) -> Result<(), EncodeError> {
        if let PayloadKind::Issuance(header) = &self.kind {
            if header.divisibility > MAX_DIVISIBILITY {
                return Err(EncodeError::InvalidDivisibility(header.divisibility));
            }
            if self.payments.iter().any(|p| p.burn) {
                return Err(EncodeError::BurnInIssuance);
            }
        }
        if let Some(hash) = &self.content_hash {
            if !(MIN_HASH_LEN..=MAX_HASH_LEN).contains(&hash.len()) {
                return Err(EncodeError::InvalidHashLength(hash.len()));
            }
        }
        Ok(())
    }

    fn write(&self, hash_mode: u8, payments: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut code = Vec::with_capacity(8 + payments.len());
        code.extend_from_slice(&PROTOCOL_MARKER.to_be_bytes());
        code.push(PROTOCOL_VERSION);
        code.push(self.kind.type_code() | hash_mode);

        if hash_mode == HASH_INLINE {
            if let Some(hash) = &self.content_hash {
                code.push(hash.len() as u8);
                code.extend_from_slice(hash);
            }
        }
        if let PayloadKind::Issuance(header) = &self.kind {
            code.extend(encode_amount(header.amount)?);
            code.push(header.flags());
        }
        code.extend_from_slice(payments);
        Ok(code)
    }

    /// Encode into at most `max_size` bytes, moving the content hash to a
    /// leftover chunk if needed.
    pub fn encode(&self, max_size: usize) -> Result<Encoded, EncodeError> {
        self.validate()?;
        let payments = encode_payments(&self.payments)?;

        let (code, leftover) = match &self.content_hash {
            None => (self.write(HASH_ABSENT, &payments)?, Vec::new()),
            Some(hash) => {
                let inline = self.write(HASH_INLINE, &payments)?;
                if inline.len() <= max_size {
                    (inline, Vec::new())
                } else {
                    (self.write(HASH_OVERFLOW, &payments)?, vec![hash.clone()])
                }
            }
        };

        if code.len() > max_size {
            return Err(EncodeError::PayloadTooLarge {
                size: code.len(),
                max: max_size,
            });
        }
        Ok(Encoded { code, leftover })
    }

    pub fn decode(bytes: &[u8]) -> Result<Decoded, DecodeError> {
        let mut reader = ByteReader::new(bytes);

        let marker = reader.take(2)?;
        let marker = u16::from_be_bytes([marker[0], marker[1]]);
        if marker != PROTOCOL_MARKER {
            return Err(DecodeError::BadProtocolMarker(marker));
        }
        let version = reader.read_u8()?;
        if version != PROTOCOL_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let opcode = reader.read_u8()?;
        let hash_mode = opcode & 0x0f;
        if !matches!(hash_mode, HASH_INLINE | HASH_OVERFLOW | HASH_ABSENT) {
            return Err(DecodeError::UnknownOpcode(opcode));
        }
        let type_code = opcode & 0xf0;
        if !matches!(type_code, TYPE_ISSUANCE | TYPE_TRANSFER | TYPE_BURN) {
            return Err(DecodeError::UnknownOpcode(opcode));
        }

        let content_hash = if hash_mode == HASH_INLINE {
            let len = usize::from(reader.read_u8()?);
            if !(MIN_HASH_LEN..=MAX_HASH_LEN).contains(&len) {
                return Err(DecodeError::InvalidHashLength(len));
            }
            Some(reader.take(len)?.to_vec())
        } else {
            None
        };

        let kind = match type_code {
            TYPE_ISSUANCE => {
                let amount = decode_amount(&mut reader)?;
                let flags = reader.read_u8()?;
                PayloadKind::Issuance(IssuanceHeader::from_flags(amount, flags)?)
            }
            TYPE_TRANSFER => PayloadKind::Transfer,
            _ => PayloadKind::Burn,
        };

        let payments = decode_payments_to_end(&mut reader)?;
        Ok(Decoded {
            payload: Payload {
                kind,
                content_hash,
                payments,
            },
            hash_in_overflow: hash_mode == HASH_OVERFLOW,
        })
    }
}
