//! Payment descriptors
//!
//! A descriptor moves a quantity of asset units to an output (or burns them).
//! The first byte is `skip | range | percent | output(5)`. With `range` set the
//! output index grows to 13 bits and spills into a second byte. The amount
//! follows in the significant-figures code.
//!
//! Output 31 without `range` is reserved for burns.

use super::amount::{decode_amount, encode_amount};
use super::{ByteReader, DecodeError, EncodeError};

/// Output index that marks a burn in the short form
pub const BURN_OUTPUT: i32 = 31;

/// Largest output index writable in one byte
pub const MAX_SHORT_OUTPUT: i32 = 31;

/// Largest output index writable in the two-byte range form
pub const MAX_OUTPUT: i32 = 8191;

const SKIP_BIT: u8 = 0x80;
const RANGE_BIT: u8 = 0x40;
const PERCENT_BIT: u8 = 0x20;
const OUTPUT_MASK: u8 = 0x1f;

/// One asset movement instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Payment {
    pub skip: bool,
    pub range: bool,
    pub percent: bool,
    pub burn: bool,
    pub output: Option<i32>,
    pub amount: Option<u64>,
}

impl Payment {
    /// Send `amount` units to `output`, switching to the range form when the
    /// index does not fit the short form.
    pub fn to_output(output: i32, amount: u64) -> Self {
        Self {
            range: output >= MAX_SHORT_OUTPUT,
            output: Some(output),
            amount: Some(amount),
            ..Self::default()
        }
    }

    /// Burn `amount` units
    pub fn burning(amount: u64) -> Self {
        Self {
            burn: true,
            amount: Some(amount),
            ..Self::default()
        }
    }

    /// Move the target one output later. Burns are untouched.
    pub fn shift(&mut self) {
        if let Some(output) = self.output.as_mut() {
            *output += 1;
            if *output >= MAX_SHORT_OUTPUT {
                self.range = true;
            }
        }
    }
}

/// Encode one descriptor
pub fn encode_payment(payment: &Payment) -> Result<Vec<u8>, EncodeError> {
    let amount = payment.amount.ok_or(EncodeError::MissingAmount)?;
    if payment.output.is_none() && !payment.burn {
        return Err(EncodeError::MissingOutput);
    }
    if payment.burn && payment.output.is_some() {
        return Err(EncodeError::BurnWithOutput);
    }
    if payment.burn && payment.range {
        return Err(EncodeError::BurnWithRange);
    }

    let output = match payment.output {
        Some(output) => {
            if !payment.range && output == BURN_OUTPUT {
                return Err(EncodeError::ReservedBurnOutput);
            }
            output
        }
        None => BURN_OUTPUT,
    };
    if output < 0 {
        return Err(EncodeError::NegativeOutput(output));
    }
    let limit = if payment.range { MAX_OUTPUT } else { MAX_SHORT_OUTPUT };
    if output > limit {
        return Err(EncodeError::OutputOutOfBounds(output));
    }

    let mut flags = 0u8;
    if payment.skip {
        flags |= SKIP_BIT;
    }
    if payment.range {
        flags |= RANGE_BIT;
    }
    if payment.percent {
        flags |= PERCENT_BIT;
    }

    // output fits 13 bits here
    let output = output as u16;
    let mut bytes = if payment.range {
        vec![flags | (output >> 8) as u8, (output & 0xff) as u8]
    } else {
        vec![flags | output as u8]
    };
    bytes.extend(encode_amount(amount)?);
    Ok(bytes)
}

/// Decode one descriptor
pub fn decode_payment(reader: &mut ByteReader<'_>) -> Result<Payment, DecodeError> {
    let first = reader.read_u8()?;
    let range = first & RANGE_BIT != 0;
    let output = if range {
        let low = reader.read_u8()?;
        (i32::from(first & OUTPUT_MASK) << 8) | i32::from(low)
    } else {
        i32::from(first & OUTPUT_MASK)
    };
    let amount = decode_amount(reader)?;
    let burn = !range && output == BURN_OUTPUT;

    Ok(Payment {
        skip: first & SKIP_BIT != 0,
        range,
        percent: first & PERCENT_BIT != 0,
        burn,
        output: (!burn).then_some(output),
        amount: Some(amount),
    })
}

/// Concatenate the encodings of several descriptors
pub fn encode_payments(payments: &[Payment]) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    for payment in payments {
        bytes.extend(encode_payment(payment)?);
    }
    Ok(bytes)
}

/// Decode exactly `count` descriptors
pub fn decode_payments(
    reader: &mut ByteReader<'_>,
    count: usize,
) -> Result<Vec<Payment>, DecodeError> {
    (0..count).map(|_| decode_payment(reader)).collect()
}

/// Decode descriptors until the input is exhausted
pub fn decode_payments_to_end(reader: &mut ByteReader<'_>) -> Result<Vec<Payment>, DecodeError> {
    let mut payments = Vec::new();
    while !reader.is_empty() {
        payments.push(decode_payment(reader)?);
    }
    Ok(payments)
}
