//! Significant-figures float code for asset amounts
//!
//! An amount is written as `mantissa * 10^exponent`. The top bits of the
//! first byte select the width:
//!
//! ```text
//! bytes  flag  mantissa  exponent
//!   1    000       5         0
//!   2    001       9         4
//!   3    010      17         4
//!   4    011      25         4
//!   5    100      34         3
//!   6    101      42         3
//!   7    11       54         0
//! ```

use super::{ByteReader, DecodeError, EncodeError};

struct Scheme {
    size: usize,
    flag: u64,
    flag_bits: u32,
    mantissa_bits: u32,
    exponent_bits: u32,
}

impl Scheme {
    const fn max_exponent(&self) -> u32 {
        (1 << self.exponent_bits) - 1
    }

    fn pack(&self, mantissa: u64, exponent: u32) -> Vec<u8> {
        let bits = (self.size * 8) as u32;
        let word = (self.flag << (bits - self.flag_bits))
            | (mantissa << self.exponent_bits)
            | u64::from(exponent);
        word.to_be_bytes()[8 - self.size..].to_vec()
    }

    fn unpack(&self, bytes: &[u8]) -> (u64, u32) {
        let word = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        let exponent = word & ((1u64 << self.exponent_bits) - 1);
        let mantissa = (word >> self.exponent_bits) & ((1u64 << self.mantissa_bits) - 1);
        (mantissa, exponent as u32)
    }
}

const SCHEMES: [Scheme; 7] = [
    Scheme { size: 1, flag: 0b000, flag_bits: 3, mantissa_bits: 5, exponent_bits: 0 },
    Scheme { size: 2, flag: 0b001, flag_bits: 3, mantissa_bits: 9, exponent_bits: 4 },
    Scheme { size: 3, flag: 0b010, flag_bits: 3, mantissa_bits: 17, exponent_bits: 4 },
    Scheme { size: 4, flag: 0b011, flag_bits: 3, mantissa_bits: 25, exponent_bits: 4 },
    Scheme { size: 5, flag: 0b100, flag_bits: 3, mantissa_bits: 34, exponent_bits: 3 },
    Scheme { size: 6, flag: 0b101, flag_bits: 3, mantissa_bits: 42, exponent_bits: 3 },
    Scheme { size: 7, flag: 0b11, flag_bits: 2, mantissa_bits: 54, exponent_bits: 0 },
];

/// Strip up to `max_exponent` trailing decimal zeros.
fn split_decimal(value: u64, max_exponent: u32) -> (u64, u32) {
    let mut mantissa = value;
    let mut exponent = 0;
    while exponent < max_exponent && mantissa != 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }
    (mantissa, exponent)
}

/// Encode an amount with the smallest scheme that represents it exactly.
pub fn encode_amount(value: u64) -> Result<Vec<u8>, EncodeError> {
    SCHEMES
        .iter()
        .find_map(|scheme| {
            let (mantissa, exponent) = split_decimal(value, scheme.max_exponent());
            (mantissa >> scheme.mantissa_bits == 0).then(|| scheme.pack(mantissa, exponent))
        })
        .ok_or(EncodeError::AmountTooLarge(value))
}

/// Decode one amount, consuming only the bytes it occupies.
pub fn decode_amount(reader: &mut ByteReader<'_>) -> Result<u64, DecodeError> {
    let first = reader.peek()?;
    let scheme = if first >> 6 == 0b11 {
        &SCHEMES[6]
    } else {
        &SCHEMES[usize::from(first >> 5)]
    };
    let (mantissa, exponent) = scheme.unpack(reader.take(scheme.size)?);
    10u64
        .checked_pow(exponent)
        .and_then(|scale| mantissa.checked_mul(scale))
        .ok_or(DecodeError::AmountOverflow)
}
