//! Commitment and overflow output scripts
//!
//! The payload rides in an `OP_RETURN` output. Metadata that does not fit
//! moves into a 1-of-2 bare multisig output at index 0 whose second "key"
//! slot carries `0x03 || chunk`.

use bitcoin::blockdata::opcodes::all::{OP_CHECKMULTISIG, OP_PUSHNUM_1, OP_PUSHNUM_2, OP_RETURN};
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::{Script, ScriptBuf, Transaction};
use wienasset_core::constants::OVERFLOW_SLOT_PREFIX;

use crate::codec::{DecodeError, Decoded, Payload};

/// Fixed first key of the overflow template
pub const OVERFLOW_TEMPLATE_KEY: [u8; 33] = [
    0x02, 0x3c, 0xce, 0x9d, 0xee, 0x67, 0xe1, 0xc5, 0x2d, 0xa2, 0x0b, 0x5b, 0x8d, 0xc6, 0x84, 0x82,
    0xa2, 0x64, 0xc9, 0x8b, 0x86, 0x4c, 0xe5, 0xcd, 0x5a, 0x35, 0x5f, 0x76, 0x08, 0x13, 0x1a, 0xae,
    0x9b,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitmentError {
    #[error("Script push of {0} bytes is too large")]
    PushTooLarge(usize),

    #[error("Payload references an overflow output that is missing")]
    MissingOverflow,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

fn push_bytes(data: &[u8]) -> Result<PushBytesBuf, CommitmentError> {
    PushBytesBuf::try_from(data.to_vec()).map_err(|_| CommitmentError::PushTooLarge(data.len()))
}

/// `OP_RETURN <payload>`
pub fn commitment_script(payload: &[u8]) -> Result<ScriptBuf, CommitmentError> {
    Ok(Builder::new()
        .push_opcode(OP_RETURN)
        .push_slice(push_bytes(payload)?)
        .into_script())
}

/// `OP_1 <template key> <0x03 || chunk> OP_2 OP_CHECKMULTISIG`
pub fn overflow_script(chunk: &[u8]) -> Result<ScriptBuf, CommitmentError> {
    let mut slot = Vec::with_capacity(chunk.len() + 1);
    slot.push(OVERFLOW_SLOT_PREFIX);
    slot.extend_from_slice(chunk);

    Ok(Builder::new()
        .push_opcode(OP_PUSHNUM_1)
        .push_slice(push_bytes(&OVERFLOW_TEMPLATE_KEY)?)
        .push_slice(push_bytes(&slot)?)
        .push_opcode(OP_PUSHNUM_2)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script())
}

fn instructions(script: &Script) -> Option<Vec<Instruction<'_>>> {
    script.instructions().collect::<Result<Vec<_>, _>>().ok()
}

/// Payload bytes of an `OP_RETURN` script, if it is one
pub fn parse_commitment_script(script: &Script) -> Option<Vec<u8>> {
    match instructions(script)?.as_slice() {
        [Instruction::Op(OP_RETURN), Instruction::PushBytes(data)] => Some(data.as_bytes().to_vec()),
        _ => None,
    }
}

/// Chunk carried by an overflow template script, if it is one
pub fn parse_overflow_script(script: &Script) -> Option<Vec<u8>> {
    match instructions(script)?.as_slice() {
        [Instruction::Op(OP_PUSHNUM_1), Instruction::PushBytes(key), Instruction::PushBytes(slot), Instruction::Op(OP_PUSHNUM_2), Instruction::Op(OP_CHECKMULTISIG)]
            if key.as_bytes() == OVERFLOW_TEMPLATE_KEY =>
        {
            match slot.as_bytes().split_first() {
                Some((&OVERFLOW_SLOT_PREFIX, chunk)) => Some(chunk.to_vec()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Recover the asset payload of a transaction.
///
/// Returns `Ok(None)` when no output carries a payload with the protocol
/// marker. `OP_RETURN` outputs of other protocols are passed over. When the
/// hash was moved out, it is read back from output 0.
pub fn decode_commitment(tx: &Transaction) -> Result<Option<Payload>, CommitmentError> {
    let mut found = None;
    for code in tx
        .output
        .iter()
        .filter_map(|out| parse_commitment_script(&out.script_pubkey))
    {
        match Payload::decode(&code) {
            Ok(decoded) => {
                found = Some(decoded);
                break;
            }
            Err(DecodeError::BadProtocolMarker(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let Some(Decoded {
        mut payload,
        hash_in_overflow,
    }) = found
    else {
        return Ok(None);
    };

    if hash_in_overflow {
        let chunk = tx
            .output
            .first()
            .and_then(|out| parse_overflow_script(&out.script_pubkey))
            .ok_or(CommitmentError::MissingOverflow)?;
        payload.content_hash = Some(chunk);
    }
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Payment;
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, TxOut};
    use wienasset_core::constants::OVERFLOW_TEMPLATE_KEY as TEMPLATE_KEY_HEX;

    fn tx_with(outputs: Vec<ScriptBuf>) -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: outputs
                .into_iter()
                .map(|script_pubkey| TxOut {
                    value: Amount::ZERO,
                    script_pubkey,
                })
                .collect(),
        }
    }

    #[test]
    fn test_template_key_matches_constant() {
        assert_eq!(hex::encode(OVERFLOW_TEMPLATE_KEY), TEMPLATE_KEY_HEX);
    }

    #[test]
    fn test_commitment_script_layout() {
        let script = commitment_script(&[0x57, 0x41, 0x03, 0x15]).unwrap();
        assert_eq!(hex::encode(script.as_bytes()), "6a0457410315");
        assert!(script.is_op_return());
        assert_eq!(
            parse_commitment_script(&script),
            Some(vec![0x57, 0x41, 0x03, 0x15])
        );
    }

    #[test]
    fn test_overflow_script_layout() {
        let hash = [0x11u8; 32];
        let script = overflow_script(&hash).unwrap();
        let expected = format!(
            "5121{}2103{}52ae",
            TEMPLATE_KEY_HEX,
            "11".repeat(32)
        );
        assert_eq!(hex::encode(script.as_bytes()), expected);
        assert_eq!(parse_overflow_script(&script), Some(hash.to_vec()));
    }

    #[test]
    fn test_parse_rejects_other_scripts() {
        let p2pkh = ScriptBuf::from_hex("76a9143ccb1b3b68065b3617679db3727fce5f46dff22088ac").unwrap();
        assert_eq!(parse_commitment_script(&p2pkh), None);
        assert_eq!(parse_overflow_script(&p2pkh), None);
    }

    #[test]
    fn test_decode_commitment_with_overflow() {
        let hash = vec![0x22u8; 32];
        let mut payload = Payload::transfer((0..25).map(|i| Payment::to_output(i, 20)).collect())
            .with_content_hash(Some(hash.clone()));
        let first = payload.encode(80).unwrap();
        assert_eq!(first.leftover.len(), 1);
        payload.shift_outputs();
        let encoded = payload.encode(80).unwrap();

        let tx = tx_with(vec![
            overflow_script(&encoded.leftover[0]).unwrap(),
            commitment_script(&encoded.code).unwrap(),
        ]);
        let decoded = decode_commitment(&tx).unwrap().unwrap();
        assert_eq!(decoded.content_hash, Some(hash));
        assert_eq!(decoded.payments, payload.payments);
    }

    #[test]
    fn test_decode_commitment_missing_overflow() {
        let mut payload = Payload::transfer((0..25).map(|i| Payment::to_output(i, 20)).collect())
            .with_content_hash(Some(vec![0x22u8; 32]));
        payload.shift_outputs();
        let encoded = payload.encode(80).unwrap();
        let tx = tx_with(vec![commitment_script(&encoded.code).unwrap()]);
        assert_eq!(decode_commitment(&tx), Err(CommitmentError::MissingOverflow));
    }

    #[test]
    fn test_decode_commitment_ignores_foreign_op_return() {
        let tx = tx_with(vec![commitment_script(b"hello world").unwrap()]);
        assert_eq!(decode_commitment(&tx), Ok(None));
        assert_eq!(decode_commitment(&tx_with(vec![])), Ok(None));
    }

    #[test]
    fn test_decode_commitment_after_foreign_op_return() {
        let payload = Payload::transfer(vec![Payment::to_output(0, 20)]);
        let encoded = payload.encode(80).unwrap();
        let tx = tx_with(vec![
            commitment_script(b"hello world").unwrap(),
            commitment_script(&encoded.code).unwrap(),
        ]);
        let decoded = decode_commitment(&tx).unwrap().unwrap();
        assert_eq!(decoded.payments, vec![Payment::to_output(0, 20)]);
    }
}
