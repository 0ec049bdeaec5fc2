//! Transaction model and its wire encoding.
//!
//! The model keeps plain byte vectors so the builder and signer can fill
//! scripts in place. Encoding and decoding go through `bitcoin::consensus`;
//! Qtum shares the legacy (non-witness) layout with Bitcoin.

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, TxIn, TxOut, Txid, Witness};

use crate::error::QtumError;

/// Final sequence number; disables lock-time and replacement semantics.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Previous transaction hash (32 bytes, internal byte order).
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    /// Empty until the signer fills it in.
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value_sat: u64,
    pub script_pubkey: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(version: i32, lock_time: u32) -> Self {
        Self {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time,
        }
    }

    /// Consensus byte encoding.
    pub fn serialize(&self) -> Vec<u8> {
        bitcoin::consensus::serialize(&self.to_bitcoin())
    }

    /// Lowercase hex of [`Transaction::serialize`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Decode a transaction, requiring the whole buffer to be consumed.
    ///
    /// Witness data is rejected: every input must carry its signature in
    /// `script_sig`.
    pub fn parse(bytes: &[u8]) -> Result<Self, QtumError> {
        let tx: bitcoin::Transaction = bitcoin::consensus::deserialize(bytes)
            .map_err(|e| QtumError::SerializationError(format!("transaction: {e}")))?;
        Self::from_bitcoin(tx)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, QtumError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| QtumError::SerializationError(format!("invalid hex: {e}")))?;
        Self::parse(&bytes)
    }

    /// Transaction id in display (byte-reversed) hex order.
    pub fn txid(&self) -> String {
        self.to_bitcoin().compute_txid().to_string()
    }

    pub fn total_output_sat(&self) -> u64 {
        self.outputs.iter().map(|o| o.value_sat).sum()
    }

    pub(crate) fn to_bitcoin(&self) -> bitcoin::Transaction {
        bitcoin::Transaction {
            version: Version(self.version),
            lock_time: LockTime::from_consensus(self.lock_time),
            input: self
                .inputs
                .iter()
                .map(|input| TxIn {
                    previous_output: OutPoint {
                        txid: Txid::from_byte_array(input.prev_txid),
                        vout: input.prev_vout,
                    },
                    script_sig: ScriptBuf::from_bytes(input.script_sig.clone()),
                    sequence: Sequence(input.sequence),
                    witness: Witness::new(),
                })
                .collect(),
            output: self
                .outputs
                .iter()
                .map(|output| TxOut {
                    value: Amount::from_sat(output.value_sat),
                    script_pubkey: ScriptBuf::from_bytes(output.script_pubkey.clone()),
                })
                .collect(),
        }
    }

    fn from_bitcoin(tx: bitcoin::Transaction) -> Result<Self, QtumError> {
        if let Some(i) = tx.input.iter().position(|input| !input.witness.is_empty()) {
            return Err(QtumError::SerializationError(format!(
                "input {i} carries witness data"
            )));
        }

        Ok(Self {
            version: tx.version.0,
            lock_time: tx.lock_time.to_consensus_u32(),
            inputs: tx
                .input
                .into_iter()
                .map(|input| TxInput {
                    prev_txid: input.previous_output.txid.to_byte_array(),
                    prev_vout: input.previous_output.vout,
                    script_sig: input.script_sig.into_bytes(),
                    sequence: input.sequence.0,
                })
                .collect(),
            outputs: tx
                .output
                .into_iter()
                .map(|output| TxOutput {
                    value_sat: output.value.to_sat(),
                    script_pubkey: output.script_pubkey.into_bytes(),
                })
                .collect(),
        })
    }
}

/// Parse a hex txid string (big-endian display) to internal byte order.
pub fn parse_txid(txid_hex: &str) -> Result<[u8; 32], QtumError> {
    let txid: Txid = txid_hex
        .parse()
        .map_err(|e| QtumError::SerializationError(format!("invalid txid: {e}")))?;
    Ok(txid.to_byte_array())
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::sha256d;

    use super::*;

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_txid: [0x11; 32],
                prev_vout: 3,
                script_sig: vec![0x01, 0xff],
                sequence: SEQUENCE_FINAL,
            }],
            outputs: vec![
                TxOutput {
                    value_sat: 200_000_000,
                    script_pubkey: vec![0x76, 0xa9],
                },
                TxOutput {
                    value_sat: 0,
                    script_pubkey: vec![],
                },
            ],
            lock_time: 0,
        }
    }

    #[test]
    fn serialize_field_layout() {
        let bytes = sample_tx().serialize();
        assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
        assert_eq!(bytes[4], 1); // input count
        assert_eq!(&bytes[5..37], &[0x11; 32]);
        assert_eq!(&bytes[37..41], &3u32.to_le_bytes());
        assert_eq!(bytes[41], 2); // script length
        assert_eq!(&bytes[42..44], &[0x01, 0xff]);
        assert_eq!(&bytes[44..48], &[0xff; 4]);
        assert_eq!(bytes[48], 2); // output count
        assert_eq!(&bytes[49..57], &200_000_000u64.to_le_bytes());
        assert_eq!(bytes[57], 2);
        assert_eq!(&bytes[bytes.len() - 4..], &[0, 0, 0, 0]);
        assert_eq!(bytes.len(), 4 + 1 + 43 + 1 + 11 + 9 + 4);
    }

    #[test]
    fn parse_inverts_serialize() {
        let tx = sample_tx();
        let parsed = Transaction::parse(&tx.serialize()).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(Transaction::from_hex(&tx.to_hex()).unwrap(), tx);
    }

    #[test]
    fn parse_negative_version() {
        let mut tx = sample_tx();
        tx.version = -2;
        assert_eq!(Transaction::parse(&tx.serialize()).unwrap().version, -2);
    }

    #[test]
    fn parse_rejects_truncation() {
        let bytes = sample_tx().serialize();
        for cut in [0, 3, 5, 40, bytes.len() - 1] {
            let result = Transaction::parse(&bytes[..cut]);
            assert!(
                matches!(result, Err(QtumError::SerializationError(_))),
                "cut at {cut} should fail"
            );
        }
    }

    #[test]
    fn parse_rejects_trailing_bytes() {
        let mut bytes = sample_tx().serialize();
        bytes.push(0x00);
        assert!(matches!(
            Transaction::parse(&bytes),
            Err(QtumError::SerializationError(_))
        ));
    }

    #[test]
    fn parse_rejects_non_canonical_count() {
        let mut bytes = sample_tx().serialize();
        // Re-encode the input count 1 as 0xFD 0x01 0x00.
        bytes.splice(4..5, [0xFD, 0x01, 0x00]);
        assert!(Transaction::parse(&bytes).is_err());
    }

    #[test]
    fn parse_huge_count_does_not_allocate() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xFF, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f]);
        assert!(Transaction::parse(&bytes).is_err());
    }

    #[test]
    fn from_hex_rejects_invalid_hex() {
        assert!(Transaction::from_hex("zz").is_err());
    }

    #[test]
    fn txid_is_reversed_double_sha() {
        let tx = sample_tx();
        let mut expected = sha256d::Hash::hash(&tx.serialize()).to_byte_array();
        expected.reverse();
        assert_eq!(tx.txid(), hex::encode(expected));
    }

    #[test]
    fn total_output_sums_values() {
        assert_eq!(sample_tx().total_output_sat(), 200_000_000);
    }

    #[test]
    fn parse_txid_reverses_bytes() {
        let hex = "0100000000000000000000000000000000000000000000000000000000000002";
        let result = parse_txid(hex).unwrap();
        assert_eq!(result[0], 0x02);
        assert_eq!(result[31], 0x01);
    }

    #[test]
    fn parse_txid_invalid_hex() {
        assert!(parse_txid("not_hex").is_err());
    }

    #[test]
    fn parse_txid_wrong_length() {
        assert!(parse_txid("0102").is_err());
    }

    #[test]
    fn parse_rejects_witness_data() {
        let mut tx = sample_tx().to_bitcoin();
        tx.input[0].witness.push([0x01, 0x02]);
        let bytes = bitcoin::consensus::serialize(&tx);
        assert!(matches!(
            Transaction::parse(&bytes),
            Err(QtumError::SerializationError(_))
        ));
    }

    #[test]
    fn bitcoin_conversion_keeps_fields() {
        let tx = sample_tx();
        let converted = tx.to_bitcoin();
        assert_eq!(converted.version.0, 1);
        assert_eq!(converted.input[0].previous_output.vout, 3);
        assert_eq!(converted.input[0].sequence, Sequence::MAX);
        assert_eq!(converted.output[0].value, Amount::from_sat(200_000_000));
        assert_eq!(Transaction::from_bitcoin(converted).unwrap(), tx);
    }
}
