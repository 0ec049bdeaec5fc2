//! Legacy SIGHASH_ALL signing of pay-to-pubkey-hash inputs.
//!
//! The digest for input `i` is the double SHA-256 of a copy of the
//! transaction in which input `i` carries the previous output's script (with
//! every `OP_CODESEPARATOR` removed), every other input carries an empty
//! script, and the 4-byte little-endian hash type is appended. The preimage
//! itself comes from `bitcoin::sighash::SighashCache`, which does not strip
//! separators, so they are removed here first.

use bitcoin::hashes::Hash;
use bitcoin::script::Script;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use tracing::debug;

use crate::builder::UnsignedTransaction;
use crate::error::QtumError;
use crate::key::SigningKey;
use crate::script::{self, parse_script, remove_code_separators};
use crate::transaction::Transaction;

pub const SIGHASH_ALL: u32 = EcdsaSighashType::All as u32;

/// A transaction with every input's signature script filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: Transaction,
}

impl SignedTransaction {
    pub fn serialize(&self) -> Vec<u8> {
        self.tx.serialize()
    }

    pub fn to_hex(&self) -> String {
        self.tx.to_hex()
    }

    pub fn txid(&self) -> String {
        self.tx.txid()
    }
}

/// Compute the SIGHASH_ALL digest for `input_index`.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    prev_script: &[u8],
) -> Result<[u8; 32], QtumError> {
    if input_index >= tx.inputs.len() {
        return Err(QtumError::SigningError(format!(
            "input index {input_index} out of range ({} inputs)",
            tx.inputs.len()
        )));
    }

    let subscript = remove_code_separators(prev_script)
        .map_err(|e| QtumError::SigningError(format!("previous output script: {e}")))?;

    let unsigned = tx.to_bitcoin();
    let sighash = SighashCache::new(&unsigned)
        .legacy_signature_hash(input_index, Script::from_bytes(&subscript), SIGHASH_ALL)
        .map_err(|e| QtumError::SigningError(format!("sighash for input {input_index}: {e}")))?;
    Ok(sighash.to_byte_array())
}

/// Signature script for one input: a single push of `DER || SIGHASH_ALL`.
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    prev_script: &[u8],
    key: &SigningKey,
) -> Result<Vec<u8>, QtumError> {
    let digest = signature_hash(tx, input_index, prev_script)?;
    let signature = key.sign_digest(&digest)?;
    let signature = signature.normalize_s().unwrap_or(signature);

    let mut sig_bytes = signature.to_der().as_bytes().to_vec();
    sig_bytes.push(SIGHASH_ALL as u8);
    Ok(script::signature_script(&sig_bytes))
}

/// Sign every input of `unsigned` with `key`.
///
/// All signatures are computed against the unsigned transaction before any
/// input is filled in, so a failure leaves nothing half-signed.
pub fn sign_transaction(
    unsigned: UnsignedTransaction,
    key: &SigningKey,
) -> Result<SignedTransaction, QtumError> {
    let UnsignedTransaction {
        mut tx,
        prev_scripts,
        ..
    } = unsigned;

    if prev_scripts.len() != tx.inputs.len() {
        return Err(QtumError::SigningError(format!(
            "{} previous scripts for {} inputs",
            prev_scripts.len(),
            tx.inputs.len()
        )));
    }
    if let Some(i) = tx.inputs.iter().position(|input| !input.script_sig.is_empty()) {
        return Err(QtumError::SigningError(format!(
            "input {i} already carries a signature script"
        )));
    }

    let script_sigs = prev_scripts
        .iter()
        .enumerate()
        .map(|(i, prev_script)| {
            let script_sig = sign_input(&tx, i, prev_script, key)?;
            debug!(input_index = i, "signed input");
            Ok(script_sig)
        })
        .collect::<Result<Vec<_>, QtumError>>()?;

    for (input, script_sig) in tx.inputs.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    debug!(inputs = tx.inputs.len(), "signed transaction");
    Ok(SignedTransaction { tx })
}

/// Check the signature in input `input_index` against `verifying_key`.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify and
/// an error when the signature script cannot be decoded at all.
pub fn verify_input(
    tx: &Transaction,
    input_index: usize,
    prev_script: &[u8],
    verifying_key: &VerifyingKey,
) -> Result<bool, QtumError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        QtumError::SigningError(format!("input index {input_index} out of range"))
    })?;

    let pushes = parse_script(&input.script_sig)?;
    let [push] = pushes.as_slice() else {
        return Err(QtumError::SigningError(format!(
            "expected one push in signature script, found {}",
            pushes.len()
        )));
    };

    let Some((&hash_type, der)) = push.data.split_last() else {
        return Err(QtumError::SigningError("empty signature push".into()));
    };
    if u32::from(hash_type) != SIGHASH_ALL {
        return Ok(false);
    }

    let signature = Signature::from_der(der)
        .map_err(|e| QtumError::SigningError(format!("malformed DER signature: {e}")))?;
    let digest = signature_hash(tx, input_index, prev_script)?;
    Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
}
