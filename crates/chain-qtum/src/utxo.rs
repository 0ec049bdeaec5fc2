use tracing::debug;

use crate::error::{ProviderError, QtumError};

/// A single unspent transaction output as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    /// Previous transaction hash in internal (little-endian) byte order.
    pub prev_txid: [u8; 32],
    pub output_index: u32,
    pub amount_sat: u64,
    /// The locking script of the output being spent.
    pub script_pubkey: Vec<u8>,
    pub confirmations: u32,
}

/// Result of UTXO selection: the chosen outputs and their aggregate value.
#[derive(Debug, Clone)]
pub struct UtxoSelection {
    pub selected: Vec<UnspentOutput>,
    pub total_sat: u64,
}

/// Select UTXOs covering `target_sat`.
///
/// First-fit in the order supplied: outputs are taken one by one until the
/// running total reaches the target, and selection stops there. No sorting
/// takes place, so the result is always a prefix of `available`. This does
/// not minimise input count or change.
pub fn select_utxos(
    available: &[UnspentOutput],
    target_sat: u64,
) -> Result<UtxoSelection, QtumError> {
    let mut selected = Vec::new();
    let mut total_sat: u64 = 0;

    for utxo in available {
        if total_sat >= target_sat {
            break;
        }
        total_sat = total_sat.checked_add(utxo.amount_sat).ok_or_else(|| {
            ProviderError::Decode(format!(
                "utxo amounts overflow after {} outputs",
                selected.len() + 1
            ))
        })?;
        selected.push(utxo.clone());
    }

    if total_sat < target_sat {
        return Err(QtumError::InsufficientFunds {
            required: target_sat,
            available: total_sat,
        });
    }

    debug!(
        inputs = selected.len(),
        total_sat,
        target_sat,
        "selected utxos"
    );
    Ok(UtxoSelection { selected, total_sat })
}
