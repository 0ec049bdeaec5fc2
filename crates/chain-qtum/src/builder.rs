//! Unsigned transaction assembly.
//!
//! Plain transfers and contract invocations share one pipeline: fetch UTXOs,
//! select inputs, build outputs, append change. Only the primary outputs
//! differ between the two request kinds.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::{decode_address, parse_hash160_hex};
use crate::error::{ProviderError, QtumError};
use crate::key::SigningKey;
use crate::network::NetworkConfig;
use crate::provider::UtxoProvider;
use crate::script::{self, ContractOpcode};
use crate::transaction::{Transaction, TxInput, TxOutput, SEQUENCE_FINAL};
use crate::utxo::select_utxos;

/// Fee charged on plain transfers, in satoshi.
pub const DEFAULT_FLAT_FEE_SAT: u64 = 100_000;

/// EVM version byte pushed at the head of contract scripts.
pub const DEFAULT_EVM_VERSION: u8 = 4;

/// Tunables for transaction assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub tx_version: i32,
    pub lock_time: u32,
    pub sequence: u32,
    pub flat_fee_sat: u64,
    pub evm_version: u8,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tx_version: 1,
            lock_time: 0,
            sequence: SEQUENCE_FINAL,
            flat_fee_sat: DEFAULT_FLAT_FEE_SAT,
            evm_version: DEFAULT_EVM_VERSION,
        }
    }
}

/// What the caller wants the transaction to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendRequest {
    PlainTransfer {
        /// Base58Check pay-to-pubkey-hash address.
        destination: String,
        amount_sat: u64,
    },
    ContractInvocation(ContractInvocation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInvocation {
    /// Base58Check address that receives the self-output.
    pub sender: String,
    /// 40 hex characters; required for `Call`, ignored for `Create`.
    pub contract_address: Option<String>,
    pub amount_sat: u64,
    /// Bytecode for `Create`, ABI call data for `Call`.
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub opcode: ContractOpcode,
}

impl SpendRequest {
    pub fn amount_sat(&self) -> u64 {
        match self {
            SpendRequest::PlainTransfer { amount_sat, .. } => *amount_sat,
            SpendRequest::ContractInvocation(call) => call.amount_sat,
        }
    }
}

/// A transaction whose inputs carry empty signature scripts.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    /// Locking scripts of the spent outputs, aligned with `tx.inputs`.
    pub prev_scripts: Vec<Vec<u8>>,
    pub total_in_sat: u64,
    pub fee_sat: u64,
}

/// Assembles unsigned transactions for one network.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    network: NetworkConfig,
    config: BuilderConfig,
}

impl TransactionBuilder {
    pub fn new(network: NetworkConfig, config: BuilderConfig) -> Self {
        Self { network, config }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build an unsigned transaction spending `key`'s outputs.
    ///
    /// Request fields are validated before the provider is queried, so a bad
    /// address never costs a network round trip.
    pub fn build<P>(
        &self,
        request: &SpendRequest,
        key: &SigningKey,
        provider: &P,
    ) -> Result<UnsignedTransaction, QtumError>
    where
        P: UtxoProvider + ?Sized,
    {
        let (primary_outputs, fee_sat) = self.primary_outputs(request)?;
        let target_sat = request.amount_sat().saturating_add(fee_sat);

        let available = provider.fetch_unspent(key.pubkey_hash())?;
        debug!(count = available.len(), "fetched unspent outputs");

        // Select for one satoshi past the target so the change output is never empty.
        let required_sat = target_sat.saturating_add(1);
        let selection = select_utxos(&available, required_sat).inspect_err(|_| {
            warn!(required_sat, "utxo selection failed");
        })?;

        let mut seen = HashSet::with_capacity(selection.selected.len());
        let mut tx = Transaction::new(self.config.tx_version, self.config.lock_time);
        let mut prev_scripts = Vec::with_capacity(selection.selected.len());
        for utxo in &selection.selected {
            if !seen.insert((utxo.prev_txid, utxo.output_index)) {
                return Err(ProviderError::Decode(format!(
                    "duplicate outpoint {}:{}",
                    hex::encode(utxo.prev_txid),
                    utxo.output_index
                ))
                .into());
            }
            tx.inputs.push(TxInput {
                prev_txid: utxo.prev_txid,
                prev_vout: utxo.output_index,
                script_sig: Vec::new(),
                sequence: self.config.sequence,
            });
            prev_scripts.push(utxo.script_pubkey.clone());
        }

        tx.outputs = primary_outputs;

        // Only reachable when the target saturates at u64::MAX.
        if selection.total_sat <= target_sat {
            warn!(
                total_in_sat = selection.total_sat,
                target_sat, "no change left after amount and fee"
            );
            return Err(QtumError::InsufficientFunds {
                required: required_sat,
                available: selection.total_sat,
            });
        }
        let change_sat = selection.total_sat - target_sat;
        tx.outputs.push(TxOutput {
            value_sat: change_sat,
            script_pubkey: script::pay_to_pubkey_hash(key.pubkey_hash()),
        });

        debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee_sat,
            change_sat,
            "assembled unsigned transaction"
        );

        Ok(UnsignedTransaction {
            tx,
            prev_scripts,
            total_in_sat: selection.total_sat,
            fee_sat,
        })
    }

    /// Outputs preceding change, plus the fee the request implies.
    fn primary_outputs(&self, request: &SpendRequest) -> Result<(Vec<TxOutput>, u64), QtumError> {
        match request {
            SpendRequest::PlainTransfer {
                destination,
                amount_sat,
            } => {
                let destination_hash = decode_address(destination, &self.network)?;
                let outputs = vec![TxOutput {
                    value_sat: *amount_sat,
                    script_pubkey: script::pay_to_pubkey_hash(&destination_hash),
                }];
                Ok((outputs, self.config.flat_fee_sat))
            }
            SpendRequest::ContractInvocation(call) => {
                let sender_hash = decode_address(&call.sender, &self.network)?;
                let contract_script = match call.opcode {
                    ContractOpcode::Create => script::contract_create(
                        self.config.evm_version,
                        call.gas_limit,
                        call.gas_price,
                        &call.data,
                    )?,
                    ContractOpcode::Call => {
                        let contract = call.contract_address.as_deref().ok_or_else(|| {
                            QtumError::InvalidScriptInput(
                                "contract call requires a contract address".into(),
                            )
                        })?;
                        script::contract_call(
                            self.config.evm_version,
                            call.gas_limit,
                            call.gas_price,
                            &call.data,
                            &parse_hash160_hex(contract)?,
                        )?
                    }
                };

                let outputs = vec![
                    TxOutput {
                        value_sat: call.amount_sat,
                        script_pubkey: script::pay_to_pubkey_hash(&sender_hash),
                    },
                    TxOutput {
                        value_sat: 0,
                        script_pubkey: contract_script,
                    },
                ];
                Ok((outputs, call.gas_limit.saturating_mul(call.gas_price)))
            }
        }
    }
}
