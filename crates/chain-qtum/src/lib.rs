//! Qtum chain support for the wallet.
//!
//! Builds and signs pay-to-pubkey-hash transfers and contract create/call
//! transactions: UTXO selection, output script encoding, legacy SIGHASH_ALL
//! signing and canonical wire serialization. UTXO lookup sits behind the
//! [`provider::UtxoProvider`] trait; the crate performs no network I/O.

pub mod abi;
pub mod address;
pub mod builder;
pub mod error;
pub mod key;
pub mod network;
pub mod provider;
pub mod rpc;
pub mod script;
pub mod signer;
pub mod transaction;
pub mod utxo;

pub use builder::{
    BuilderConfig, ContractInvocation, SpendRequest, TransactionBuilder, UnsignedTransaction,
};
pub use error::{ProviderError, QtumError};
pub use key::SigningKey;
pub use network::{NetworkConfig, QtumNetwork};
pub use script::ContractOpcode;
pub use signer::{sign_transaction, SignedTransaction};
