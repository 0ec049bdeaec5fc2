use std::collections::HashMap;

pub use crate::error::ProviderError;
use crate::utxo::UnspentOutput;

/// Source of spendable outputs for a pubkey hash.
///
/// Implementations own transport, retries and timeouts; the pipeline calls
/// this once per build and fails fast on any error.
pub trait UtxoProvider {
    fn fetch_unspent(&self, address_hash: &[u8; 20]) -> Result<Vec<UnspentOutput>, ProviderError>;
}

impl<T: UtxoProvider + ?Sized> UtxoProvider for &T {
    fn fetch_unspent(&self, address_hash: &[u8; 20]) -> Result<Vec<UnspentOutput>, ProviderError> {
        (**self).fetch_unspent(address_hash)
    }
}

/// In-memory provider, for offline signing and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticUtxoProvider {
    utxos: HashMap<[u8; 20], Vec<UnspentOutput>>,
}

impl StaticUtxoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register outputs owned by `address_hash`, appended after any already
    /// registered for it.
    pub fn with_utxos(mut self, address_hash: [u8; 20], utxos: Vec<UnspentOutput>) -> Self {
        self.utxos.entry(address_hash).or_default().extend(utxos);
        self
    }
}

impl UtxoProvider for StaticUtxoProvider {
    fn fetch_unspent(&self, address_hash: &[u8; 20]) -> Result<Vec<UnspentOutput>, ProviderError> {
        Ok(self.utxos.get(address_hash).cloned().unwrap_or_default())
    }
}
