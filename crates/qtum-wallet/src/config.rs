use chain_qtum::{BuilderConfig, NetworkConfig, QtumNetwork};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Everything the facade needs besides the key and the request itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub network: NetworkConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
}

impl WalletConfig {
    /// Preset network parameters with default builder settings.
    pub fn for_network(network: QtumNetwork) -> Self {
        Self {
            network: network.config(),
            builder: BuilderConfig::default(),
        }
    }

    /// Load from a JSON document. `builder` may be omitted or partial.
    pub fn from_json_str(json: &str) -> Result<Self, WalletError> {
        let config: WalletConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        let network = &self.network;
        if network.pubkey_hash_addr_id == network.script_hash_addr_id {
            return Err(WalletError::Config(format!(
                "network {}: pubkey-hash and script-hash version bytes collide ({:#04x})",
                network.name, network.pubkey_hash_addr_id
            )));
        }
        if self.builder.tx_version < 1 {
            return Err(WalletError::Config(format!(
                "unsupported transaction version {}",
                self.builder.tx_version
            )));
        }
        Ok(())
    }
}
