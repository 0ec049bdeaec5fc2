use serde::{Deserialize, Serialize};

/// Built-in Qtum networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QtumNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

/// Address and key version bytes for one network.
///
/// Passed explicitly into every address and key decoding call; there is no
/// process-wide default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    /// Base58Check version byte of pay-to-pubkey-hash addresses.
    pub pubkey_hash_addr_id: u8,
    /// Base58Check version byte of pay-to-script-hash addresses.
    pub script_hash_addr_id: u8,
    /// Version byte of WIF-encoded private keys.
    pub wif_prefix: u8,
}

impl QtumNetwork {
    /// Version bytes for this network.
    pub fn config(self) -> NetworkConfig {
        match self {
            QtumNetwork::Mainnet => NetworkConfig {
                name: self.to_string(),
                pubkey_hash_addr_id: 0x3A,
                script_hash_addr_id: 0x32,
                wif_prefix: 0x80,
            },
            QtumNetwork::Testnet | QtumNetwork::Regtest => NetworkConfig {
                name: self.to_string(),
                pubkey_hash_addr_id: 0x78,
                script_hash_addr_id: 0x6E,
                wif_prefix: 0xEF,
            },
        }
    }
}

impl From<QtumNetwork> for NetworkConfig {
    fn from(network: QtumNetwork) -> Self {
        network.config()
    }
}

impl std::fmt::Display for QtumNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QtumNetwork::Mainnet => write!(f, "mainnet"),
            QtumNetwork::Testnet => write!(f, "testnet"),
            QtumNetwork::Regtest => write!(f, "regtest"),
        }
    }
}
