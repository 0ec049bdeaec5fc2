use chain_qtum::QtumError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("qtum: {0}")]
    Qtum(#[from] QtumError),

    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::Config(e.to_string())
    }
}
