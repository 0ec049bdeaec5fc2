use thiserror::Error;

/// Failures reported by a UTXO provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Qtum transaction pipeline errors.
#[derive(Debug, Error)]
pub enum QtumError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("insufficient funds: need {required} sat, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("invalid script input: {0}")]
    InvalidScriptInput(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}
