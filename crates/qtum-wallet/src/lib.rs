//! String-facing entry points for building and signing Qtum transactions.
//!
//! Each call imports a WIF key, fetches UTXOs through the supplied provider,
//! builds, signs and serializes, and hands back lowercase hex ready for
//! broadcast. Nothing is broadcast from here.

pub mod config;
pub mod error;

use chain_qtum::builder::{ContractInvocation, SpendRequest, TransactionBuilder};
use chain_qtum::provider::UtxoProvider;
use chain_qtum::signer::{sign_transaction, SignedTransaction};
use chain_qtum::{ContractOpcode, SigningKey};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

pub use chain_qtum;
pub use config::WalletConfig;
pub use error::WalletError;

/// Output of a successful build-and-sign run.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Lowercase hex serialization.
    pub hex: String,
    /// Display-order transaction id.
    pub txid: String,
    pub fee_sat: u64,
    pub transaction: SignedTransaction,
}

/// Build, sign and serialize `request` with `key`.
#[instrument(skip_all, fields(network = %config.network.name))]
pub fn sign_request<P>(
    request: &SpendRequest,
    key: &SigningKey,
    provider: &P,
    config: &WalletConfig,
) -> Result<SignedRequest, WalletError>
where
    P: UtxoProvider + ?Sized,
{
    let builder = TransactionBuilder::new(config.network.clone(), config.builder.clone());
    let unsigned = builder.build(request, key, provider)?;
    let fee_sat = unsigned.fee_sat;
    let transaction = sign_transaction(unsigned, key)?;

    let txid = transaction.txid();
    debug!(%txid, fee_sat, "request signed");
    Ok(SignedRequest {
        hex: transaction.to_hex(),
        txid,
        fee_sat,
        transaction,
    })
}

/// Pay `amount_sat` to `destination`, returning the signed transaction hex.
#[instrument(skip_all, fields(amount_sat = amount_sat))]
pub fn create_p2pkh_transaction<P>(
    wif: String,
    destination: &str,
    amount_sat: u64,
    provider: &P,
    config: &WalletConfig,
) -> Result<String, WalletError>
where
    P: UtxoProvider + ?Sized,
{
    let wif = Zeroizing::new(wif);
    let key = SigningKey::from_wif(&wif, &config.network)?;

    let request = SpendRequest::PlainTransfer {
        destination: destination.to_string(),
        amount_sat,
    };
    Ok(sign_request(&request, &key, provider, config)?.hex)
}

/// Parameters of a contract create or call, as supplied by callers.
#[derive(Debug, Clone)]
pub struct ContractCallParams<'a> {
    pub sender: &'a str,
    /// Hex contract address; required when `opcode` is `0xc2`.
    pub contract_address: Option<&'a str>,
    pub amount_sat: u64,
    pub data: &'a [u8],
    pub gas_limit: u64,
    pub gas_price: u64,
    /// `0xc1` to create, `0xc2` to call.
    pub opcode: u8,
}

/// Deploy or invoke a contract, returning the signed transaction hex.
#[instrument(
    skip_all,
    fields(opcode = params.opcode, gas_limit = params.gas_limit, gas_price = params.gas_price)
)]
pub fn create_contract_transaction<P>(
    wif: String,
    params: &ContractCallParams<'_>,
    provider: &P,
    config: &WalletConfig,
) -> Result<String, WalletError>
where
    P: UtxoProvider + ?Sized,
{
    let opcode = ContractOpcode::try_from(params.opcode)?;
    let wif = Zeroizing::new(wif);
    let key = SigningKey::from_wif(&wif, &config.network)?;

    let request = SpendRequest::ContractInvocation(ContractInvocation {
        sender: params.sender.to_string(),
        contract_address: params.contract_address.map(str::to_string),
        amount_sat: params.amount_sat,
        data: params.data.to_vec(),
        gas_limit: params.gas_limit,
        gas_price: params.gas_price,
        opcode,
    });
    Ok(sign_request(&request, &key, provider, config)?.hex)
}
