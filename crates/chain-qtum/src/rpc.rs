//! JSON-RPC `qtum_getUTXOs` request encoding and response decoding.
//!
//! The crate never opens a socket: callers plug an [`RpcTransport`] into
//! [`RpcUtxoProvider`] and own the HTTP client, timeouts and retries.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::UtxoProvider;
use crate::transaction::parse_txid;
use crate::utxo::UnspentOutput;

pub const GET_UTXOS_METHOD: &str = "qtum_getUTXOs";

/// Smallest output the node is asked to return (0.005 coin).
pub const DEFAULT_MIN_AMOUNT_SAT: u64 = 500_000;

const SAT_PER_COIN: u64 = 100_000_000;
const DECIMALS: usize = 8;

/// JSON-RPC 2.0 request body for `qtum_getUTXOs`.
#[derive(Debug, Clone, Serialize)]
pub struct GetUtxosRequest {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'static str,
    /// `["0x" + hex(hash160), min_amount]`.
    pub params: (String, Number),
}

impl GetUtxosRequest {
    pub fn new(
        id: impl Into<String>,
        address_hash: &[u8; 20],
        min_amount_sat: u64,
    ) -> Result<Self, ProviderError> {
        let min_amount: Number = serde_json::from_str(&format_amount(min_amount_sat))
            .map_err(|e| ProviderError::Decode(format!("min amount: {e}")))?;
        Ok(Self {
            jsonrpc: "2.0",
            id: id.into(),
            method: GET_UTXOS_METHOD,
            params: (format!("0x{}", hex::encode(address_hash)), min_amount),
        })
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ProviderError> {
        serde_json::to_vec(self)
            .map_err(|e| ProviderError::Decode(format!("request encoding: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUtxo {
    txid: String,
    vout: u32,
    amount: Value,
    #[serde(default)]
    confirmations: i64,
    script_pub_key: String,
}

/// Decode a `qtum_getUTXOs` response body into unspent outputs, keeping the
/// node's order.
pub fn decode_utxos_response(body: &[u8]) -> Result<Vec<UnspentOutput>, ProviderError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| ProviderError::Decode(format!("response envelope: {e}")))?;

    if let Some(err) = envelope.error {
        return Err(ProviderError::Network(format!(
            "rpc error {}: {}",
            err.code, err.message
        )));
    }

    let result = envelope
        .result
        .ok_or_else(|| ProviderError::Decode("response has neither result nor error".into()))?;
    let raw: Vec<RawUtxo> = serde_json::from_value(result)
        .map_err(|e| ProviderError::Decode(format!("utxo list: {e}")))?;

    raw.into_iter().map(into_unspent).collect()
}

fn into_unspent(raw: RawUtxo) -> Result<UnspentOutput, ProviderError> {
    let prev_txid = parse_txid(&raw.txid)
        .map_err(|e| ProviderError::Decode(format!("txid {}: {e}", raw.txid)))?;
    let script_pubkey = hex::decode(&raw.script_pub_key)
        .map_err(|e| ProviderError::Decode(format!("scriptPubKey: {e}")))?;
    let amount_text = match &raw.amount {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => {
            return Err(ProviderError::Decode(format!(
                "amount must be a number, got {other}"
            )))
        }
    };

    Ok(UnspentOutput {
        prev_txid,
        output_index: raw.vout,
        amount_sat: parse_amount_sat(&amount_text)?,
        script_pubkey,
        // Negative counts come from unconfirmed or conflicted outputs.
        confirmations: raw.confirmations.clamp(0, u32::MAX as i64) as u32,
    })
}

/// Convert a decimal coin amount such as `"1.5"` to satoshi without going
/// through floating point.
///
/// Digits beyond the eighth decimal place are accepted only when zero.
pub fn parse_amount_sat(text: &str) -> Result<u64, ProviderError> {
    let invalid = || ProviderError::Decode(format!("invalid amount {text:?}"));

    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) || text.ends_with('.') {
        return Err(invalid());
    }

    let (significant, excess) = fraction.split_at(fraction.len().min(DECIMALS));
    if excess.bytes().any(|b| b != b'0') {
        return Err(ProviderError::Decode(format!(
            "amount {text:?} has more than {DECIMALS} decimal places"
        )));
    }

    let whole: u64 = whole.parse().map_err(|_| invalid())?;
    let mut fraction_sat: u64 = 0;
    for (i, digit) in significant.bytes().enumerate() {
        fraction_sat += u64::from(digit - b'0') * 10u64.pow((DECIMALS - 1 - i) as u32);
    }

    whole
        .checked_mul(SAT_PER_COIN)
        .and_then(|sat| sat.checked_add(fraction_sat))
        .ok_or_else(|| ProviderError::Decode(format!("amount {text:?} overflows")))
}

/// Render satoshi as a decimal coin amount with trailing zeros trimmed.
pub fn format_amount(amount_sat: u64) -> String {
    let whole = amount_sat / SAT_PER_COIN;
    let fraction = amount_sat % SAT_PER_COIN;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:08}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Moves a request body to a node and returns the raw response body.
pub trait RpcTransport {
    fn call(&self, body: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

/// [`UtxoProvider`] backed by a `qtum_getUTXOs` endpoint.
#[derive(Debug)]
pub struct RpcUtxoProvider<T> {
    transport: T,
    min_amount_sat: u64,
    next_id: AtomicU64,
}

impl<T: RpcTransport> RpcUtxoProvider<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            min_amount_sat: DEFAULT_MIN_AMOUNT_SAT,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_min_amount_sat(mut self, min_amount_sat: u64) -> Self {
        self.min_amount_sat = min_amount_sat;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: RpcTransport> UtxoProvider for RpcUtxoProvider<T> {
    fn fetch_unspent(&self, address_hash: &[u8; 20]) -> Result<Vec<UnspentOutput>, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = GetUtxosRequest::new(id.to_string(), address_hash, self.min_amount_sat)?;
        let response = self.transport.call(&request.to_json_bytes()?)?;
        let utxos = decode_utxos_response(&response)?;
        debug!(id, count = utxos.len(), "decoded qtum_getUTXOs response");
        Ok(utxos)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    const TXID: &str = "8fa2f0a4c5b5a5a3c8e4e1f2d3c4b5a697887766554433221100ffeeddccbbaa";
    const SCRIPT: &str = "76a9147926223070547d2d15b2ef5e7383e541c338ffe988ac";

    struct CannedTransport {
        response: String,
        last_request: RefCell<Vec<u8>>,
    }

    impl CannedTransport {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                last_request: RefCell::new(Vec::new()),
            }
        }
    }

    impl RpcTransport for CannedTransport {
        fn call(&self, body: &[u8]) -> Result<Vec<u8>, ProviderError> {
            *self.last_request.borrow_mut() = body.to_vec();
            Ok(self.response.clone().into_bytes())
        }
    }

    fn utxo_json(amount: &str) -> String {
        format!(
            r#"{{"jsonrpc":"2.0","id":"1","result":[{{"address":"qUbxboqjBRp96j3La8D1RYkyqx5uQbJPoW","txid":"{TXID}","vout":1,"amount":{amount},"confirmations":12,"scriptPubKey":"{SCRIPT}","spendable":true}}]}}"#
        )
    }

    #[test]
    fn request_body_shape() {
        let request = GetUtxosRequest::new("10", &[0xAB; 20], DEFAULT_MIN_AMOUNT_SAT).unwrap();
        let value: Value = serde_json::from_slice(&request.to_json_bytes().unwrap()).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], "10");
        assert_eq!(value["method"], "qtum_getUTXOs");
        assert_eq!(value["params"][0], format!("0x{}", "ab".repeat(20)));
        assert_eq!(value["params"][1].to_string(), "0.005");
    }

    #[test]
    fn decodes_utxo_list() {
        let utxos = decode_utxos_response(utxo_json("1.5").as_bytes()).unwrap();
        assert_eq!(utxos.len(), 1);

        let utxo = &utxos[0];
        assert_eq!(utxo.amount_sat, 150_000_000);
        assert_eq!(utxo.output_index, 1);
        assert_eq!(utxo.confirmations, 12);
        assert_eq!(hex::encode(&utxo.script_pubkey), SCRIPT);
        // Display order is reversed into internal order.
        assert_eq!(utxo.prev_txid[0], 0xaa);
        assert_eq!(utxo.prev_txid[31], 0x8f);
    }

    #[test]
    fn amount_precision_is_exact() {
        // 0.1 + 0.2 style values must not drift.
        let utxos = decode_utxos_response(utxo_json("0.30000001").as_bytes()).unwrap();
        assert_eq!(utxos[0].amount_sat, 30_000_001);
    }

    #[test]
    fn string_amount_accepted() {
        let utxos = decode_utxos_response(utxo_json("\"2\"").as_bytes()).unwrap();
        assert_eq!(utxos[0].amount_sat, 200_000_000);
    }

    #[test]
    fn rpc_error_is_network_error() {
        let body =
            br#"{"jsonrpc":"2.0","id":"1","error":{"code":-32601,"message":"method not found"}}"#;
        match decode_utxos_response(body) {
            Err(ProviderError::Network(msg)) => assert!(msg.contains("method not found")),
            other => panic!("expected Network error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_bodies_are_decode_errors() {
        assert!(matches!(
            decode_utxos_response(b"not json"),
            Err(ProviderError::Decode(_))
        ));
        assert!(matches!(
            decode_utxos_response(br#"{"jsonrpc":"2.0","id":"1"}"#),
            Err(ProviderError::Decode(_))
        ));
        assert!(matches!(
            decode_utxos_response(br#"{"result":{"txid":"00"}}"#),
            Err(ProviderError::Decode(_))
        ));
        let bad_script = utxo_json("1").replace(SCRIPT, "zz");
        assert!(matches!(
            decode_utxos_response(bad_script.as_bytes()),
            Err(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn negative_confirmations_clamp_to_zero() {
        let body = utxo_json("1").replace("\"confirmations\":12", "\"confirmations\":-1");
        let utxos = decode_utxos_response(body.as_bytes()).unwrap();
        assert_eq!(utxos[0].confirmations, 0);
    }

    #[test]
    fn parse_amount_cases() {
        assert_eq!(parse_amount_sat("0").unwrap(), 0);
        assert_eq!(parse_amount_sat("3").unwrap(), 300_000_000);
        assert_eq!(parse_amount_sat("0.00000001").unwrap(), 1);
        assert_eq!(parse_amount_sat("0.005").unwrap(), 500_000);
        assert_eq!(parse_amount_sat("1.100000000").unwrap(), 110_000_000);
        assert!(parse_amount_sat("0.000000001").is_err());
        assert!(parse_amount_sat("-1").is_err());
        assert!(parse_amount_sat("1e8").is_err());
        assert!(parse_amount_sat(".5").is_err());
        assert!(parse_amount_sat("5.").is_err());
        assert!(parse_amount_sat("").is_err());
        assert!(parse_amount_sat("184467440738").is_err());
    }

    #[test]
    fn format_amount_trims_zeros() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(500_000), "0.005");
        assert_eq!(format_amount(100_000_000), "1");
        assert_eq!(format_amount(123_456_789), "1.23456789");
    }

    #[test]
    fn provider_round_trip_over_transport() {
        let transport = CannedTransport::new(&utxo_json("0.75"));
        let provider = RpcUtxoProvider::new(transport);

        let utxos = provider.fetch_unspent(&[0x79; 20]).unwrap();
        assert_eq!(utxos[0].amount_sat, 75_000_000);

        let sent: Value =
            serde_json::from_slice(&provider.transport().last_request.borrow()).unwrap();
        assert_eq!(sent["method"], GET_UTXOS_METHOD);
        assert_eq!(sent["id"], "1");

        provider.fetch_unspent(&[0x79; 20]).unwrap();
        let sent: Value =
            serde_json::from_slice(&provider.transport().last_request.borrow()).unwrap();
        assert_eq!(sent["id"], "2");
    }

    #[test]
    fn transport_failure_propagates() {
        struct Offline;
        impl RpcTransport for Offline {
            fn call(&self, _: &[u8]) -> Result<Vec<u8>, ProviderError> {
                Err(ProviderError::Network("connection refused".into()))
            }
        }

        let provider = RpcUtxoProvider::new(Offline).with_min_amount_sat(0);
        assert!(matches!(
            provider.fetch_unspent(&[0; 20]),
            Err(ProviderError::Network(_))
        ));
    }
}
