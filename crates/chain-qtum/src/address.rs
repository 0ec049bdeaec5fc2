use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::QtumError;
use crate::network::NetworkConfig;

/// Compute Hash160 (RIPEMD-160(SHA-256(data))).
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// Encode a 20-byte pubkey hash as a Base58Check pay-to-pubkey-hash address.
pub fn encode_address(pubkey_hash: &[u8; 20], network: &NetworkConfig) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(network.pubkey_hash_addr_id);
    payload.extend_from_slice(pubkey_hash);
    bs58::encode(payload).with_check().into_string()
}

/// Decode a pay-to-pubkey-hash address into its 20-byte pubkey hash.
///
/// The version byte must match `network.pubkey_hash_addr_id`; script-hash
/// addresses and addresses of other networks are rejected.
pub fn decode_address(address: &str, network: &NetworkConfig) -> Result<[u8; 20], QtumError> {
    let decoded = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| QtumError::InvalidAddress(format!("invalid base58check: {e}")))?;

    if decoded.len() != 21 {
        return Err(QtumError::InvalidAddress(format!(
            "expected 21-byte payload, got {}",
            decoded.len()
        )));
    }

    let version = decoded[0];
    if version != network.pubkey_hash_addr_id {
        return Err(QtumError::InvalidAddress(format!(
            "version byte {version:#04x} is not a {} pubkey-hash address",
            network.name
        )));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&decoded[1..]);
    Ok(hash)
}

/// Parse a 20-byte hash given as 40 hex characters, with optional `0x` prefix.
///
/// Contract addresses are carried this way rather than in Base58Check form.
pub fn parse_hash160_hex(hex_str: &str) -> Result<[u8; 20], QtumError> {
    let trimmed = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(trimmed)
        .map_err(|e| QtumError::InvalidScriptInput(format!("invalid contract address hex: {e}")))?;
    bytes.as_slice().try_into().map_err(|_| {
        QtumError::InvalidScriptInput(format!(
            "contract address must be 20 bytes, got {}",
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::QtumNetwork;

    const GENERATOR_PUBKEY: &str =
        "0279BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798";

    #[test]
    fn hash160_known_vector() {
        let pubkey = hex::decode(GENERATOR_PUBKEY).unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn encode_mainnet_address() {
        let pubkey = hex::decode(GENERATOR_PUBKEY).unwrap();
        let addr = encode_address(&hash160(&pubkey), &QtumNetwork::Mainnet.config());
        assert_eq!(addr, "QXHFfTBKYXjaaTH1e7Rox8CcdNPGHVhM59");
    }

    #[test]
    fn encode_testnet_address() {
        let pubkey = hex::decode(GENERATOR_PUBKEY).unwrap();
        let addr = encode_address(&hash160(&pubkey), &QtumNetwork::Testnet.config());
        assert_eq!(addr, "qUEeiBfBZiTuHKvPA85a1u5PeeMkLnNF3K");
    }

    #[test]
    fn decode_testnet_address() {
        let hash = decode_address(
            "qLn9vqbr2Gx3TsVR9QyTVB5mrMoh4x43Uf",
            &QtumNetwork::Testnet.config(),
        )
        .unwrap();
        assert_eq!(hex::encode(hash), "2352be3db3177f0a07efbe6da5857615b8c9901d");
    }

    #[test]
    fn decode_rejects_other_network() {
        let result = decode_address(
            "qLn9vqbr2Gx3TsVR9QyTVB5mrMoh4x43Uf",
            &QtumNetwork::Mainnet.config(),
        );
        assert!(matches!(result, Err(QtumError::InvalidAddress(_))));
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        // Last character altered.
        let result = decode_address(
            "qLn9vqbr2Gx3TsVR9QyTVB5mrMoh4x43Ug",
            &QtumNetwork::Testnet.config(),
        );
        assert!(matches!(result, Err(QtumError::InvalidAddress(_))));
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = decode_address("not-an-address!!", &QtumNetwork::Testnet.config());
        assert!(result.is_err());
    }

    #[test]
    fn parse_contract_address_hex() {
        let hash = parse_hash160_hex("dcb58d4670a6922abc89d5fc1aea38316ee7e373").unwrap();
        assert_eq!(hash[0], 0xdc);
        assert_eq!(hash[19], 0x73);

        let prefixed = parse_hash160_hex("0xdcb58d4670a6922abc89d5fc1aea38316ee7e373").unwrap();
        assert_eq!(hash, prefixed);
    }

    #[test]
    fn parse_contract_address_wrong_length() {
        let result = parse_hash160_hex("dcb58d4670a6922abc89d5fc1aea38316ee7e3");
        assert!(matches!(result, Err(QtumError::InvalidScriptInput(_))));
    }
}
