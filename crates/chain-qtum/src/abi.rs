//! Contract call data for `OP_CALL` outputs.
//!
//! Only static 32-byte words are encoded here. Callers needing dynamic types
//! (strings, arrays, bytes) encode them elsewhere and pass the finished bytes
//! straight to the builder.

use sha3::{Digest, Keccak256};

use crate::error::QtumError;

/// A single statically sized ABI argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiParam {
    /// 20-byte contract or account address, left-padded to 32 bytes.
    Address([u8; 20]),
    /// Big-endian 256-bit unsigned integer.
    Uint256([u8; 32]),
    Bool(bool),
}

impl AbiParam {
    /// Convenience for small integers.
    pub fn uint(value: u128) -> Self {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&value.to_be_bytes());
        AbiParam::Uint256(word)
    }

    fn type_name(&self) -> &'static str {
        match self {
            AbiParam::Address(_) => "address",
            AbiParam::Uint256(_) => "uint256",
            AbiParam::Bool(_) => "bool",
        }
    }

    fn encode_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        match self {
            AbiParam::Address(addr) => word[12..].copy_from_slice(addr),
            AbiParam::Uint256(value) => word = *value,
            AbiParam::Bool(flag) => word[31] = u8::from(*flag),
        }
        word
    }
}

/// Turns a method signature and its arguments into call data.
pub trait CallDataEncoder {
    fn encode_call(
        &self,
        method_signature: &str,
        params: &[AbiParam],
    ) -> Result<Vec<u8>, QtumError>;
}

/// Encoder for methods whose arguments are all static words.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAbiEncoder;

impl CallDataEncoder for StaticAbiEncoder {
    fn encode_call(
        &self,
        method_signature: &str,
        params: &[AbiParam],
    ) -> Result<Vec<u8>, QtumError> {
        let arg_types = signature_arg_types(method_signature)?;
        if arg_types.len() != params.len() {
            return Err(QtumError::InvalidScriptInput(format!(
                "{method_signature} takes {} arguments, got {}",
                arg_types.len(),
                params.len()
            )));
        }
        for (i, (expected, param)) in arg_types.iter().zip(params).enumerate() {
            if *expected != param.type_name() {
                return Err(QtumError::InvalidScriptInput(format!(
                    "argument {i} of {method_signature} is {expected}, got {}",
                    param.type_name()
                )));
            }
        }

        let mut data = Vec::with_capacity(4 + params.len() * 32);
        data.extend_from_slice(&function_selector(method_signature));
        for param in params {
            data.extend_from_slice(&param.encode_word());
        }
        Ok(data)
    }
}

/// First four bytes of Keccak-256 over the canonical signature.
pub fn function_selector(method_signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(method_signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

// Accepts `name(type,type,...)` with no whitespace, as hashed on chain.
fn signature_arg_types(signature: &str) -> Result<Vec<&str>, QtumError> {
    let malformed =
        || QtumError::InvalidScriptInput(format!("malformed method signature {signature:?}"));

    let (name, rest) = signature.split_once('(').ok_or_else(malformed)?;
    let args = rest.strip_suffix(')').ok_or_else(malformed)?;

    let valid_name = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(malformed());
    }

    if args.is_empty() {
        return Ok(Vec::new());
    }
    args.split(',')
        .map(|ty| match ty {
            "address" | "uint256" | "bool" => Ok(ty),
            "" => Err(malformed()),
            other => Err(QtumError::InvalidScriptInput(format!(
                "unsupported argument type {other:?}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_selectors() {
        assert_eq!(hex::encode(function_selector("get()")), "6d4ce63c");
        assert_eq!(hex::encode(function_selector("set(uint256)")), "60fe47b1");
    }

    #[test]
    fn encode_no_args() {
        let data = StaticAbiEncoder.encode_call("get()", &[]).unwrap();
        assert_eq!(hex::encode(data), "6d4ce63c");
    }

    #[test]
    fn encode_uint_argument() {
        let data = StaticAbiEncoder
            .encode_call("set(uint256)", &[AbiParam::uint(42)])
            .unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &[0x60, 0xfe, 0x47, 0xb1]);
        assert_eq!(&data[4..35], &[0u8; 31]);
        assert_eq!(data[35], 42);
    }

    #[test]
    fn address_is_left_padded() {
        let mut addr = [0u8; 20];
        addr[0] = 0xde;
        addr[19] = 0xad;

        let data = StaticAbiEncoder
            .encode_call("transfer(address,uint256)", &[AbiParam::Address(addr), AbiParam::uint(1)])
            .unwrap();
        assert_eq!(data.len(), 68);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], &addr);
        assert_eq!(data[67], 1);
    }

    #[test]
    fn bool_word() {
        let data = StaticAbiEncoder
            .encode_call("toggle(bool)", &[AbiParam::Bool(true)])
            .unwrap();
        assert_eq!(data[35], 1);
        assert_eq!(&data[4..35], &[0u8; 31]);
    }

    #[test]
    fn argument_count_mismatch() {
        let result = StaticAbiEncoder.encode_call("set(uint256)", &[]);
        assert!(matches!(result, Err(QtumError::InvalidScriptInput(_))));
    }

    #[test]
    fn argument_type_mismatch() {
        let result = StaticAbiEncoder.encode_call("set(uint256)", &[AbiParam::Bool(false)]);
        assert!(matches!(result, Err(QtumError::InvalidScriptInput(_))));
    }

    #[test]
    fn malformed_signatures() {
        for signature in [
            "set",
            "set(uint256",
            "(uint256)",
            "1set()",
            "set(uint256,)",
            "set(string)",
            "set( uint256)",
        ] {
            assert!(
                StaticAbiEncoder.encode_call(signature, &[AbiParam::uint(1)]).is_err(),
                "{signature} should be rejected"
            );
        }
    }
}
