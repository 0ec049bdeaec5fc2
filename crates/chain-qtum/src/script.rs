//! Output script encoding.
//!
//! Covers the three output kinds the builder emits (pay-to-pubkey-hash,
//! contract-create, contract-call) plus the strict tokenizer the signer uses
//! on previous-output scripts.

use crate::error::QtumError;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CREATE: u8 = 0xc1;
pub const OP_CALL: u8 = 0xc2;

/// Trailing opcode of a contract output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContractOpcode {
    Create = OP_CREATE,
    Call = OP_CALL,
}

impl TryFrom<u8> for ContractOpcode {
    type Error = QtumError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            OP_CREATE => Ok(ContractOpcode::Create),
            OP_CALL => Ok(ContractOpcode::Call),
            other => Err(QtumError::InvalidScriptInput(format!(
                "unknown contract opcode {other:#04x}"
            ))),
        }
    }
}

/// Incremental script writer using minimal push encodings.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_opcode(mut self, opcode: u8) -> Self {
        self.bytes.push(opcode);
        self
    }

    /// Push `data` with the smallest encoding that represents it.
    ///
    /// Empty data and `[0]` become `OP_0`, single bytes 1..=16 become
    /// `OP_1..OP_16` and `[0x81]` becomes `OP_1NEGATE`.
    pub fn push_data(mut self, data: &[u8]) -> Self {
        match data {
            [] | [0] => self.bytes.push(OP_0),
            [n @ 1..=16] => self.bytes.push(OP_1 + *n - 1),
            [0x81] => self.bytes.push(OP_1NEGATE),
            _ => {
                let len = data.len();
                if len <= 75 {
                    self.bytes.push(len as u8);
                } else if len <= 0xFF {
                    self.bytes.push(OP_PUSHDATA1);
                    self.bytes.push(len as u8);
                } else if len <= 0xFFFF {
                    self.bytes.push(OP_PUSHDATA2);
                    self.bytes.extend_from_slice(&(len as u16).to_le_bytes());
                } else {
                    self.bytes.push(OP_PUSHDATA4);
                    self.bytes.extend_from_slice(&(len as u32).to_le_bytes());
                }
                self.bytes.extend_from_slice(data);
            }
        }
        self
    }

    /// Push an integer as a minimally encoded script number.
    pub fn push_int(mut self, value: i64) -> Self {
        match value {
            0 => {
                self.bytes.push(OP_0);
                self
            }
            -1 => {
                self.bytes.push(OP_1NEGATE);
                self
            }
            1..=16 => {
                self.bytes.push(OP_1 + value as u8 - 1);
                self
            }
            _ => self.push_data(&script_num(value)),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Little-endian sign-magnitude encoding used for numeric script pushes.
fn script_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while magnitude > 0 {
        out.push((magnitude & 0xFF) as u8);
        magnitude >>= 8;
    }

    // The top bit of the last byte is the sign bit.
    if let Some(last) = out.last_mut() {
        if *last & 0x80 != 0 {
            out.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            *last |= 0x80;
        }
    }
    out
}

fn gas_value(name: &str, value: u64) -> Result<i64, QtumError> {
    i64::try_from(value)
        .map_err(|_| QtumError::InvalidScriptInput(format!("{name} {value} exceeds i64 range")))
}

/// Standard pay-to-pubkey-hash locking script:
/// `OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn pay_to_pubkey_hash(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    ScriptBuilder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_data(pubkey_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_bytes()
}

/// Contract deployment script:
/// `<evm version> <gas limit> <gas price> <bytecode> OP_CREATE`.
pub fn contract_create(
    evm_version: u8,
    gas_limit: u64,
    gas_price: u64,
    bytecode: &[u8],
) -> Result<Vec<u8>, QtumError> {
    if bytecode.is_empty() {
        return Err(QtumError::InvalidScriptInput(
            "contract bytecode must not be empty".into(),
        ));
    }

    Ok(contract_prefix(evm_version, gas_limit, gas_price, bytecode)?
        .push_opcode(OP_CREATE)
        .into_bytes())
}

/// Contract invocation script:
/// `<evm version> <gas limit> <gas price> <data> <contract address> OP_CALL`.
pub fn contract_call(
    evm_version: u8,
    gas_limit: u64,
    gas_price: u64,
    data: &[u8],
    contract_address: &[u8],
) -> Result<Vec<u8>, QtumError> {
    if contract_address.len() != 20 {
        return Err(QtumError::InvalidScriptInput(format!(
            "contract address must be 20 bytes, got {}",
            contract_address.len()
        )));
    }

    Ok(contract_prefix(evm_version, gas_limit, gas_price, data)?
        .push_data(contract_address)
        .push_opcode(OP_CALL)
        .into_bytes())
}

// Interpreters read these positionally; the order must not change.
fn contract_prefix(
    evm_version: u8,
    gas_limit: u64,
    gas_price: u64,
    payload: &[u8],
) -> Result<ScriptBuilder, QtumError> {
    Ok(ScriptBuilder::new()
        .push_data(&[evm_version])
        .push_int(gas_value("gas limit", gas_limit)?)
        .push_int(gas_value("gas price", gas_price)?)
        .push_data(payload))
}

/// Signature script carrying a single push of `signature || sighash type`.
pub fn signature_script(signature_with_hashtype: &[u8]) -> Vec<u8> {
    ScriptBuilder::new()
        .push_data(signature_with_hashtype)
        .into_bytes()
}

/// One tokenized script element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub opcode: u8,
    /// Pushed bytes; empty for non-push opcodes.
    pub data: &'a [u8],
    /// The exact encoded bytes of this element, prefix included.
    pub raw: &'a [u8],
}

/// Tokenize a script, failing on any push that runs past the end.
pub fn parse_script(script: &[u8]) -> Result<Vec<Instruction<'_>>, QtumError> {
    let mut instructions = Vec::new();
    let mut pos = 0;

    while pos < script.len() {
        let opcode = script[pos];
        let (header, len) = match opcode {
            0x01..=0x4b => (1, opcode as usize),
            OP_PUSHDATA1 => (2, read_len(script, pos, 1)?),
            OP_PUSHDATA2 => (3, read_len(script, pos, 2)?),
            OP_PUSHDATA4 => (5, read_len(script, pos, 4)?),
            _ => (1, 0),
        };

        let start = pos + header;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= script.len())
            .ok_or_else(|| {
                QtumError::InvalidScriptInput(format!(
                    "push of {len} bytes at offset {pos} exceeds script length {}",
                    script.len()
                ))
            })?;

        instructions.push(Instruction {
            opcode,
            data: &script[start..end],
            raw: &script[pos..end],
        });
        pos = end;
    }

    Ok(instructions)
}

fn read_len(script: &[u8], pos: usize, width: usize) -> Result<usize, QtumError> {
    let bytes = script.get(pos + 1..pos + 1 + width).ok_or_else(|| {
        QtumError::InvalidScriptInput(format!("truncated push length at offset {pos}"))
    })?;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(bytes);
    Ok(u32::from_le_bytes(buf) as usize)
}

/// Drop every `OP_CODESEPARATOR`, keeping all other elements byte-for-byte.
pub fn remove_code_separators(script: &[u8]) -> Result<Vec<u8>, QtumError> {
    let mut out = Vec::with_capacity(script.len());
    for instruction in parse_script(script)? {
        if instruction.opcode != OP_CODESEPARATOR {
            out.extend_from_slice(instruction.raw);
        }
    }
    Ok(out)
}
