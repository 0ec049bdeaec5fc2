use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey as EcdsaSigningKey, VerifyingKey};
use zeroize::Zeroizing;

use crate::address::{encode_address, hash160};
use crate::error::QtumError;
use crate::network::NetworkConfig;

/// A secp256k1 private key together with its derived public identity.
///
/// The scalar lives inside the `k256` key (zeroized on drop); the public key
/// and its hash160 are cached because every build needs them.
#[derive(Clone)]
pub struct SigningKey {
    inner: EcdsaSigningKey,
    public_key: Vec<u8>,
    pubkey_hash: [u8; 20],
}

impl SigningKey {
    /// Build a key from a raw 32-byte scalar.
    ///
    /// `compressed` selects the 33-byte or 65-byte public key encoding, which
    /// in turn determines the pubkey hash (and therefore the address).
    pub fn from_bytes(secret: &[u8; 32], compressed: bool) -> Result<Self, QtumError> {
        let inner = EcdsaSigningKey::from_bytes(secret.into())
            .map_err(|e| QtumError::InvalidPrivateKey(format!("invalid secp256k1 key: {e}")))?;
        let public_key = inner
            .verifying_key()
            .to_encoded_point(compressed)
            .as_bytes()
            .to_vec();
        let pubkey_hash = hash160(&public_key);

        Ok(Self {
            inner,
            public_key,
            pubkey_hash,
        })
    }

    /// Decode a WIF private key for the given network.
    pub fn from_wif(wif: &str, network: &NetworkConfig) -> Result<Self, QtumError> {
        let decoded = Zeroizing::new(
            bs58::decode(wif)
                .with_check(None)
                .into_vec()
                .map_err(|e| QtumError::InvalidPrivateKey(format!("invalid WIF encoding: {e}")))?,
        );

        match decoded.first() {
            Some(prefix) if *prefix == network.wif_prefix => {}
            Some(prefix) => {
                return Err(QtumError::InvalidPrivateKey(format!(
                    "WIF prefix {prefix:#04x} does not belong to {}",
                    network.name
                )))
            }
            None => return Err(QtumError::InvalidPrivateKey("empty WIF payload".into())),
        }

        let compressed = match decoded.len() {
            34 if decoded[33] == 0x01 => true,
            33 => false,
            n => {
                return Err(QtumError::InvalidPrivateKey(format!(
                    "unexpected WIF payload length {n}"
                )))
            }
        };

        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&decoded[1..33]);
        Self::from_bytes(&secret, compressed)
    }

    /// Serialized public key (33 bytes compressed, 65 uncompressed).
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Hash160 of the public key; the identity UTXOs are looked up by.
    pub fn pubkey_hash(&self) -> &[u8; 20] {
        &self.pubkey_hash
    }

    pub fn is_compressed(&self) -> bool {
        self.public_key.len() == 33
    }

    /// Base58Check address of this key on `network`.
    pub fn address(&self, network: &NetworkConfig) -> String {
        encode_address(&self.pubkey_hash, network)
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.inner.verifying_key()
    }

    /// RFC 6979 deterministic ECDSA over a precomputed 32-byte digest.
    pub(crate) fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, QtumError> {
        self.inner
            .sign_prehash(digest)
            .map_err(|e| QtumError::SigningError(format!("ECDSA signing failed: {e}")))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("pubkey_hash", &hex::encode(self.pubkey_hash))
            .finish_non_exhaustive()
    }
}
