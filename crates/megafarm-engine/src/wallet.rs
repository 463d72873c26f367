//! Wallet identity: secp256k1 private key → EIP-55 EVM address.

use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use megafarm_core::error::{MegafarmError, Result};
use megafarm_core::types::mask_key;

/// One account's signing identity. The private key is kept verbatim
/// for handlers that sign; everything the engine logs goes through
/// `masked()`.
#[derive(Clone)]
pub struct Wallet {
    private_key: String,
    pub address: String,
}

impl Wallet {
    /// Parse a hex private key (with or without `0x`) and derive the
    /// checksummed address.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let trimmed = private_key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_part)
            .map_err(|e| MegafarmError::Wallet(format!("Invalid key hex: {e}")))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| MegafarmError::Wallet(format!("Invalid secp256k1 key: {e}")))?;

        let public = signing_key.verifying_key().to_encoded_point(false);
        // Address: last 20 bytes of keccak256 over the uncompressed
        // public key without the 0x04 tag byte.
        let digest = Keccak256::digest(&public.as_bytes()[1..]);
        let address = to_checksum_address(&digest[12..]);

        Ok(Self {
            private_key: trimmed.to_string(),
            address,
        })
    }

    /// The raw private key, for handlers that need to sign.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Log-safe wallet identifier.
    pub fn masked(&self) -> String {
        mask_key(&self.private_key)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("private_key", &self.masked())
            .finish()
    }
}

/// EIP-55 mixed-case checksum encoding of a 20-byte address.
fn to_checksum_address(bytes: &[u8]) -> String {
    let lower = hex::encode(bytes);
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (4 * (1 - i % 2))) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
