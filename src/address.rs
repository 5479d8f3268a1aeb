//! Bech32 chain addresses
//!
//! dfinance accounts are rendered as bech32 strings with the `wallet`
//! human-readable prefix over the 20-byte account hash.

use bech32::{Bech32, Hrp};
use bitcoin::hashes::{hash160, Hash};

use crate::error::ScriptArgError;

/// Default human-readable prefix for account addresses
pub const DEFAULT_ADDRESS_PREFIX: &str = "wallet";

/// Decode a bech32 address into its raw bytes, ignoring the prefix
pub fn address_to_bytes(address: &str) -> Result<Vec<u8>, ScriptArgError> {
    let (_hrp, data) = bech32::decode(address)
        .map_err(|e| ScriptArgError::InvalidAddress(format!("{}: {}", address, e)))?;
    Ok(data)
}

/// Encode raw address bytes with the given human-readable prefix
pub fn bytes_to_address(prefix: &str, bytes: &[u8]) -> Result<String, ScriptArgError> {
    let hrp = Hrp::parse(prefix)
        .map_err(|e| ScriptArgError::InvalidAddress(format!("bad prefix '{}': {}", prefix, e)))?;
    bech32::encode::<Bech32>(hrp, bytes)
        .map_err(|e| ScriptArgError::InvalidAddress(e.to_string()))
}

/// Account address for a compressed secp256k1 public key: ripemd160(sha256(pubkey))
pub fn address_from_public_key(prefix: &str, public_key: &[u8]) -> Result<String, ScriptArgError> {
    let account_hash = hash160::Hash::hash(public_key);
    bytes_to_address(prefix, account_hash.as_byte_array())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "wallet12tg20s9g4les55vfvnumlkg0a5zk825py9j0ha";

    #[test]
    fn test_decode_known_address() {
        let bytes = address_to_bytes(ADDRESS).unwrap();
        assert_eq!(hex::encode(&bytes), "52d0a7c0a8aff30a518964f9bfd90fed0563aa81");
    }

    #[test]
    fn test_encode_matches_decode() {
        let bytes = hex::decode("52d0a7c0a8aff30a518964f9bfd90fed0563aa81").unwrap();
        assert_eq!(bytes_to_address(DEFAULT_ADDRESS_PREFIX, &bytes).unwrap(), ADDRESS);
    }

    #[test]
    fn test_sequential_bytes_address() {
        let bytes: Vec<u8> = (0u8..20).collect();
        assert_eq!(
            bytes_to_address("wallet", &bytes).unwrap(),
            "wallet1qqqsyqcyq5rqwzqfpg9scrgwpugpzysnwqvh4m"
        );
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let broken = format!("{}q", &ADDRESS[..ADDRESS.len() - 1]);
        assert!(matches!(
            address_to_bytes(&broken),
            Err(ScriptArgError::InvalidAddress(_))
        ));
    }
}
