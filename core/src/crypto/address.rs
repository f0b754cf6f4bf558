//! # Account Addresses
//!
//! EMBER addresses are 20 bytes — the tail of a BLAKE3 digest. Shorter
//! than a full hash, long enough that collisions are not a practical
//! concern, and cheap to key a store with.

use super::hash::{blake3_hash, Hash};

/// A 20-byte account address.
pub type Address = [u8; 20];

/// The zero address. Coinbase of the genesis block; burns go here too.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Derive the address of an account created by `creator` at `nonce`.
///
/// The derivation is `BLAKE3(creator || nonce_le)[12..]` — the last 20
/// bytes of the digest. Deterministic: the same (creator, nonce) pair
/// always yields the same address, so contract addresses can be known
/// before the creating transaction is even mined.
pub fn derive_address(creator: &Address, nonce: u64) -> Address {
    let mut preimage = [0u8; 28];
    preimage[..20].copy_from_slice(creator);
    preimage[20..].copy_from_slice(&nonce.to_le_bytes());

    tail_20(&blake3_hash(&preimage))
}

/// Render an address as lowercase hex.
pub fn address_hex(address: &Address) -> String {
    hex::encode(address)
}

/// Parse a 40-character hex string into an address.
///
/// Returns `None` on bad length or non-hex input — callers treat an
/// unparseable address as absent, not as a panic.
pub fn parse_address(s: &str) -> Option<Address> {
    let bytes = hex::decode(s).ok()?;
    let mut address = ZERO_ADDRESS;
    if bytes.len() != address.len() {
        return None;
    }
    address.copy_from_slice(&bytes);
    Some(address)
}

fn tail_20(hash: &Hash) -> Address {
    let mut address = ZERO_ADDRESS;
    address.copy_from_slice(&hash[12..]);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let creator = [7u8; 20];
        assert_eq!(derive_address(&creator, 0), derive_address(&creator, 0));
    }

    #[test]
    fn nonce_changes_address() {
        let creator = [7u8; 20];
        assert_ne!(derive_address(&creator, 0), derive_address(&creator, 1));
    }

    #[test]
    fn creator_changes_address() {
        assert_ne!(derive_address(&[1u8; 20], 0), derive_address(&[2u8; 20], 0));
    }

    #[test]
    fn hex_round_trip() {
        let addr = derive_address(&[9u8; 20], 42);
        let encoded = address_hex(&addr);
        assert_eq!(encoded.len(), 40);
        assert_eq!(parse_address(&encoded), Some(addr));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(parse_address("zz"), None);
        assert_eq!(parse_address("abcd"), None); // too short
    }
}
