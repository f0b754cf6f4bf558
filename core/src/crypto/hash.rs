//! # Hashing Utilities
//!
//! BLAKE3 is the sole content hash of the EMBER chain: block hashes,
//! address derivation, everything. It is fast on every platform that
//! matters and a proper cryptographic hash, so there is no reason to
//! carry a second function around "just in case".
//!
//! All digests are 32 bytes. The [`Hash`] alias exists so call sites
//! say what they mean instead of sprinkling `[u8; 32]` everywhere.

/// A 32-byte BLAKE3 digest identifying a block (or any hashed content).
pub type Hash = [u8; 32];

/// The all-zero hash. Used as the parent-hash sentinel of the genesis
/// block — no real content ever hashes to this.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Compute the BLAKE3 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. The `blake3` crate
/// picks up SIMD acceleration automatically where available; for the
/// header-sized inputs this core hashes, single-threaded throughput is
/// what matters and BLAKE3 wins there too.
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Render a hash as lowercase hex, mainly for logging.
pub fn hash_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Short hex prefix of a hash (first 4 bytes), for log lines where the
/// full 64 characters would drown the message.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_is_deterministic() {
        assert_eq!(blake3_hash(b"ember"), blake3_hash(b"ember"));
        assert_ne!(blake3_hash(b"ember"), blake3_hash(b"embers"));
    }

    #[test]
    fn digest_is_32_bytes() {
        assert_eq!(blake3_hash(b"").len(), 32);
    }

    #[test]
    fn hex_rendering() {
        let h = blake3_hash(b"ember");
        assert_eq!(hash_hex(&h).len(), 64);
        assert!(hash_hex(&h).starts_with(&short_hex(&h)));
        assert_eq!(short_hex(&h).len(), 8);
    }

    #[test]
    fn zero_hash_is_all_zeros() {
        assert!(ZERO_HASH.iter().all(|b| *b == 0));
    }
}
