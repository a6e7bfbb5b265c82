//! Deterministic hashing: the SHA-1 based assignment hash and its mapping
//! onto uniform samples.
//!
//! The contract, which must hold bit-for-bit across implementations:
//! take the SHA-1 of the name, hex-encode the first eight bytes, drop the
//! final hex character, and read the remaining fifteen hex digits (60 bits)
//! as an unsigned integer. Uniform samples divide by [`HASH_SCALE`], the
//! largest fifteen-digit hex value.

use sha1::{Digest, Sha1};

/// `(1 << 60) - 1`: fifteen hex F's, matching the 60-bit hash width.
pub const HASH_SCALE: u64 = 0x0FFF_FFFF_FFFF_FFFF;

/// Hash a name to a 60-bit integer.
///
/// Equivalent to parsing the first fifteen hex digits of the SHA-1 digest:
/// the top eight bytes big-endian, shifted right one nibble.
pub fn hash(name: &str) -> u64 {
    let digest = Sha1::digest(name.as_bytes());
    let mut first = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(first) >> 4
}

/// Map a hash onto a uniform sample in `[min, max]`.
pub fn uniform(hash: u64, min: f64, max: f64) -> f64 {
    let shift = hash as f64 / HASH_SCALE as f64;
    min + shift * (max - min)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed vector pinning the hash across platforms and releases.
    #[test]
    fn test_hash_vector() {
        assert_eq!(hash(""), 982798738632651952);
        assert_eq!(hash("a"), 607843303088085631);
        assert_eq!(hash("foo.bar"), 231603001195628059);
        assert_eq!(hash("assign_salt_a.x.123454"), 882760378569575902);
        assert_eq!(
            hash("simple_namespace.simple_namespace.test-id"),
            276350943495747392
        );
    }

    #[test]
    fn test_scale_is_sixty_bits() {
        assert_eq!(HASH_SCALE, (1u64 << 60) - 1);
    }

    #[test]
    fn test_hash_fits_in_sixty_bits() {
        for name in ["", "a", "unit.4", "salt.var.12345"] {
            assert!(hash(name) <= HASH_SCALE);
        }
    }

    #[test]
    fn test_uniform_bounds() {
        let u = uniform(hash("salt.x.user"), 0.0, 1.0);
        assert!((0.0..=1.0).contains(&u));
        let v = uniform(hash("salt.x.user"), 5.0, 10.0);
        assert!((5.0..=10.0).contains(&v));
    }

    #[test]
    fn test_uniform_is_linear_in_hash() {
        assert_eq!(uniform(0, 0.0, 1.0), 0.0);
        assert_eq!(uniform(HASH_SCALE, 0.0, 1.0), 1.0);
        assert_eq!(uniform(HASH_SCALE / 2, 0.0, 2.0), 2.0 * ((HASH_SCALE / 2) as f64 / HASH_SCALE as f64));
    }
}
