//! The 32-bit key hash used by block stores.
//!
//! Bucket selection and key verification both depend on this function, so a
//! writer and a reader must agree on it bit for bit. It is the classic
//! "times 33, xor" string hash: `h = ((h << 5) + h) ^ byte`, seeded with 5381.

/// Initial value of the hash state.
pub const HASH_SEED: u32 = 5381;

/// Hash a byte string in one call.
///
/// # Examples
///
/// ```
/// use folio::util::hash::hash;
///
/// assert_eq!(hash(b""), 5381);
/// assert_eq!(hash(b"a"), (5381u32 * 33) ^ 0x61);
/// ```
#[inline]
pub fn hash(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Streaming form of [`hash`], for keys that arrive in pieces.
#[derive(Clone, Copy, Debug)]
pub struct Hasher {
    state: u32,
}

impl Hasher {
    /// Create a hasher holding the seed state.
    pub fn new() -> Self {
        Hasher { state: HASH_SEED }
    }

    /// Feed more bytes into the hash.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) {
        let mut h = self.state;
        for &b in bytes {
            h = (h << 5).wrapping_add(h) ^ b as u32;
        }
        self.state = h;
    }

    /// Current hash value. The hasher can keep accepting bytes afterwards.
    #[inline]
    pub fn finish(&self) -> u32 {
        self.state
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}
