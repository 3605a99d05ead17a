//! The hash function shared between writer and reader (spec.md §3/§8).
//! Same crate and algorithm the teacher crate uses for its page checksums.

use crc32fast::Hasher;

pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}
