//! Fingerprint functions for sbmirror
//!
//! The remote lists key every entry by the MD5 digest of a candidate form,
//! rendered as 32 lowercase hexadecimal characters. The same rendering is
//! used for lookups, so the two sides compare as plain strings.

use md5::{Digest, Md5};

/// Length of a rendered fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// Fingerprint a candidate form.
/// Hashes the UTF-8 bytes as-is; callers are expected to pass canonical text.
#[inline]
pub fn fingerprint(s: &str) -> String {
    let digest = Md5::digest(s.as_bytes());
    format!("{:x}", digest)
}

/// Check that a string has the exact shape of a fingerprint.
#[inline]
pub fn is_fingerprint(s: &str) -> bool {
    s.len() == FINGERPRINT_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
