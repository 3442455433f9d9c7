//! CRC32 checksum over container file images
//!
//! The trailer of every container file is the CRC32 (IEEE polynomial) of all
//! bytes before it. A mismatch on open is corruption and the open fails.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Splits `image` into body and trailer and checks the trailer.
///
/// Returns the body on success, or `(computed, stored)` on mismatch.
pub fn verify_trailer(image: &[u8]) -> Result<&[u8], (u32, u32)> {
    if image.len() < 4 {
        return Err((0, 0));
    }
    let (body, trailer) = image.split_at(image.len() - 4);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = compute_checksum(body);
    if computed == stored {
        Ok(body)
    } else {
        Err((computed, stored))
    }
}

/// Appends the CRC32 trailer of `body` to it.
pub fn seal(mut body: Vec<u8>) -> Vec<u8> {
    let checksum = compute_checksum(&body);
    body.extend_from_slice(&checksum.to_le_bytes());
    body
}
